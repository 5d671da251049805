use ratatui::crossterm::event::KeyEvent;
use tracing::debug;

use crate::{
    event::events::Event,
    player::traits::TrackChangeSource,
    ui::{
        app::App,
        input::InputHandler,
        tui::{TerminalEvent, Tui},
    },
};

pub struct EventHandler;

impl EventHandler {
    pub async fn handle_events(app: &mut App, tui: &mut Tui) -> color_eyre::Result<bool> {
        let mut should_render = false;
        if let Some(evt) = tui.next().await {
            if Self::handle_event(app, evt, tui).await? {
                should_render = true;
            }
        }

        while let Ok(evt) = app.event_rx.try_recv() {
            Self::handle_action(app, evt);
            should_render = true;
        }

        Ok(should_render)
    }

    pub async fn handle_event(
        app: &mut App,
        evt: TerminalEvent,
        tui: &mut Tui,
    ) -> color_eyre::Result<bool> {
        match evt {
            TerminalEvent::Init => {
                let _ = app
                    .event_tx
                    .send(Event::TrackChanged(app.player.current_track()));
            }
            TerminalEvent::Quit => app.should_quit = true,
            TerminalEvent::FocusGained => {
                app.has_focus = true;
                tui.clear()?;
            }
            TerminalEvent::FocusLost => app.has_focus = false,
            TerminalEvent::Key(key) => Self::handle_key_event(app, key),
            TerminalEvent::Resize(cols, rows) => app.resize(cols, rows),
            TerminalEvent::Tick => {
                app.check_renderer();
                return Ok(app.has_focus);
            }
        }

        Ok(true)
    }

    pub fn handle_action(app: &mut App, evt: Event) {
        match evt {
            Event::TrackChanged(track) => app.load_track(track),
            Event::LyricsReady(lines) => debug!(lines, "lyrics_ready"),
            Event::Retry => app.retry(),
            Event::Next => app.player.next(),
            Event::TogglePause => app.player.toggle_pause(),
        }
    }

    fn handle_key_event(app: &mut App, evt: KeyEvent) {
        if let Some(message) = InputHandler::handle_key(evt) {
            app.update(message);
        }
    }
}
