use std::sync::Arc;

use flume::{Receiver, Sender};
use ratatui::{Frame, layout::Rect};
use tracing::{debug, info};

use crate::{
    config::AppConfig,
    event::events::Event,
    http::ApiService,
    lyrics::sync::{LyricsMode, LyricsSynchronizer},
    player::{demo::DemoPlayer, traits::TrackChangeSource},
    spectrum::{
        layout::Orientation,
        renderer::{RenderHandle, SpectrumRenderer},
        surface::TerminalSurface,
    },
    track::{controller::TrackDataController, error::TrackDataError, model::TrackRef},
    util::task::{TaskGuard, TaskManager},
};

use super::{
    layout::AppLayout,
    message::AppMessage,
    tui::{self, TerminalEvent},
    util::handler::EventHandler,
};

pub struct App {
    pub config: AppConfig,
    pub event_rx: Receiver<Event>,
    pub event_tx: Sender<Event>,
    pub api: Arc<ApiService>,
    pub player: Arc<DemoPlayer>,
    pub controller: Arc<TrackDataController>,
    pub lyrics: Arc<LyricsSynchronizer>,
    pub surface: Arc<TerminalSurface>,
    pub renderer: Option<RenderHandle>,
    pub orientation: Orientation,
    pub lyrics_mode: LyricsMode,
    pub task_manager: TaskManager,
    pub lyrics_ticker: Option<TaskGuard>,
    pub background: Vec<TaskGuard>,
    pub has_focus: bool,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig) -> color_eyre::Result<Self> {
        let (event_tx, event_rx) = flume::unbounded();
        let api = Arc::new(ApiService::new(&config)?);
        let controller = Arc::new(TrackDataController::new(api.clone(), api.clone()));
        let player = Arc::new(DemoPlayer::new(
            config.playlist.clone(),
            config.track_length,
            config.bins,
        ));

        Ok(Self {
            event_rx,
            event_tx,
            api,
            player,
            controller,
            lyrics: Arc::new(LyricsSynchronizer::new()),
            surface: Arc::new(TerminalSurface::new(0, 0, config.scale)),
            renderer: None,
            orientation: config.orientation,
            lyrics_mode: config.lyrics_mode,
            task_manager: TaskManager::new(),
            lyrics_ticker: None,
            background: Vec::new(),
            has_focus: true,
            should_quit: false,
            config,
        })
    }

    pub async fn run(&mut self) -> color_eyre::Result<()> {
        let mut tui = tui::Tui::new()?.tick_rate(self.config.frame_interval);
        tui.enter()?;

        let size = tui.size()?;
        self.resize(size.width, size.height);
        self.start_background();
        self.restart_renderer();

        EventHandler::handle_event(self, TerminalEvent::Init, &mut tui).await?;
        while !self.should_quit {
            tui.draw(|f| {
                self.ui(f);
            })?;

            EventHandler::handle_events(self, &mut tui).await?;
        }

        self.shutdown();
        tui.exit()?;
        Ok(())
    }

    fn ui(&self, frame: &mut Frame) {
        if self.has_focus {
            frame.render_widget(self, frame.area());
        }
    }

    pub fn update(&mut self, message: AppMessage) {
        if self.halted() && message != AppMessage::Quit {
            debug!(?message, "message_ignored_after_fatal");
            return;
        }

        let command = match message {
            AppMessage::Quit => {
                self.should_quit = true;
                None
            }
            AppMessage::Retry => Some(Event::Retry),
            AppMessage::NextTrack => Some(Event::Next),
            AppMessage::TogglePause => Some(Event::TogglePause),
            AppMessage::ToggleOrientation => {
                self.orientation = self.orientation.toggled();
                self.restart_renderer();
                None
            }
            AppMessage::ToggleLyricsMode => {
                self.lyrics_mode = self.lyrics_mode.toggled();
                None
            }
        };

        if let Some(command) = command {
            let _ = self.event_tx.send(command);
        }
    }

    /// Keeps the drawing surface the size of the spectrum area.
    pub fn resize(&self, cols: u16, rows: u16) {
        let main = AppLayout::new(Rect::new(0, 0, cols, rows)).main;
        self.surface.resize(main.width, main.height);
    }

    fn start_background(&mut self) {
        self.background.push(self.player.spawn_clock());
        self.lyrics_ticker = Some(
            self.lyrics
                .spawn_ticker(self.player.clone(), self.config.tick_interval),
        );

        let tracks = self.player.subscribe();
        let tx = self.event_tx.clone();
        self.background.push(TaskGuard::new(tokio::spawn(async move {
            while let Ok(track) = tracks.recv_async().await {
                if tx.send(Event::TrackChanged(track)).is_err() {
                    break;
                }
            }
        })));
    }

    /// Tears down the current render loop, if any, and starts a fresh one.
    pub fn restart_renderer(&mut self) {
        if let Some(handle) = self.renderer.take() {
            handle.stop();
        }

        let controller = self.controller.clone();
        self.renderer = SpectrumRenderer::new(
            self.orientation,
            self.player.clone(),
            self.controller.shared_session(),
        )
        .with_frame_interval(self.config.frame_interval)
        .with_background(self.config.background)
        .start(self.surface.clone(), move |err| controller.report_fatal(err));
    }

    /// Reports a render loop that ended on its own, then halts if the
    /// session can no longer recover.
    pub fn check_renderer(&mut self) {
        if self.renderer.as_ref().is_some_and(|r| !r.is_running()) {
            self.renderer = None;
            self.controller
                .report_fatal(TrackDataError::RenderSurfaceUnavailable(
                    "render loop stopped".to_string(),
                ));
        }
        if self.halted() {
            self.halt();
        }
    }

    /// True once the session hit an error with no recovery.
    pub fn halted(&self) -> bool {
        self.controller.session().status.is_terminal()
    }

    /// Stops rendering and lyric work for good.
    fn halt(&mut self) {
        if let Some(handle) = self.renderer.take() {
            handle.stop();
        }
        if self.lyrics_ticker.take().is_some() {
            info!("lyrics_ticker_stopped");
        }
        self.task_manager.abort("lyrics");
    }

    /// Fans a track change out to the controller and the lyric loader.
    /// Whatever either was still doing for the previous track is aborted.
    pub fn load_track(&mut self, track: Option<TrackRef>) {
        if self.halted() {
            debug!("track_change_ignored_after_fatal");
            self.halt();
            return;
        }

        info!(
            track = ?track.as_ref().map(ToString::to_string),
            "track_changed"
        );

        let controller = self.controller.clone();
        let next = track.clone();
        self.task_manager.spawn(
            "track_data",
            tokio::spawn(async move {
                controller.on_track_changed(next).await;
            }),
        );

        let lyrics = self.lyrics.clone();
        let api = self.api.clone();
        let tx = self.event_tx.clone();
        self.task_manager.spawn(
            "lyrics",
            tokio::spawn(async move {
                lyrics.reload(api.as_ref(), track.as_ref()).await;
                let _ = tx.send(Event::LyricsReady(lyrics.lines().len()));
            }),
        );
    }

    pub fn retry(&mut self) {
        if !self.controller.awaits_retry() {
            debug!("retry_ignored");
            return;
        }

        let controller = self.controller.clone();
        self.task_manager.spawn(
            "track_data",
            tokio::spawn(async move {
                controller.retry().await;
            }),
        );
    }

    fn shutdown(&mut self) {
        self.surface.detach();
        if let Some(handle) = self.renderer.take() {
            handle.stop();
        }
        self.task_manager.abort_all();
        self.lyrics_ticker = None;
        self.background.clear();
    }
}
