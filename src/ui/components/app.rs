use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::{
    player::traits::{PositionSource, TrackChangeSource},
    spectrum::layout::Orientation,
    track::{analysis::AudioAnalysis, session::TrackSession},
    ui::{
        app::App,
        components::{
            lyrics::LyricsWidget, spectrum::SpectrumWidget, status::StatusOverlay,
        },
        layout::AppLayout,
        util::get_active_track_icon,
    },
    util::colors,
};

const KEY_HINTS: &str = "q quit · r retry · n next · space pause · o orientation · l lyrics";
const HALTED_HINTS: &str = "q quit";

/// Tempo, key and the beat playing at `position_ms`.
fn track_info(analysis: &AudioAnalysis, position_ms: i64) -> String {
    let mut info = format!("  {:.0} BPM", analysis.track.tempo);
    if let Some(key) = analysis.key_name() {
        info.push_str(&format!(" · {}", key));
    }
    if let Some(beat) = analysis.beat_at(position_ms as f64 / 1000.0) {
        info.push_str(&format!(" · beat {}", beat + 1));
    }
    info
}

fn header(app: &App, session: &TrackSession) -> Line<'static> {
    let track = app
        .player
        .current_track()
        .map(|t| t.to_string())
        .unwrap_or_else(|| "nothing playing".to_string());

    let mut spans = vec![
        Span::styled(
            format!("{} ", get_active_track_icon(!app.player.is_paused())),
            Style::default().fg(session.theme.into()),
        ),
        Span::styled("auralis  ", Style::default().fg(colors::PRIMARY)),
        Span::styled(track, Style::default().fg(colors::MUTED)),
    ];

    if let Some(analysis) = session.analysis.as_ref().filter(|_| session.is_running()) {
        let info = track_info(analysis, app.player.position_ms());
        spans.push(Span::styled(info, Style::default().fg(colors::NEUTRAL)));
    }

    Line::from(spans)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer)
    where
        Self: Sized,
    {
        buf.set_style(area, Style::new().bg(colors::BACKGROUND));

        let layout = AppLayout::new(area);
        let session = self.controller.session();

        Paragraph::new(header(self, &session)).render(layout.header, buf);

        let hints = if session.status.is_terminal() {
            HALTED_HINTS.to_string()
        } else {
            let mode = match self.orientation {
                Orientation::Horizontal => "horizontal",
                Orientation::Vertical => "vertical",
            };
            format!("{} · {}", KEY_HINTS, mode)
        };
        Paragraph::new(hints)
            .style(Style::default().fg(colors::NEUTRAL))
            .alignment(Alignment::Center)
            .render(layout.footer, buf);

        // An unrecoverable error replaces the spectrum and the lyrics.
        if !session.status.is_terminal() {
            SpectrumWidget::new(&self.surface.latest()).render(layout.main, buf);

            let lines = self.lyrics.lines();
            LyricsWidget::new(
                &lines,
                self.lyrics.current_index(),
                self.player.position_ms(),
                self.lyrics_mode,
            )
            .render(layout.lyrics(self.lyrics_mode), buf);
        }

        StatusOverlay::new(&session.status).render(layout.main, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis() -> AudioAnalysis {
        AudioAnalysis::from_value(json!({
            "track": { "tempo": 120.4, "key": 6, "mode": 0 },
            "beats": [
                { "start": 0.0, "duration": 0.5 },
                { "start": 0.5, "duration": 0.5 }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn info_counts_beats() {
        assert_eq!(track_info(&analysis(), 700), "  120 BPM · F# minor · beat 2");
    }

    #[test]
    fn info_without_beat_past_the_end() {
        assert_eq!(track_info(&analysis(), 5_000), "  120 BPM · F# minor");
    }
}
