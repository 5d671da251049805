use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::{
    track::session::{ErrorData, Recovery, SessionStatus},
    ui::components::spinner::Spinner,
    util::colors,
};

pub const RETRY_HINT: &str = "[r] Try again";

/// Loading spinner or error panel on top of the spectrum. Draws nothing while running.
pub struct StatusOverlay<'a> {
    status: &'a SessionStatus,
}

impl<'a> StatusOverlay<'a> {
    pub fn new(status: &'a SessionStatus) -> Self {
        Self { status }
    }

    fn render_error(error: &ErrorData, area: Rect, buf: &mut Buffer) {
        let mut text = vec![error.message.clone()];
        if error.recovery == Recovery::Manual {
            text.push(String::new());
            text.push(RETRY_HINT.to_string());
        }

        let width = area.width.saturating_sub(4).min(56);
        let height = (text.len() as u16 + 2).min(area.height);
        let panel = Rect::new(
            area.x + area.width.saturating_sub(width) / 2,
            area.y + area.height.saturating_sub(height) / 2,
            width,
            height,
        );

        Clear.render(panel, buf);
        Paragraph::new(text.join("\n"))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(colors::ERROR).add_modifier(Modifier::BOLD))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(colors::NEUTRAL)),
            )
            .render(panel, buf);
    }
}

impl Widget for StatusOverlay<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.status {
            SessionStatus::Running => {}
            SessionStatus::Loading => Spinner::new()
                .with_label("Loading track data")
                .with_style(Style::default().fg(colors::MUTED))
                .render(area, buf),
            SessionStatus::Error(error) => Self::render_error(error, area, buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(buf: &Buffer) -> String {
        buf.content().iter().map(|c| c.symbol()).collect()
    }

    fn render(status: SessionStatus) -> Buffer {
        let area = Rect::new(0, 0, 70, 9);
        let mut buf = Buffer::empty(area);
        StatusOverlay::new(&status).render(area, &mut buf);
        buf
    }

    #[test]
    fn manual_errors_offer_a_retry() {
        let buf = render(SessionStatus::Error(ErrorData::new(
            "Could not load audio analysis.",
            Recovery::Manual,
        )));
        assert!(text(&buf).contains("Could not load audio analysis."));
        assert!(text(&buf).contains(RETRY_HINT));
    }

    #[test]
    fn song_change_errors_only_show_the_message() {
        let buf = render(SessionStatus::Error(ErrorData::new(
            "Start playing a song",
            Recovery::SongChange,
        )));
        assert!(text(&buf).contains("Start playing a song"));
        assert!(!text(&buf).contains(RETRY_HINT));
    }

    #[test]
    fn running_draws_nothing() {
        let buf = render(SessionStatus::Running);
        assert_eq!(buf, Buffer::empty(buf.area));
    }

    #[test]
    fn loading_shows_a_label() {
        assert!(text(&render(SessionStatus::Loading)).contains("Loading track data"));
    }
}
