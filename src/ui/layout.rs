use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::lyrics::sync::{LyricsMode, OVERLAY_WINDOW};

/// Screen regions. The spectrum surface always matches `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub header: Rect,
    pub main: Rect,
    pub footer: Rect,
}

impl AppLayout {
    pub fn new(area: Rect) -> Self {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(area);

        Self {
            header: chunks[0],
            main: chunks[1],
            footer: chunks[2],
        }
    }

    /// Where lyrics are drawn on top of the spectrum.
    pub fn lyrics(&self, mode: LyricsMode) -> Rect {
        let height = match mode {
            LyricsMode::Overlay => OVERLAY_WINDOW as u16 + 2,
            LyricsMode::Triplet => 5,
        }
        .min(self.main.height);
        let width = self.main.width.saturating_sub(4).min(72);

        let x = self.main.x + (self.main.width - width) / 2;
        let y = match mode {
            LyricsMode::Overlay => self.main.y + 1.min(self.main.height - height),
            LyricsMode::Triplet => self.main.y + (self.main.height - height) / 2,
        };
        Rect::new(x, y, width, height)
    }
}
