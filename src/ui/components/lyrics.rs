use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Modifier, Style},
    widgets::Widget,
};

use crate::{
    lyrics::{
        model::LyricLine,
        sync::{LyricsMode, overlay, triplet},
    },
    util::colors,
};
use unicode_width::UnicodeWidthStr;

/// How far playback is between the current line and the next, in `0..=1`.
///
/// The last line is given one second.
pub fn line_progress(lines: &[LyricLine], idx: usize, position_ms: i64) -> f64 {
    let current = lines.get(idx).map(|l| l.start_ms).unwrap_or(0);
    let next = lines
        .get(idx + 1)
        .map(|l| l.start_ms)
        .unwrap_or(current + 1000);
    let span = next.saturating_sub(current).max(1);
    let elapsed = u64::try_from(position_ms).unwrap_or(0).saturating_sub(current);
    (elapsed as f64 / span as f64).clamp(0.0, 1.0)
}

pub struct LyricsWidget<'a> {
    lines: &'a [LyricLine],
    index: usize,
    position_ms: i64,
    mode: LyricsMode,
}

impl<'a> LyricsWidget<'a> {
    pub fn new(lines: &'a [LyricLine], index: usize, position_ms: i64, mode: LyricsMode) -> Self {
        Self {
            lines,
            index,
            position_ms,
            mode,
        }
    }

    fn centered(buf: &mut Buffer, area: Rect, y: u16, text: &str, style: Style) {
        if text.is_empty() || y < area.y || y >= area.y + area.height {
            return;
        }
        let w = UnicodeWidthStr::width(text) as u16;
        let x = area.x + area.width.saturating_sub(w) / 2;
        buf.set_stringn(x, y, text, area.width as usize, style);
    }

    fn render_triplet(&self, area: Rect, buf: &mut Buffer) {
        let lines = triplet(self.lines, self.index);
        let center_row = area.y + area.height / 2;
        let dim = Style::default().fg(colors::MUTED);

        Self::centered(buf, area, center_row.saturating_sub(1), &lines.prev, dim);
        Self::centered(
            buf,
            area,
            center_row,
            &lines.current,
            Style::default()
                .fg(colors::ACCENT)
                .add_modifier(Modifier::BOLD),
        );
        Self::centered(buf, area, center_row.saturating_add(1), &lines.next, dim);

        let max_bar_w = area.width.saturating_sub(8).min(30);
        let bar_y = center_row.saturating_add(2);
        if area.height < 3 || max_bar_w <= 2 || bar_y >= area.y + area.height {
            return;
        }
        let frac = line_progress(self.lines, self.index, self.position_ms);
        let bar_x = area.x + area.width.saturating_sub(max_bar_w) / 2;
        let pos = ((frac * (max_bar_w - 1) as f64).round() as u16).min(max_bar_w - 1);
        for i in 0..max_bar_w {
            let (ch, style) = if i == pos {
                ("•", Style::default().fg(colors::ACCENT))
            } else {
                ("─", Style::default().fg(colors::NEUTRAL))
            };
            buf.set_string(bar_x + i, bar_y, ch, style);
        }
    }

    fn render_overlay(&self, area: Rect, buf: &mut Buffer) {
        let window = overlay(self.lines, self.index);
        let top = area.y + 1;
        for (i, line) in window.lines.iter().enumerate() {
            let style = if line.is_current {
                Style::default()
                    .fg(colors::ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors::MUTED)
            };
            Self::centered(buf, area, top + i as u16, &line.text, style);
        }
    }
}

impl Widget for LyricsWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if self.lines.is_empty() || area.width == 0 || area.height == 0 {
            return;
        }
        match self.mode {
            LyricsMode::Triplet => self.render_triplet(area, buf),
            LyricsMode::Overlay => self.render_overlay(area, buf),
        }
    }
}
