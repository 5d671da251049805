use ratatui::{buffer::Buffer, layout::Rect, style::Style, widgets::Widget};

use crate::spectrum::surface::CellFrame;

const HALF_BLOCK: &str = "▀";

/// Blits the last presented frame, two vertical pixels per cell.
pub struct SpectrumWidget<'a> {
    frame: &'a CellFrame,
}

impl<'a> SpectrumWidget<'a> {
    pub fn new(frame: &'a CellFrame) -> Self {
        Self { frame }
    }
}

impl Widget for SpectrumWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for row in 0..area.height.min(self.frame.rows) {
            for col in 0..area.width.min(self.frame.cols) {
                let Some(cell) = self.frame.get(col, row) else {
                    continue;
                };
                buf[(area.x + col, area.y + row)]
                    .set_symbol(HALF_BLOCK)
                    .set_style(Style::new().fg(cell.top.into()).bg(cell.bottom.into()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{spectrum::surface::HalfCell, track::color::ThemeColor};
    use ratatui::style::Color;

    #[test]
    fn blits_half_cells_clipped_to_area() {
        let red = ThemeColor::from_u32(0xff0000);
        let frame = CellFrame {
            cols: 3,
            rows: 1,
            cells: vec![
                HalfCell {
                    top: ThemeColor::BLACK,
                    bottom: red,
                };
                3
            ],
        };
        let mut buf = Buffer::empty(Rect::new(0, 0, 4, 2));
        SpectrumWidget::new(&frame).render(Rect::new(1, 1, 2, 1), &mut buf);

        let cell = &buf[(1, 1)];
        assert_eq!(cell.symbol(), HALF_BLOCK);
        assert_eq!(cell.fg, Color::Rgb(0, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(255, 0, 0));
        assert_eq!(buf[(2, 1)].symbol(), HALF_BLOCK);
        assert_eq!(buf[(3, 1)].symbol(), " ");
        assert_eq!(buf[(1, 0)].symbol(), " ");
    }
}
