use ratatui::style::Color;

pub const PRIMARY: Color = Color::from_u32(0x007c3aed);
pub const NEUTRAL: Color = Color::from_u32(0x00404040);
pub const MUTED: Color = Color::from_u32(0x00a0a0a0);
pub const BACKGROUND: Color = Color::from_u32(0x00000000);
pub const ACCENT: Color = Color::from_u32(0x00feca88);
pub const ERROR: Color = Color::from_u32(0x00e06c75);
