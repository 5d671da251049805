use crate::ui::message::AppMessage;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

pub struct InputHandler;

impl InputHandler {
    pub fn handle_key(key: KeyEvent) -> Option<AppMessage> {
        match (key.code, key.modifiers) {
            (KeyCode::Char('q'), _) => Some(AppMessage::Quit),
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(AppMessage::Quit),
            (KeyCode::Char('r'), _) => Some(AppMessage::Retry),
            (KeyCode::Char('n'), _) => Some(AppMessage::NextTrack),
            (KeyCode::Char(' '), _) => Some(AppMessage::TogglePause),
            (KeyCode::Char('o'), _) => Some(AppMessage::ToggleOrientation),
            (KeyCode::Char('l'), _) => Some(AppMessage::ToggleLyricsMode),
            _ => None,
        }
    }
}
