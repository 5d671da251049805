#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMessage {
    Quit,
    Retry,
    NextTrack,
    TogglePause,
    ToggleOrientation,
    ToggleLyricsMode,
}
