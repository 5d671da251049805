use crate::track::model::TrackRef;

#[derive(Debug, Clone)]
pub enum Event {
    // Events
    TrackChanged(Option<TrackRef>),
    LyricsReady(usize),

    // Commands
    Retry,
    Next,
    TogglePause,
}
