use flume::Receiver;

use crate::track::model::TrackRef;

/// Where track-change notifications come from.
pub trait TrackChangeSource: Send + Sync {
    fn current_track(&self) -> Option<TrackRef>;
    fn subscribe(&self) -> Receiver<Option<TrackRef>>;
}

/// Live magnitude stream. An empty frame means nothing is playing.
pub trait FrameSource: Send + Sync {
    fn poll_frame(&self) -> Vec<f32>;
}

pub trait PositionSource: Send + Sync {
    fn position_ms(&self) -> i64;
}
