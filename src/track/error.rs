use thiserror::Error;

use crate::track::session::Recovery;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected status: {0}")]
    Status(u16),

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None if err.is_decode() => FetchError::Decode(err.to_string()),
            None => FetchError::Network(err.to_string()),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrackDataError {
    #[error("Start playing a song to see the visualization!")]
    NoActiveTrack,

    #[error("Error: The type of track you're listening to is currently not supported")]
    UnsupportedTrackType,

    #[error("Could not load audio analysis.")]
    AnalysisFetchFailed(#[source] FetchError),

    #[error("Invalid audio analysis data.")]
    AnalysisMalformed(String),

    #[error("The visualization surface is unavailable: {0}")]
    RenderSurfaceUnavailable(String),

    #[error("Could not load lyrics.")]
    LyricsFetchFailed(#[source] FetchError),
}

impl TrackDataError {
    /// Recovery class for errors that reach the session. Lyric failures never do.
    pub fn recovery(&self) -> Option<Recovery> {
        match self {
            TrackDataError::NoActiveTrack | TrackDataError::UnsupportedTrackType => {
                Some(Recovery::SongChange)
            }
            TrackDataError::AnalysisFetchFailed(_) | TrackDataError::AnalysisMalformed(_) => {
                Some(Recovery::Manual)
            }
            TrackDataError::RenderSurfaceUnavailable(_) => Some(Recovery::None),
            TrackDataError::LyricsFetchFailed(_) => None,
        }
    }
}
