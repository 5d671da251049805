use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::track::{analysis::AudioAnalysis, color::ThemeColor, error::TrackDataError};

/// How an error state may be left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Terminal. Nothing leaves this state.
    None,
    /// Only an explicit retry leaves this state.
    Manual,
    /// The next track change leaves this state.
    SongChange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorData {
    pub message: String,
    pub recovery: Recovery,
}

impl ErrorData {
    pub fn new(message: impl Into<String>, recovery: Recovery) -> Self {
        Self {
            message: message.into(),
            recovery,
        }
    }

    pub fn from_error(err: &TrackDataError) -> Option<Self> {
        err.recovery().map(|recovery| Self::new(err.to_string(), recovery))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Loading,
    Running,
    Error(ErrorData),
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Error(e) if e.recovery == Recovery::None)
    }

    pub fn error(&self) -> Option<&ErrorData> {
        match self {
            SessionStatus::Error(e) => Some(e),
            _ => None,
        }
    }
}

/// Snapshot of the visualization lifecycle. Replaced wholesale on every transition.
#[derive(Debug, Clone)]
pub struct TrackSession {
    pub generation: u64,
    pub status: SessionStatus,
    pub analysis: Option<Arc<AudioAnalysis>>,
    pub theme: ThemeColor,
}

impl TrackSession {
    pub fn is_running(&self) -> bool {
        self.status == SessionStatus::Running
    }
}

impl Default for TrackSession {
    fn default() -> Self {
        Self {
            generation: 0,
            status: SessionStatus::Loading,
            analysis: None,
            theme: ThemeColor::default(),
        }
    }
}

/// Read side of the current session. Only the controller stores into it.
pub type SharedSession = Arc<ArcSwap<TrackSession>>;
