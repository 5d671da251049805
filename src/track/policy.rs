//! Lifecycle transitions of the visualization session.
//!
//! `transition` is the only place that decides whether an event moves the
//! session. The controller folds every update through it.

use crate::track::session::{ErrorData, Recovery, SessionStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    TrackChanged,
    Retry,
    Loaded,
    Failed(ErrorData),
}

/// Returns the next status, or `None` when the event is absorbed.
pub fn transition(current: &SessionStatus, event: &LifecycleEvent) -> Option<SessionStatus> {
    if current.is_terminal() {
        return None;
    }

    match (current, event) {
        (_, LifecycleEvent::TrackChanged) => Some(SessionStatus::Loading),
        (SessionStatus::Error(e), LifecycleEvent::Retry) if e.recovery == Recovery::Manual => {
            Some(SessionStatus::Loading)
        }
        (_, LifecycleEvent::Retry) => None,
        (SessionStatus::Loading, LifecycleEvent::Loaded) => Some(SessionStatus::Running),
        (_, LifecycleEvent::Loaded) => None,
        (_, LifecycleEvent::Failed(data)) => Some(SessionStatus::Error(data.clone())),
    }
}

/// Applies events in order; `None` if any of them is absorbed.
pub fn apply(current: &SessionStatus, events: &[LifecycleEvent]) -> Option<SessionStatus> {
    events.iter().try_fold(current.clone(), |status, event| {
        transition(&status, event)
    })
}
