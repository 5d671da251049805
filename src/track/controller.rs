use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use arc_swap::{ArcSwap, ArcSwapOption};
use tracing::{debug, info, warn};

use crate::track::{
    analysis::AudioAnalysis,
    color::{ColorPayloadDecoder, ColorResultDecoder, ThemeColor, extract_theme_color},
    error::TrackDataError,
    model::TrackRef,
    policy::{self, LifecycleEvent},
    session::{ErrorData, Recovery, SessionStatus, SharedSession, TrackSession},
    traits::{AnalysisFetch, ColorFetch},
};

type Loaded = (Arc<AudioAnalysis>, ThemeColor);

/// Owns the current [`TrackSession`] and drives it from track changes.
///
/// Every operation takes a generation when it starts. Completions are only
/// published while their generation is still the newest, so a slow fetch for
/// an old track can never overwrite the session of a newer one.
pub struct TrackDataController {
    analysis: Arc<dyn AnalysisFetch>,
    colors: Arc<dyn ColorFetch>,
    decoder: Arc<dyn ColorPayloadDecoder>,
    session: SharedSession,
    generation: AtomicU64,
    publish_lock: Mutex<()>,
    last_track: ArcSwapOption<TrackRef>,
}

impl TrackDataController {
    pub fn new(analysis: Arc<dyn AnalysisFetch>, colors: Arc<dyn ColorFetch>) -> Self {
        Self {
            analysis,
            colors,
            decoder: Arc::new(ColorResultDecoder),
            session: Arc::new(ArcSwap::from_pointee(TrackSession::default())),
            generation: AtomicU64::new(0),
            publish_lock: Mutex::new(()),
            last_track: ArcSwapOption::empty(),
        }
    }

    pub fn session(&self) -> Arc<TrackSession> {
        self.session.load_full()
    }

    pub fn shared_session(&self) -> SharedSession {
        self.session.clone()
    }

    pub fn last_track(&self) -> Option<TrackRef> {
        self.last_track.load_full().map(|t| (*t).clone())
    }

    pub async fn on_track_changed(&self, track: Option<TrackRef>) -> bool {
        self.last_track.store(track.clone().map(Arc::new));
        self.load(track, LifecycleEvent::TrackChanged).await
    }

    /// Re-runs the last track-change against the last known track.
    /// Only honoured while the session waits for a manual retry.
    pub async fn retry(&self) -> bool {
        let track = self.last_track();
        self.load(track, LifecycleEvent::Retry).await
    }

    pub fn awaits_retry(&self) -> bool {
        matches!(
            self.session.load().status.error(),
            Some(e) if e.recovery == Recovery::Manual
        )
    }

    /// Publishes an error raised outside the fetch flow, superseding any
    /// fetch still in flight.
    pub fn report_fatal(&self, err: TrackDataError) {
        let Some(data) = ErrorData::from_error(&err) else {
            return;
        };
        warn!(error = %err, recovery = ?data.recovery, "track_data_error_reported");
        self.begin(&[LifecycleEvent::Failed(data)]);
    }

    async fn load(&self, track: Option<TrackRef>, trigger: LifecycleEvent) -> bool {
        let track = match Self::validate(track) {
            Ok(track) => track,
            Err(err) => {
                info!(error = %err, "track_data_rejected");
                let Some(data) = ErrorData::from_error(&err) else {
                    return false;
                };
                return self
                    .begin(&[trigger, LifecycleEvent::Failed(data)])
                    .is_some();
            }
        };

        let Some(generation) = self.begin(&[trigger]) else {
            debug!(track = %track, "track_data_event_absorbed");
            return false;
        };
        info!(generation, track = %track, "track_data_loading");

        let (analysis, theme) = tokio::join!(self.load_analysis(&track), self.load_theme(&track));

        match analysis {
            Ok(analysis) => {
                let published = self.publish(
                    generation,
                    &[LifecycleEvent::Loaded],
                    Some((Arc::new(analysis), theme)),
                );
                if published {
                    info!(
                        generation,
                        track = %track,
                        theme = %theme.to_hex(),
                        "track_data_running"
                    );
                }
            }
            Err(err) => {
                warn!(generation, track = %track, error = %err, "track_data_failed");
                if let Some(data) = ErrorData::from_error(&err) {
                    self.publish(generation, &[LifecycleEvent::Failed(data)], None);
                }
            }
        }

        true
    }

    fn validate(track: Option<TrackRef>) -> Result<TrackRef, TrackDataError> {
        let track = track.ok_or(TrackDataError::NoActiveTrack)?;
        if !track.is_music() {
            return Err(TrackDataError::UnsupportedTrackType);
        }
        Ok(track)
    }

    async fn load_analysis(&self, track: &TrackRef) -> Result<AudioAnalysis, TrackDataError> {
        let value = self
            .analysis
            .fetch_analysis(&track.id)
            .await
            .map_err(TrackDataError::AnalysisFetchFailed)?;
        AudioAnalysis::from_value(value)
    }

    async fn load_theme(&self, track: &TrackRef) -> ThemeColor {
        let Some(artwork) = track.artwork.as_deref() else {
            return ThemeColor::default();
        };

        match self.colors.fetch_color(artwork).await {
            Ok(payload) => extract_theme_color(payload.as_ref(), self.decoder.as_ref()),
            Err(err) => {
                debug!(track = %track, error = %err, "track_data_color_fallback");
                ThemeColor::default()
            }
        }
    }

    /// Starts a new generation if the policy accepts `events`.
    fn begin(&self, events: &[LifecycleEvent]) -> Option<u64> {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let current = self.session.load();
        let status = policy::apply(&current.status, events)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.session
            .store(Arc::new(Self::next(&current, generation, status, None)));
        Some(generation)
    }

    /// Publishes the completion of `generation`, unless it was superseded.
    fn publish(&self, generation: u64, events: &[LifecycleEvent], loaded: Option<Loaded>) -> bool {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "track_data_stale_result_dropped");
            return false;
        }

        let current = self.session.load();
        let Some(status) = policy::apply(&current.status, events) else {
            return false;
        };
        self.session
            .store(Arc::new(Self::next(&current, generation, status, loaded)));
        true
    }

    fn next(
        current: &TrackSession,
        generation: u64,
        status: SessionStatus,
        loaded: Option<Loaded>,
    ) -> TrackSession {
        let (analysis, theme) = match loaded {
            Some((analysis, theme)) => (Some(analysis), theme),
            None => (None, current.theme),
        };
        TrackSession {
            generation,
            status,
            analysis,
            theme,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{
        color::{COLOR_RESULT_TYPE, ColorPayload},
        error::FetchError,
        model::TrackKind,
    };
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicBool;
    use tokio::sync::oneshot;

    #[derive(Default)]
    struct FakeAnalysis {
        gates: Mutex<HashMap<String, oneshot::Receiver<Value>>>,
        failing: AtomicBool,
    }

    impl FakeAnalysis {
        fn gate(&self, id: &str) -> oneshot::Sender<Value> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().insert(id.to_string(), rx);
            tx
        }
    }

    #[async_trait]
    impl AnalysisFetch for FakeAnalysis {
        async fn fetch_analysis(&self, track_id: &str) -> Result<Value, FetchError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Status(503));
            }
            let gate = self.gates.lock().unwrap().remove(track_id);
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| FetchError::Network("gate dropped".into())),
                None if track_id == "broken" => Ok(json!({ "meta": {} })),
                None => Ok(json!({ "track": { "tempo": 100.0 } })),
            }
        }
    }

    struct FakeColors(Result<Option<ColorPayload>, FetchError>);

    #[async_trait]
    impl ColorFetch for FakeColors {
        async fn fetch_color(&self, _artwork: &str) -> Result<Option<ColorPayload>, FetchError> {
            self.0.clone()
        }
    }

    fn magenta() -> FakeColors {
        FakeColors(Ok(Some(ColorPayload {
            type_url: COLOR_RESULT_TYPE.to_string(),
            value: vec![0x12, 0x05, 0x08, 0xff, 0x81, 0xfc, 0x07],
        })))
    }

    fn controller(colors: FakeColors) -> (Arc<FakeAnalysis>, Arc<TrackDataController>) {
        let analysis = Arc::new(FakeAnalysis::default());
        let controller = TrackDataController::new(analysis.clone(), Arc::new(colors));
        (analysis, Arc::new(controller))
    }

    fn track(id: &str) -> Option<TrackRef> {
        Some(TrackRef::new(id, TrackKind::Track, Some(format!("img:{}", id))))
    }

    fn tempo(session: &TrackSession) -> Option<f64> {
        session.analysis.as_ref().map(|a| a.track.tempo)
    }

    fn recovery(session: &TrackSession) -> Option<Recovery> {
        session.status.error().map(|e| e.recovery)
    }

    #[tokio::test]
    async fn no_track_waits_for_song_change() {
        let (_, ctrl) = controller(magenta());
        ctrl.on_track_changed(None).await;

        let session = ctrl.session();
        assert_eq!(recovery(&session), Some(Recovery::SongChange));
        assert_eq!(
            session.status.error().unwrap().message,
            "Start playing a song to see the visualization!"
        );

        ctrl.on_track_changed(track("a")).await;
        assert!(ctrl.session().is_running());
    }

    #[tokio::test]
    async fn unsupported_kind_waits_for_song_change() {
        let (_, ctrl) = controller(magenta());
        ctrl.on_track_changed(Some(TrackRef::new("ep", TrackKind::Episode, None)))
            .await;
        assert_eq!(recovery(&ctrl.session()), Some(Recovery::SongChange));
    }

    #[tokio::test]
    async fn success_publishes_analysis_and_color() {
        let (_, ctrl) = controller(magenta());
        ctrl.on_track_changed(track("a")).await;

        let session = ctrl.session();
        assert!(session.is_running());
        assert_eq!(tempo(&session), Some(100.0));
        assert_eq!(session.theme.to_hex(), "#ff00ff");
    }

    #[tokio::test]
    async fn color_failure_falls_back_to_gray() {
        let (_, ctrl) = controller(FakeColors(Err(FetchError::Status(404))));
        ctrl.on_track_changed(track("a")).await;

        let session = ctrl.session();
        assert!(session.is_running());
        assert_eq!(session.theme, ThemeColor::default());
    }

    #[tokio::test]
    async fn analysis_failure_requires_manual_retry() {
        let (analysis, ctrl) = controller(magenta());
        analysis.failing.store(true, Ordering::SeqCst);
        ctrl.on_track_changed(track("a")).await;

        let session = ctrl.session();
        assert_eq!(recovery(&session), Some(Recovery::Manual));
        assert_eq!(
            session.status.error().unwrap().message,
            "Could not load audio analysis."
        );
        assert!(ctrl.awaits_retry());

        analysis.failing.store(false, Ordering::SeqCst);
        assert!(ctrl.retry().await);
        assert!(ctrl.session().is_running());
    }

    #[tokio::test]
    async fn malformed_analysis_requires_manual_retry() {
        let (_, ctrl) = controller(magenta());
        ctrl.on_track_changed(track("broken")).await;

        let session = ctrl.session();
        assert_eq!(recovery(&session), Some(Recovery::Manual));
        assert_eq!(
            session.status.error().unwrap().message,
            "Invalid audio analysis data."
        );
    }

    #[tokio::test]
    async fn retry_is_ignored_outside_manual_errors() {
        let (_, ctrl) = controller(magenta());
        ctrl.on_track_changed(track("a")).await;
        let before = ctrl.session().generation;

        assert!(!ctrl.retry().await);
        assert_eq!(ctrl.session().generation, before);
        assert!(ctrl.session().is_running());
    }

    #[tokio::test]
    async fn retry_during_loading_keeps_the_pending_result() {
        let (analysis, ctrl) = controller(magenta());
        let gate = analysis.gate("a");

        let pending = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.on_track_changed(track("a")).await }
        });
        while ctrl.session().generation < 1 {
            tokio::task::yield_now().await;
        }

        assert!(!ctrl.retry().await);
        gate.send(json!({ "track": { "tempo": 90.0 } })).unwrap();
        pending.await.unwrap();

        assert_eq!(tempo(&ctrl.session()), Some(90.0));
    }

    #[tokio::test]
    async fn stale_slow_fetch_never_overwrites_newer_track() {
        let (analysis, ctrl) = controller(magenta());
        let slow = analysis.gate("a");

        let first = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.on_track_changed(track("a")).await }
        });
        while ctrl.session().generation < 1 {
            tokio::task::yield_now().await;
        }

        ctrl.on_track_changed(track("b")).await;
        assert_eq!(tempo(&ctrl.session()), Some(100.0));

        slow.send(json!({ "track": { "tempo": 60.0 } })).unwrap();
        first.await.unwrap();

        let session = ctrl.session();
        assert!(session.is_running());
        assert_eq!(session.generation, 2);
        assert_eq!(tempo(&session), Some(100.0));
        assert_eq!(ctrl.last_track().unwrap().id, "b");
    }

    #[tokio::test]
    async fn stale_failure_never_overwrites_newer_track() {
        let (analysis, ctrl) = controller(magenta());
        let slow = analysis.gate("a");

        let first = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.on_track_changed(track("a")).await }
        });
        while ctrl.session().generation < 1 {
            tokio::task::yield_now().await;
        }

        ctrl.on_track_changed(track("b")).await;
        drop(slow);
        first.await.unwrap();

        assert!(ctrl.session().is_running());
    }

    #[tokio::test]
    async fn terminal_error_absorbs_track_changes() {
        let (_, ctrl) = controller(magenta());
        ctrl.on_track_changed(track("a")).await;
        ctrl.report_fatal(TrackDataError::RenderSurfaceUnavailable("no context".into()));

        let terminal = ctrl.session();
        assert_eq!(recovery(&terminal), Some(Recovery::None));

        for id in ["b", "c", "d"] {
            assert!(!ctrl.on_track_changed(track(id)).await);
        }
        ctrl.on_track_changed(None).await;
        assert!(!ctrl.retry().await);

        let session = ctrl.session();
        assert_eq!(session.generation, terminal.generation);
        assert_eq!(session.status, terminal.status);
    }

    #[tokio::test]
    async fn fatal_error_supersedes_in_flight_fetch() {
        let (analysis, ctrl) = controller(magenta());
        let gate = analysis.gate("a");

        let pending = tokio::spawn({
            let ctrl = ctrl.clone();
            async move { ctrl.on_track_changed(track("a")).await }
        });
        while ctrl.session().generation < 1 {
            tokio::task::yield_now().await;
        }

        ctrl.report_fatal(TrackDataError::RenderSurfaceUnavailable("gone".into()));
        gate.send(json!({ "track": {} })).unwrap();
        pending.await.unwrap();

        assert!(matches!(
            ctrl.session().status,
            SessionStatus::Error(ErrorData {
                recovery: Recovery::None,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn lyric_errors_are_never_reported() {
        let (_, ctrl) = controller(magenta());
        ctrl.on_track_changed(track("a")).await;
        ctrl.report_fatal(TrackDataError::LyricsFetchFailed(FetchError::Status(404)));
        assert!(ctrl.session().is_running());
    }
}
