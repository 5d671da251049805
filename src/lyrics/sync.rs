use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, AtomicUsize, Ordering},
};
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::{
    lyrics::model::{LyricLine, sort_lines},
    player::traits::PositionSource,
    track::{error::TrackDataError, model::TrackRef, traits::LyricsFetch},
    util::task::TaskGuard,
};

pub const OVERLAY_WINDOW: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LyricsMode {
    #[default]
    Overlay,
    Triplet,
}

impl LyricsMode {
    pub fn toggled(self) -> Self {
        match self {
            LyricsMode::Overlay => LyricsMode::Triplet,
            LyricsMode::Triplet => LyricsMode::Overlay,
        }
    }
}

/// Greatest index whose line has started at `position_ms`, or 0.
///
/// Scans forward and stops at the first line that starts later, so lines
/// sharing a timestamp resolve to the last of them.
pub fn line_index(lines: &[LyricLine], position_ms: i64) -> usize {
    let mut current = 0;
    for (i, line) in lines.iter().enumerate() {
        if i64::try_from(line.start_ms).is_ok_and(|start| start <= position_ms) {
            current = i;
        } else {
            break;
        }
    }
    current
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Triplet {
    pub prev: String,
    pub current: String,
    pub next: String,
}

pub fn triplet(lines: &[LyricLine], idx: usize) -> Triplet {
    let text = |i: Option<usize>| {
        i.and_then(|i| lines.get(i))
            .map(|l| l.text.clone())
            .unwrap_or_default()
    };
    Triplet {
        prev: text(idx.checked_sub(1)),
        current: text(Some(idx)),
        next: text(idx.checked_add(1)),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayLine {
    pub text: String,
    pub is_current: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayWindow {
    pub start: usize,
    pub lines: Vec<OverlayLine>,
}

pub fn overlay(lines: &[LyricLine], idx: usize) -> OverlayWindow {
    let start = idx.saturating_sub(OVERLAY_WINDOW / 2);
    let lines = lines
        .iter()
        .enumerate()
        .skip(start)
        .take(OVERLAY_WINDOW)
        .map(|(i, l)| OverlayLine {
            text: l.text.clone(),
            is_current: i == idx,
        })
        .collect();
    OverlayWindow { start, lines }
}

/// Tracks the current lyric line of the playing track.
///
/// Lines and index are only written under `publish_lock`, so an index is
/// never stored against a list it was not computed from.
#[derive(Default)]
pub struct LyricsSynchronizer {
    lines: ArcSwap<Vec<LyricLine>>,
    index: AtomicUsize,
    generation: AtomicU64,
    publish_lock: Mutex<()>,
}

impl LyricsSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Arc<Vec<LyricLine>> {
        self.lines.load_full()
    }

    pub fn current_index(&self) -> usize {
        self.index.load(Ordering::Relaxed)
    }

    pub fn has_lines(&self) -> bool {
        !self.lines.load().is_empty()
    }

    /// Replaces the lines for `track`. Failures leave the synchronizer empty,
    /// and a result that arrives after a newer reload started is dropped.
    pub async fn reload(&self, fetch: &dyn LyricsFetch, track: Option<&TrackRef>) {
        let generation = {
            let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
            self.lines.store(Arc::new(Vec::new()));
            self.index.store(0, Ordering::Relaxed);
            self.generation.fetch_add(1, Ordering::SeqCst) + 1
        };

        let Some(track) = track else {
            return;
        };

        match fetch.fetch_lyrics(&track.id).await {
            Ok(lines) => {
                let lines = Arc::new(sort_lines(lines));
                let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
                if self.generation.load(Ordering::SeqCst) != generation {
                    debug!(track = %track, "lyrics_stale_result_dropped");
                    return;
                }
                info!(track = %track, lines = lines.len(), "lyrics_loaded");
                self.lines.store(lines);
            }
            Err(source) => {
                let err = TrackDataError::LyricsFetchFailed(source.clone());
                debug!(track = %track, error = %err, cause = %source, "lyrics_unavailable");
            }
        }
    }

    pub fn tick(&self, position_ms: i64) -> usize {
        let _guard = self.publish_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let idx = line_index(&self.lines.load(), position_ms);
        self.index.store(idx, Ordering::Relaxed);
        idx
    }

    pub fn triplet(&self) -> Triplet {
        triplet(&self.lines.load(), self.current_index())
    }

    pub fn overlay(&self) -> OverlayWindow {
        overlay(&self.lines.load(), self.current_index())
    }

    /// Polls `position` every `interval` until the returned guard drops.
    pub fn spawn_ticker(
        self: &Arc<Self>,
        position: Arc<dyn PositionSource>,
        interval: Duration,
    ) -> TaskGuard {
        let this = self.clone();
        TaskGuard::new(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if this.has_lines() {
                    this.tick(position.position_ms());
                }
            }
        }))
    }
}
