use std::f32::consts::TAU;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use flume::{Receiver, Sender};
use rand::Rng;
use tracing::info;

use crate::{
    player::traits::{FrameSource, PositionSource, TrackChangeSource},
    track::model::TrackRef,
    util::task::TaskGuard,
};

const CLOCK_INTERVAL: Duration = Duration::from_millis(250);

struct Clock {
    index: Option<usize>,
    started: Instant,
    paused_at: Option<Instant>,
}

impl Clock {
    fn elapsed(&self) -> Duration {
        let now = self.paused_at.unwrap_or_else(Instant::now);
        now.saturating_duration_since(self.started)
    }
}

/// Stand-in player that walks a playlist on a wall clock and synthesizes
/// magnitude frames for whatever is "playing".
pub struct DemoPlayer {
    playlist: Vec<TrackRef>,
    track_length: Duration,
    bins: usize,
    clock: Mutex<Clock>,
    subscribers: Mutex<Vec<Sender<Option<TrackRef>>>>,
}

impl DemoPlayer {
    pub fn new(playlist: Vec<TrackRef>, track_length: Duration, bins: usize) -> Self {
        let index = (!playlist.is_empty()).then_some(0);
        Self {
            playlist,
            track_length,
            bins,
            clock: Mutex::new(Clock {
                index,
                started: Instant::now(),
                paused_at: None,
            }),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn clock(&self) -> MutexGuard<'_, Clock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_paused(&self) -> bool {
        self.clock().paused_at.is_some()
    }

    pub fn toggle_pause(&self) {
        let mut clock = self.clock();
        match clock.paused_at.take() {
            Some(paused_at) => clock.started += paused_at.elapsed(),
            None => clock.paused_at = Some(Instant::now()),
        }
    }

    /// Advances to the next playlist entry and notifies subscribers.
    pub fn next(&self) {
        let track = {
            let mut clock = self.clock();
            clock.index = clock.index.map(|i| (i + 1) % self.playlist.len());
            clock.started = Instant::now();
            clock.paused_at = None;
            clock.index.and_then(|i| self.playlist.get(i).cloned())
        };

        info!(track = ?track.as_ref().map(|t| t.to_string()), "demo_player_track_changed");
        self.broadcast(track);
    }

    fn broadcast(&self, track: Option<TrackRef>) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(track.clone()).is_ok());
    }

    /// Skips to the next track whenever the current one runs out.
    pub fn spawn_clock(self: &Arc<Self>) -> TaskGuard {
        let this = self.clone();
        TaskGuard::new(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CLOCK_INTERVAL);
            loop {
                ticker.tick().await;
                let finished = {
                    let clock = this.clock();
                    clock.index.is_some() && clock.elapsed() >= this.track_length
                };
                if finished {
                    this.next();
                }
            }
        }))
    }
}

impl TrackChangeSource for DemoPlayer {
    fn current_track(&self) -> Option<TrackRef> {
        self.clock().index.and_then(|i| self.playlist.get(i).cloned())
    }

    fn subscribe(&self) -> Receiver<Option<TrackRef>> {
        let (tx, rx) = flume::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}

impl PositionSource for DemoPlayer {
    fn position_ms(&self) -> i64 {
        let clock = self.clock();
        if clock.index.is_none() {
            return 0;
        }
        i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX)
    }
}

impl FrameSource for DemoPlayer {
    fn poll_frame(&self) -> Vec<f32> {
        let t = {
            let clock = self.clock();
            if clock.index.is_none() || clock.paused_at.is_some() {
                return Vec::new();
            }
            clock.elapsed().as_secs_f32()
        };

        let mut rng = rand::rng();
        let bins = self.bins.max(1) as f32;
        let beat = 0.6 + 0.4 * (t * TAU * 2.0).cos().max(0.0);
        (0..self.bins)
            .map(|k| {
                let x = k as f32 / bins;
                let envelope = (1.0 - x).powi(3);
                let wave = 0.5 + 0.5 * (t * (1.5 + 6.0 * x) + k as f32 * 0.37).sin();
                let noise = rng.random::<f32>() * 0.05;
                ((wave * beat + noise) * envelope).clamp(0.0, 1.0)
            })
            .collect()
    }
}
