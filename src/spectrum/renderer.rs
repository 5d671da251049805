use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::{
    player::traits::FrameSource,
    spectrum::{
        layout::{Geometry, GeometryCache, Orientation, bar_amplitudes},
        surface::{DrawContext, DrawingSurface},
    },
    track::{color::ThemeColor, error::TrackDataError, session::SharedSession},
    util::task::TaskGuard,
};

pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Paints one frame: opaque background, then one bar per slice in `accent`.
///
/// Returns the number of bars drawn. With no accent or no magnitudes only
/// the background is painted.
pub fn draw_frame(
    ctx: &mut dyn DrawContext,
    geometry: &Geometry,
    magnitudes: &[f32],
    background: ThemeColor,
    accent: Option<ThemeColor>,
) -> usize {
    ctx.begin_frame(geometry.size);
    ctx.fill(background);

    let drawn = match accent {
        Some(accent) if !magnitudes.is_empty() => {
            let amplitudes = bar_amplitudes(magnitudes, geometry.bars);
            for (i, amp) in amplitudes.iter().enumerate() {
                ctx.fill_rect(geometry.bar_rect(i, *amp), accent);
            }
            amplitudes.len()
        }
        _ => 0,
    };

    ctx.present();
    drawn
}

pub struct SpectrumRenderer {
    orientation: Orientation,
    frames: Arc<dyn FrameSource>,
    session: SharedSession,
    frame_interval: Duration,
    background: ThemeColor,
}

impl SpectrumRenderer {
    pub fn new(
        orientation: Orientation,
        frames: Arc<dyn FrameSource>,
        session: SharedSession,
    ) -> Self {
        Self {
            orientation,
            frames,
            session,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            background: ThemeColor::BLACK,
        }
    }

    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = interval;
        self
    }

    pub fn with_background(mut self, background: ThemeColor) -> Self {
        self.background = background;
        self
    }

    /// Starts the render loop and its resize observer.
    ///
    /// If no drawing context can be acquired, `on_fatal` receives
    /// [`TrackDataError::RenderSurfaceUnavailable`] and nothing is spawned.
    pub fn start(
        self,
        surface: Arc<dyn DrawingSurface>,
        on_fatal: impl FnOnce(TrackDataError),
    ) -> Option<RenderHandle> {
        let mut ctx = match surface.context() {
            Ok(ctx) => ctx,
            Err(err) => {
                error!(error = %err, "spectrum_surface_unavailable");
                on_fatal(TrackDataError::RenderSurfaceUnavailable(err.to_string()));
                return None;
            }
        };

        let geometry = Arc::new(GeometryCache::new(self.orientation, surface.size()));
        let resizes = surface.observe_resize();

        let resize = TaskGuard::new(tokio::spawn({
            let geometry = geometry.clone();
            async move {
                while let Ok(size) = resizes.recv_async().await {
                    let version = geometry.resize(size);
                    debug!(
                        version,
                        width = size.width,
                        height = size.height,
                        "spectrum_geometry_recomputed"
                    );
                }
            }
        }));

        info!(orientation = ?self.orientation, "spectrum_renderer_started");
        let render = TaskGuard::new(tokio::spawn({
            let geometry = geometry.clone();
            async move {
                let mut ticker = tokio::time::interval(self.frame_interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    let snapshot = geometry.snapshot();
                    let session = self.session.load();
                    let accent = session.is_running().then_some(session.theme);
                    let magnitudes = self.frames.poll_frame();
                    draw_frame(
                        ctx.as_mut(),
                        &snapshot,
                        &magnitudes,
                        self.background,
                        accent,
                    );
                }
            }
        }));

        Some(RenderHandle {
            render,
            resize,
            geometry,
        })
    }
}

/// Owns the render loop and resize observer. Dropping it stops both.
pub struct RenderHandle {
    render: TaskGuard,
    resize: TaskGuard,
    geometry: Arc<GeometryCache>,
}

impl RenderHandle {
    pub fn geometry(&self) -> Arc<Geometry> {
        self.geometry.snapshot()
    }

    pub fn is_running(&self) -> bool {
        !self.render.is_finished() && !self.resize.is_finished()
    }

    pub fn stop(self) {
        info!("spectrum_renderer_stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spectrum::{
        layout::{BarRect, SurfaceSize},
        surface::{DeviceScale, SurfaceError, TerminalSurface},
    };
    use crate::track::session::{SessionStatus, TrackSession};
    use arc_swap::ArcSwap;
    use std::sync::Mutex;

    const RED: ThemeColor = ThemeColor::from_u32(0xff0000);

    #[derive(Debug, Clone, PartialEq)]
    enum Op {
        Begin(SurfaceSize),
        Fill(ThemeColor),
        Rect(BarRect, ThemeColor),
        Present,
    }

    #[derive(Default)]
    struct Recorder(Vec<Op>);

    impl DrawContext for Recorder {
        fn begin_frame(&mut self, size: SurfaceSize) {
            self.0.push(Op::Begin(size));
        }
        fn fill(&mut self, color: ThemeColor) {
            self.0.push(Op::Fill(color));
        }
        fn fill_rect(&mut self, rect: BarRect, color: ThemeColor) {
            self.0.push(Op::Rect(rect, color));
        }
        fn present(&mut self) {
            self.0.push(Op::Present);
        }
    }

    impl Recorder {
        fn rects(&self) -> usize {
            self.0.iter().filter(|op| matches!(op, Op::Rect(..))).count()
        }
    }

    struct Frames(Vec<f32>);

    impl FrameSource for Frames {
        fn poll_frame(&self) -> Vec<f32> {
            self.0.clone()
        }
    }

    struct Broken;

    impl DrawingSurface for Broken {
        fn context(&self) -> Result<Box<dyn DrawContext>, SurfaceError> {
            Err(SurfaceError::Detached)
        }
        fn size(&self) -> SurfaceSize {
            SurfaceSize::default()
        }
        fn observe_resize(&self) -> flume::Receiver<SurfaceSize> {
            flume::unbounded().1
        }
    }

    fn geometry() -> Geometry {
        Geometry::compute(Orientation::Horizontal, SurfaceSize::new(800.0, 200.0), 0)
    }

    fn running(theme: ThemeColor) -> SharedSession {
        Arc::new(ArcSwap::from_pointee(TrackSession {
            status: SessionStatus::Running,
            theme,
            ..TrackSession::default()
        }))
    }

    async fn until(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[test]
    fn empty_frame_paints_background_only() {
        let mut rec = Recorder::default();
        let drawn = draw_frame(&mut rec, &geometry(), &[], ThemeColor::BLACK, Some(RED));
        assert_eq!(drawn, 0);
        assert_eq!(
            rec.0,
            vec![
                Op::Begin(SurfaceSize::new(800.0, 200.0)),
                Op::Fill(ThemeColor::BLACK),
                Op::Present
            ]
        );
    }

    #[test]
    fn bars_need_a_running_session() {
        let mut rec = Recorder::default();
        assert_eq!(draw_frame(&mut rec, &geometry(), &[0.5; 512], ThemeColor::BLACK, None), 0);
        assert_eq!(rec.rects(), 0);
    }

    #[test]
    fn bars_use_the_theme_color() {
        let g = geometry();
        let mut rec = Recorder::default();
        let drawn = draw_frame(&mut rec, &g, &[1.0; 10_000], ThemeColor::BLACK, Some(RED));
        assert_eq!(drawn, g.bars);
        assert_eq!(rec.rects(), g.bars);
        assert!(
            rec.0
                .iter()
                .all(|op| !matches!(op, Op::Rect(_, color) if *color != RED))
        );
    }

    #[test]
    fn short_frame_draws_flat_bars() {
        let mut rec = Recorder::default();
        draw_frame(&mut rec, &geometry(), &[1.0], ThemeColor::BLACK, Some(RED));
        assert!(
            rec.0
                .iter()
                .all(|op| !matches!(op, Op::Rect(rect, _) if rect.height != 0.0))
        );
    }

    #[test]
    fn unavailable_surface_is_fatal() {
        let mut reported = None;
        let handle = SpectrumRenderer::new(
            Orientation::Horizontal,
            Arc::new(Frames(Vec::new())),
            running(RED),
        )
        .start(Arc::new(Broken), |err| reported = Some(err));

        assert!(handle.is_none());
        assert!(matches!(
            reported,
            Some(TrackDataError::RenderSurfaceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn renders_and_follows_resizes() {
        let surface = Arc::new(TerminalSurface::new(100, 10, DeviceScale { x: 8, y: 16 }));
        let fatal = Mutex::new(None);
        let handle = SpectrumRenderer::new(
            Orientation::Horizontal,
            Arc::new(Frames(vec![1.0; 4096])),
            running(RED),
        )
        .with_frame_interval(Duration::from_millis(1))
        .start(surface.clone(), |err| *fatal.lock().unwrap() = Some(err))
        .unwrap();

        assert!(fatal.lock().unwrap().is_none());
        assert_eq!(handle.geometry().bars, 61);

        until(|| surface.latest().cols == 100).await;
        let frame = surface.latest();
        assert_eq!(frame.get(0, 9).unwrap().bottom, RED);

        surface.resize(50, 10);
        until(|| handle.geometry().version == 1).await;
        assert_eq!(handle.geometry().bars, 48);
        until(|| surface.latest().cols == 50).await;
    }

    #[tokio::test]
    async fn stop_releases_the_resize_observer() {
        let surface = Arc::new(TerminalSurface::new(20, 10, DeviceScale::default()));
        let handle = SpectrumRenderer::new(
            Orientation::Vertical,
            Arc::new(Frames(Vec::new())),
            running(RED),
        )
        .start(surface.clone(), |_| {})
        .unwrap();
        assert!(handle.is_running());
        assert_eq!(surface.observer_count(), 1);

        handle.stop();
        until(|| {
            surface.resize(20, 10);
            surface.observer_count() == 0
        })
        .await;
    }
}
