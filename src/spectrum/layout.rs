use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use arc_swap::ArcSwap;

/// Exponent applied to every bar's mean magnitude; lifts quiet bins.
pub const COMPRESSION: f32 = 0.7;
/// Share of the secondary axis a full-scale bar may cover.
pub const HEADROOM: f32 = 0.9;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

impl Orientation {
    pub fn toggled(self) -> Self {
        match self {
            Orientation::Horizontal => Orientation::Vertical,
            Orientation::Vertical => Orientation::Horizontal,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarLayoutConfig {
    pub bar_width: f32,
    pub gap: f32,
    pub min_bars: usize,
    pub max_bars: usize,
}

impl BarLayoutConfig {
    pub fn for_orientation(orientation: Orientation) -> Self {
        match orientation {
            Orientation::Vertical => Self {
                bar_width: 6.0,
                gap: 2.0,
                min_bars: 48,
                max_bars: 96,
            },
            Orientation::Horizontal => Self {
                bar_width: 10.0,
                gap: 3.0,
                min_bars: 48,
                max_bars: 96,
            },
        }
    }

    pub fn pitch(&self) -> f32 {
        self.bar_width + self.gap
    }

    pub fn bar_count(&self, primary: f32) -> usize {
        let fit = (primary / self.pitch()).floor();
        // NaN and negative sizes fit nothing
        let fit = if fit > 0.0 { fit as usize } else { 0 };
        fit.clamp(self.min_bars, self.max_bars)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SurfaceSize {
    pub width: f32,
    pub height: f32,
}

impl SurfaceSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Everything one frame needs to lay out its bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geometry {
    pub version: u64,
    pub orientation: Orientation,
    pub config: BarLayoutConfig,
    pub size: SurfaceSize,
    pub bars: usize,
}

impl Geometry {
    pub fn compute(orientation: Orientation, size: SurfaceSize, version: u64) -> Self {
        let config = BarLayoutConfig::for_orientation(orientation);
        let primary = match orientation {
            Orientation::Vertical => size.height,
            Orientation::Horizontal => size.width,
        };
        Self {
            version,
            orientation,
            config,
            size,
            bars: config.bar_count(primary),
        }
    }

    pub fn bar_rect(&self, index: usize, amplitude: f32) -> BarRect {
        let offset = index as f32 * self.config.pitch();
        match self.orientation {
            Orientation::Horizontal => {
                let height = amplitude * self.size.height * HEADROOM;
                BarRect {
                    x: offset,
                    y: self.size.height - height,
                    width: self.config.bar_width,
                    height,
                }
            }
            Orientation::Vertical => {
                let length = amplitude * self.size.width * HEADROOM;
                BarRect {
                    x: (self.size.width - length) / 2.0,
                    y: offset,
                    width: length,
                    height: self.config.bar_width,
                }
            }
        }
    }
}

/// Compressed mean magnitude of each of `bars` equal slices.
///
/// With fewer samples than bars every slice is empty and every bar is 0.
pub fn bar_amplitudes(magnitudes: &[f32], bars: usize) -> Vec<f32> {
    if bars == 0 {
        return Vec::new();
    }
    let slice = magnitudes.len() / bars;
    (0..bars)
        .map(|i| {
            if slice == 0 {
                return 0.0;
            }
            let chunk = &magnitudes[i * slice..(i + 1) * slice];
            let mean = chunk.iter().sum::<f32>() / slice as f32;
            if mean > 0.0 { mean.powf(COMPRESSION) } else { 0.0 }
        })
        .collect()
}

/// Single-writer cache of the current geometry.
///
/// The resize observer swaps in a freshly computed value; the render tick
/// loads one snapshot per frame and never sees a half-updated layout.
pub struct GeometryCache {
    current: ArcSwap<Geometry>,
    version: AtomicU64,
}

impl GeometryCache {
    pub fn new(orientation: Orientation, size: SurfaceSize) -> Self {
        Self {
            current: ArcSwap::from_pointee(Geometry::compute(orientation, size, 0)),
            version: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<Geometry> {
        self.current.load_full()
    }

    pub fn resize(&self, size: SurfaceSize) -> u64 {
        let orientation = self.current.load().orientation;
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        self.current
            .store(Arc::new(Geometry::compute(orientation, size, version)));
        version
    }
}
