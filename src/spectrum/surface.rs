use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicBool, Ordering},
};

use arc_swap::ArcSwap;
use flume::{Receiver, Sender};
use thiserror::Error;

use crate::{
    spectrum::layout::{BarRect, SurfaceSize},
    track::color::ThemeColor,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    #[error("surface has no drawable area ({cols}x{rows} cells)")]
    Empty { cols: u16, rows: u16 },

    #[error("surface was detached")]
    Detached,
}

/// Immediate-mode drawing on a raster target, in device pixels.
pub trait DrawContext: Send {
    /// Prepares a frame of `size`. Content of the previous frame is kept.
    fn begin_frame(&mut self, size: SurfaceSize);
    fn fill(&mut self, color: ThemeColor);
    fn fill_rect(&mut self, rect: BarRect, color: ThemeColor);
    fn present(&mut self);
}

pub trait DrawingSurface: Send + Sync {
    fn context(&self) -> Result<Box<dyn DrawContext>, SurfaceError>;
    fn size(&self) -> SurfaceSize;
    /// Receives the new size on every resize until the receiver is dropped.
    fn observe_resize(&self) -> Receiver<SurfaceSize>;
}

/// Device pixels per terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceScale {
    pub x: u16,
    pub y: u16,
}

impl Default for DeviceScale {
    fn default() -> Self {
        Self { x: 8, y: 16 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HalfCell {
    pub top: ThemeColor,
    pub bottom: ThemeColor,
}

/// A presented frame, downsampled to two colors per terminal cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellFrame {
    pub cols: u16,
    pub rows: u16,
    pub cells: Vec<HalfCell>,
}

impl CellFrame {
    pub fn get(&self, col: u16, row: u16) -> Option<HalfCell> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        self.cells
            .get(row as usize * self.cols as usize + col as usize)
            .copied()
    }
}

/// Terminal-backed surface: frames are rasterized at `cells × scale` pixels
/// and handed to the UI as [`CellFrame`]s.
pub struct TerminalSurface {
    scale: DeviceScale,
    cells: ArcSwap<(u16, u16)>,
    frame: Arc<ArcSwap<CellFrame>>,
    observers: Mutex<Vec<Sender<SurfaceSize>>>,
    detached: AtomicBool,
}

impl TerminalSurface {
    pub fn new(cols: u16, rows: u16, scale: DeviceScale) -> Self {
        Self {
            scale,
            cells: ArcSwap::from_pointee((cols, rows)),
            frame: Arc::new(ArcSwap::from_pointee(CellFrame::default())),
            observers: Mutex::new(Vec::new()),
            detached: AtomicBool::new(false),
        }
    }

    pub fn resize(&self, cols: u16, rows: u16) {
        self.cells.store(Arc::new((cols, rows)));
        let size = self.size();
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(size).is_ok());
    }

    pub fn latest(&self) -> Arc<CellFrame> {
        self.frame.load_full()
    }

    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Refuses new contexts, e.g. once the terminal is being torn down.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::SeqCst);
    }
}

impl DrawingSurface for TerminalSurface {
    fn context(&self) -> Result<Box<dyn DrawContext>, SurfaceError> {
        if self.detached.load(Ordering::SeqCst) {
            return Err(SurfaceError::Detached);
        }
        let (cols, rows) = **self.cells.load();
        if cols == 0 || rows == 0 || self.scale.x == 0 || self.scale.y == 0 {
            return Err(SurfaceError::Empty { cols, rows });
        }
        Ok(Box::new(RasterContext::new(self.scale, self.frame.clone())))
    }

    fn size(&self) -> SurfaceSize {
        let (cols, rows) = **self.cells.load();
        SurfaceSize::new(
            f32::from(cols) * f32::from(self.scale.x),
            f32::from(rows) * f32::from(self.scale.y),
        )
    }

    fn observe_resize(&self) -> Receiver<SurfaceSize> {
        let (tx, rx) = flume::unbounded();
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }
}

struct RasterContext {
    scale: DeviceScale,
    width: usize,
    height: usize,
    pixels: Vec<ThemeColor>,
    output: Arc<ArcSwap<CellFrame>>,
}

impl RasterContext {
    fn new(scale: DeviceScale, output: Arc<ArcSwap<CellFrame>>) -> Self {
        Self {
            scale,
            width: 0,
            height: 0,
            pixels: Vec::new(),
            output,
        }
    }

    fn average(&self, x0: usize, x1: usize, y0: usize, y1: usize) -> ThemeColor {
        let (mut r, mut g, mut b, mut n) = (0u32, 0u32, 0u32, 0u32);
        for y in y0..y1.min(self.height) {
            let row = &self.pixels[y * self.width..(y + 1) * self.width];
            for px in &row[x0.min(self.width)..x1.min(self.width)] {
                r += u32::from(px.r);
                g += u32::from(px.g);
                b += u32::from(px.b);
                n += 1;
            }
        }
        if n == 0 {
            return ThemeColor::BLACK;
        }
        ThemeColor {
            r: (r / n) as u8,
            g: (g / n) as u8,
            b: (b / n) as u8,
        }
    }
}

fn to_pixels(value: f32, limit: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        (value as usize).min(limit)
    }
}

impl DrawContext for RasterContext {
    fn begin_frame(&mut self, size: SurfaceSize) {
        let width = to_pixels(size.width, usize::from(u16::MAX));
        let height = to_pixels(size.height, usize::from(u16::MAX));
        if width != self.width || height != self.height {
            self.width = width;
            self.height = height;
            self.pixels = vec![ThemeColor::BLACK; width * height];
        }
    }

    fn fill(&mut self, color: ThemeColor) {
        self.pixels.fill(color);
    }

    fn fill_rect(&mut self, rect: BarRect, color: ThemeColor) {
        let x0 = to_pixels(rect.x.round(), self.width);
        let y0 = to_pixels(rect.y.round(), self.height);
        let x1 = to_pixels((rect.x + rect.width).round(), self.width);
        let y1 = to_pixels((rect.y + rect.height).round(), self.height);
        for y in y0..y1 {
            self.pixels[y * self.width + x0..y * self.width + x1.max(x0)].fill(color);
        }
    }

    fn present(&mut self) {
        let sx = usize::from(self.scale.x);
        let sy = usize::from(self.scale.y);
        let cols = self.width / sx;
        let rows = self.height / sy;
        let half = (sy / 2).max(1);

        let mut cells = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            let y = row * sy;
            for col in 0..cols {
                let x = col * sx;
                let top = self.average(x, x + sx, y, y + half);
                let bottom = if sy > 1 {
                    self.average(x, x + sx, y + half, y + sy)
                } else {
                    top
                };
                cells.push(HalfCell { top, bottom });
            }
        }

        self.output.store(Arc::new(CellFrame {
            cols: cols as u16,
            rows: rows as u16,
            cells,
        }));
    }
}
