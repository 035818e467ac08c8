//! Nearest-color palette matching.
//!
//! Low bit-depth hardware only addresses a contiguous *window* of a larger
//! shared palette: 2, 4 or 16 entries starting at an offset aligned to the
//! window size. Three strategies map pixels into such a window:
//!
//! - [`MatchStrategy::ForceMap`] matches against the whole palette and folds
//!   the result into the window (`global % size + offset`).
//! - [`MatchStrategy::Fit`] searches only the colors inside the window.
//! - [`MatchStrategy::BestFit`] scores every aligned window by its summed
//!   nearest-color error and fits against the cheapest one.
//!
//! Transparent pixels never run the search: they take index 0 (ForceMap on
//! the whole palette) or the first entry of the window.

pub mod metric;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{Color, Palette, SourceBitmap};
use crate::compression::PixelDepth;
use crate::constants::{BEST_FIT_CHECKPOINT_INTERVAL, MATCH_CHECKPOINT_INTERVAL};
use crate::task::{Cancelled, TaskContext};
pub use metric::{DistanceMetric, Euclidean, LabDeltaE, Manhattan, Metric, WeightedRgb};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MatchError {
    #[error("Palette is empty")]
    EmptyPalette,
    #[error("Palette matching was cancelled")]
    Cancelled(#[from] Cancelled),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchStrategy {
    ForceMap,
    #[default]
    Fit,
    BestFit,
}

/// A validated sub-range of a palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteWindow {
    pub offset: usize,
    pub size: usize,
}

impl PaletteWindow {
    /// Aligns `offset` down to `size` and clamps it so the window stays inside
    /// the palette. A palette no larger than `size` always gives offset 0.
    pub fn resolve(palette_len: usize, offset: usize, size: usize) -> Result<Self, MatchError> {
        if palette_len == 0 {
            return Err(MatchError::EmptyPalette);
        }
        let size = size.max(1);
        let aligned = offset - offset % size;
        if palette_len <= size {
            if aligned != 0 {
                warn!(
                    "Palette offset {} out of range for {} colors, using 0",
                    offset, palette_len
                );
            }
            return Ok(Self { offset: 0, size });
        }
        if aligned.checked_add(size).map_or(true, |end| end > palette_len) {
            let clamped = (palette_len - size) / size * size;
            warn!(
                "Palette offset {} out of range for {} colors, clamped to {}",
                offset, palette_len, clamped
            );
            return Ok(Self {
                offset: clamped,
                size,
            });
        }
        Ok(Self {
            offset: aligned,
            size,
        })
    }

    /// Palette entries covered by this window (shorter than `size` for small palettes).
    pub fn colors<'a>(&self, palette: &'a Palette) -> &'a [Color] {
        let colors = palette.colors();
        let end = self.offset.saturating_add(self.size).min(colors.len());
        &colors[self.offset.min(end)..end]
    }
}

/// Index of the closest candidate and its distance; the lowest index wins ties.
pub fn nearest_with_distance<M: DistanceMetric + ?Sized>(
    pixel: Color,
    candidates: &[Color],
    metric: &M,
) -> (usize, f64) {
    let mut best = 0;
    let mut best_distance = f64::INFINITY;
    for (i, &candidate) in candidates.iter().enumerate() {
        let distance = metric.distance(pixel, candidate);
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    (best, best_distance)
}

pub fn nearest_index<M: DistanceMetric + ?Sized>(
    pixel: Color,
    candidates: &[Color],
    metric: &M,
) -> usize {
    nearest_with_distance(pixel, candidates, metric).0
}

/// Window-local indices for every pixel plus the window they refer to.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub indices: Vec<u8>,
    pub offset: usize,
    pub window_size: usize,
    pub total_error: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PaletteMatcher<M = Euclidean> {
    metric: M,
}

impl<M: DistanceMetric> PaletteMatcher<M> {
    pub fn new(metric: M) -> Self {
        Self { metric }
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Nearest entry of the whole palette; transparent pixels map to 0.
    pub fn nearest_index(&self, pixel: Color, palette: &Palette) -> usize {
        if pixel.is_transparent() {
            return 0;
        }
        nearest_index(pixel, palette.colors(), &self.metric)
    }

    /// Absolute index: global nearest folded into the window, clamped to the palette.
    pub fn force_map_index(&self, pixel: Color, palette: &Palette, window: PaletteWindow) -> usize {
        if pixel.is_transparent() {
            return 0;
        }
        let global = nearest_index(pixel, palette.colors(), &self.metric);
        let forced = global % window.size + window.offset;
        forced.min(palette.len().saturating_sub(1))
    }

    /// Window-local index of the nearest color inside the window.
    pub fn fit_index(&self, pixel: Color, palette: &Palette, window: PaletteWindow) -> usize {
        if pixel.is_transparent() {
            return 0;
        }
        nearest_index(pixel, window.colors(palette), &self.metric)
    }

    /// Scores every full aligned window and returns the offset with the
    /// smallest total error (lowest offset on ties) together with that error.
    pub fn best_fit_offset(
        &self,
        pixels: &[Color],
        palette: &Palette,
        size: usize,
        ctx: &TaskContext,
    ) -> Result<(usize, f64), MatchError> {
        if palette.is_empty() {
            return Err(MatchError::EmptyPalette);
        }
        let size = size.max(1);
        let window_count = (palette.len() / size).max(1);
        let opaque: Vec<Color> = pixels
            .iter()
            .copied()
            .filter(|pixel| !pixel.is_transparent())
            .collect();

        let total_work = window_count * opaque.len();
        let mut checkpoint =
            ctx.checkpoint("Searching best palette window", BEST_FIT_CHECKPOINT_INTERVAL);
        let mut best_offset = 0;
        let mut best_error = f64::INFINITY;

        for window_index in 0..window_count {
            let window = PaletteWindow {
                offset: window_index * size,
                size,
            };
            let candidates = window.colors(palette);
            let mut error = 0.0;
            for (i, &pixel) in opaque.iter().enumerate() {
                error += nearest_with_distance(pixel, candidates, &self.metric).1;
                checkpoint.tick(window_index * opaque.len() + i + 1, total_work)?;
            }
            debug!("Window at offset {} total error {:.2}", window.offset, error);
            if error < best_error {
                best_error = error;
                best_offset = window.offset;
            }
        }

        info!(
            "Best palette window at offset {} (error {:.2})",
            best_offset, best_error
        );
        Ok((best_offset, best_error))
    }

    /// Maps every pixel to a window-local index for `depth`.
    ///
    /// 8 bpp addresses up to 256 entries at once, so every strategy reduces to
    /// a plain nearest search there. For BestFit the chosen offset replaces
    /// `offset` and is reported in the result.
    pub fn match_pixels(
        &self,
        pixels: &[Color],
        palette: &Palette,
        depth: PixelDepth,
        strategy: MatchStrategy,
        offset: usize,
        ctx: &TaskContext,
    ) -> Result<MatchResult, MatchError> {
        if palette.is_empty() {
            error!("Cannot match pixels against an empty palette");
            return Err(MatchError::EmptyPalette);
        }
        ctx.check()?;

        let size = depth.window_size();
        let strategy = if depth == PixelDepth::Bpp8 {
            MatchStrategy::Fit
        } else {
            strategy
        };

        let window = match strategy {
            MatchStrategy::BestFit => {
                let (best, _) = self.best_fit_offset(pixels, palette, size, ctx)?;
                PaletteWindow { offset: best, size }
            }
            _ => PaletteWindow::resolve(palette.len(), offset, size)?,
        };
        debug!(
            "Matching {} pixels with {:?} in window {}..{}",
            pixels.len(),
            strategy,
            window.offset,
            window.offset + window.size
        );

        let mut checkpoint = ctx.checkpoint("Matching pixels", MATCH_CHECKPOINT_INTERVAL);
        let mut indices = Vec::with_capacity(pixels.len());
        let mut total_error = 0.0;

        for (i, &pixel) in pixels.iter().enumerate() {
            let local = match strategy {
                MatchStrategy::ForceMap => {
                    let absolute = self.force_map_index(pixel, palette, window);
                    absolute.saturating_sub(window.offset)
                }
                MatchStrategy::Fit | MatchStrategy::BestFit => {
                    self.fit_index(pixel, palette, window)
                }
            };
            if !pixel.is_transparent() {
                if let Some(color) = palette.get(window.offset + local) {
                    total_error += self.metric.distance(pixel, color);
                }
            }
            indices.push(local as u8);
            checkpoint.tick(i + 1, pixels.len())?;
        }

        ctx.report(100, "Matching complete");
        Ok(MatchResult {
            indices,
            offset: window.offset,
            window_size: window.size,
            total_error,
        })
    }

    pub fn match_bitmap(
        &self,
        bitmap: &SourceBitmap,
        palette: &Palette,
        depth: PixelDepth,
        strategy: MatchStrategy,
        offset: usize,
        ctx: &TaskContext,
    ) -> Result<MatchResult, MatchError> {
        let pixels: Vec<Color> = bitmap.pixels().collect();
        self.match_pixels(&pixels, palette, depth, strategy, offset, ctx)
    }
}
