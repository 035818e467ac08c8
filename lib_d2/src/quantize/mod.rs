pub mod median_cut;
pub mod sample;

use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{Color, Palette, SourceBitmap, WeightedColor};
use crate::constants::{MAX_COLOR_COUNT, MIN_COLOR_COUNT, SIMPLE_SAMPLE_THRESHOLD};
use crate::histogram::ColorHistogram;
use crate::task::{Cancelled, TaskContext};
use median_cut::{median_cut, MedianCutError};
use sample::simple_sample;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum QuantizeError {
    #[error("Target color count must be between 2 and 256, got {0}")]
    InvalidTargetCount(usize),
    #[error("Image has no opaque pixels to quantize")]
    NoOpaquePixels,
    #[error("Quantization was cancelled")]
    Cancelled(#[from] Cancelled),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuantizeMethod {
    #[default]
    MedianCut,
    SimpleSample,
}

/// Reduces weighted colors to a fixed-size palette.
#[derive(Debug, Clone, Copy, Default)]
pub struct Quantizer {
    method: QuantizeMethod,
}

impl Quantizer {
    pub fn new(method: QuantizeMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> QuantizeMethod {
        self.method
    }

    /// Returns exactly `target_count` colors.
    ///
    /// Inputs with no more unique colors than requested come back unchanged,
    /// padded with black. Median cut falls back to uniform sampling for very
    /// large inputs or when it fails internally.
    pub fn reduce(
        &self,
        colors: &[WeightedColor],
        target_count: usize,
        ctx: &TaskContext,
    ) -> Result<Palette, QuantizeError> {
        if !(MIN_COLOR_COUNT..=MAX_COLOR_COUNT).contains(&target_count) {
            error!("Invalid target color count {}", target_count);
            return Err(QuantizeError::InvalidTargetCount(target_count));
        }
        if colors.is_empty() {
            error!("No opaque pixels to quantize");
            return Err(QuantizeError::NoOpaquePixels);
        }
        ctx.check()?;

        info!(
            "Reducing {} colors to {} with {:?}",
            colors.len(),
            target_count,
            self.method
        );

        let mut reduced = if colors.len() <= target_count {
            debug!("Unique colors fit the target, no reduction needed");
            colors.iter().map(|weighted| weighted.color).collect()
        } else if self.method == QuantizeMethod::SimpleSample {
            simple_sample(colors, target_count)
        } else if colors.len() > SIMPLE_SAMPLE_THRESHOLD {
            debug!(
                "{} colors exceed median cut threshold, sampling instead",
                colors.len()
            );
            simple_sample(colors, target_count)
        } else {
            match median_cut(colors, target_count, ctx) {
                Ok(reduced) => reduced,
                Err(MedianCutError::Cancelled(cancelled)) => return Err(cancelled.into()),
                Err(e) => {
                    warn!("Median cut failed ({}), falling back to simple sampling", e);
                    simple_sample(colors, target_count)
                }
            }
        };

        reduced.resize(target_count, Color::BLACK);
        ctx.report(100, "Quantization complete");
        Ok(Palette::from_colors(reduced))
    }

    /// Histogram + reduction in one step.
    pub fn quantize_bitmap(
        &self,
        bitmap: &SourceBitmap,
        target_count: usize,
        ctx: &TaskContext,
    ) -> Result<Palette, QuantizeError> {
        let colors = ColorHistogram::from_bitmap(bitmap);
        self.reduce(&colors, target_count, ctx)
    }
}
