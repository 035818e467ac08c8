use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compression::PixelDepth;
use crate::matcher::{MatchStrategy, Metric};
use crate::quantize::QuantizeMethod;
use crate::texture::{Rotation, TextureFormat};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to serialize texture settings")]
    Serialization(#[from] bincode::Error),
}

/// Per-texture conversion settings, persisted alongside the project.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureSettings {
    pub format: TextureFormat,
    /// Size of a generated palette; `None` means one full window for the format.
    pub color_count: Option<usize>,
    pub quantize_method: QuantizeMethod,
    pub strategy: MatchStrategy,
    pub metric: Metric,
    pub palette_offset: usize,
    pub rle: bool,
    pub embed_palette: bool,
    pub palette_name: Option<String>,
    pub rotation: Rotation,
}

impl Default for TextureSettings {
    fn default() -> Self {
        Self {
            format: TextureFormat::Indexed(PixelDepth::Bpp8),
            color_count: None,
            quantize_method: QuantizeMethod::MedianCut,
            strategy: MatchStrategy::Fit,
            metric: Metric::Euclidean,
            palette_offset: 0,
            rle: false,
            embed_palette: true,
            palette_name: None,
            rotation: Rotation::None,
        }
    }
}

impl TextureSettings {
    pub fn new(format: TextureFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Number of colors to quantize to when no palette is supplied.
    pub fn target_color_count(&self) -> usize {
        match (self.color_count, self.format) {
            (Some(count), _) => count,
            (None, TextureFormat::Indexed(depth)) => depth.window_size(),
            (None, TextureFormat::Direct(_)) => 256,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SettingsError> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SettingsError> {
        Ok(bincode::deserialize(bytes)?)
    }
}
