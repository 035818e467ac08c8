//! RGBA bitmap -> palette -> packed payload -> D2 bytes, and back for previews.

use log::{debug, error, info};
use thiserror::Error;

use crate::color::{BitmapError, Palette, SourceBitmap};
use crate::compression::{pack_direct, IndexedBuffer, PackError};
use crate::matcher::{DistanceMetric, MatchError, Metric, PaletteMatcher};
use crate::quantize::{QuantizeError, Quantizer};
use crate::settings::TextureSettings;
use crate::task::{Cancelled, TaskContext};
use crate::texture::{self, D2Texture, DecodeError, EncodingError, Rotation, TextureFormat};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No pixel data to convert")]
    NoData,
    #[error("Texture dimensions {width}x{height} exceed the D2 limit of 65535")]
    DimensionsTooLarge { width: u32, height: u32 },
    #[error("Invalid source bitmap")]
    Bitmap(#[from] BitmapError),
    #[error("Quantization failed")]
    Quantize(#[from] QuantizeError),
    #[error("Palette matching failed")]
    Match(#[from] MatchError),
    #[error("Pixel packing failed")]
    Pack(#[from] PackError),
    #[error("D2 encoding failed")]
    Encoding(#[from] EncodingError),
    #[error("D2 decoding failed")]
    Decoding(#[from] DecodeError),
    #[error("Conversion was cancelled")]
    Cancelled(#[from] Cancelled),
}

/// Builds a bitmap from host-decoded RGBA, reporting an empty buffer as [`PipelineError::NoData`].
pub fn bitmap_from_rgba(
    width: u32,
    height: u32,
    rgba: Vec<u8>,
) -> Result<SourceBitmap, PipelineError> {
    match SourceBitmap::new(width, height, rgba) {
        Ok(bitmap) => Ok(bitmap),
        Err(BitmapError::NoData) => {
            error!("Source frame has no pixel data");
            Err(PipelineError::NoData)
        }
        Err(e) => Err(e.into()),
    }
}

/// Result of converting one bitmap into a target format.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedTexture {
    pub format: TextureFormat,
    pub width: u16,
    pub height: u16,
    pub rotation: Rotation,
    /// Palette the indices refer to, `None` for direct formats.
    pub palette: Option<Palette>,
    /// Window offset the indices are relative to (the BestFit winner when searched).
    pub palette_offset: usize,
    pub payload: Vec<u8>,
    pub total_error: f64,
}

impl ConvertedTexture {
    /// Wraps the payload into a D2 container according to `settings`.
    ///
    /// An embedded palette is the window the indices address, padded with
    /// black to the format's entry count.
    pub fn to_d2(&self, settings: &TextureSettings) -> D2Texture {
        let payload = self.payload.clone();
        let mut texture = D2Texture::new(self.format, self.width, self.height, payload)
            .with_rle(settings.rle)
            .with_rotation(self.rotation);

        if settings.embed_palette {
            if let (Some(palette), Some(entries)) = (&self.palette, self.format.palette_entries()) {
                texture = texture.with_palette(palette.window(self.palette_offset, entries));
            }
        }
        if let Some(name) = &settings.palette_name {
            texture = texture.with_palette_name(name.clone());
        }
        texture
    }
}

/// RGBA preview of a D2 file, upright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preview {
    pub width: usize,
    pub height: usize,
    pub rgba: Vec<u8>,
}

/// Drives quantization, matching and packing with the collaborators it was built with.
#[derive(Debug, Clone, Default)]
pub struct TextureConverter<M = Metric> {
    quantizer: Quantizer,
    matcher: PaletteMatcher<M>,
}

impl TextureConverter<Metric> {
    pub fn from_settings(settings: &TextureSettings) -> Self {
        Self::new(
            Quantizer::new(settings.quantize_method),
            PaletteMatcher::new(settings.metric),
        )
    }
}

impl<M: DistanceMetric> TextureConverter<M> {
    pub fn new(quantizer: Quantizer, matcher: PaletteMatcher<M>) -> Self {
        Self { quantizer, matcher }
    }

    pub fn matcher(&self) -> &PaletteMatcher<M> {
        &self.matcher
    }

    pub fn quantize_bitmap(
        &self,
        bitmap: &SourceBitmap,
        target_count: usize,
        ctx: &TaskContext,
    ) -> Result<Palette, PipelineError> {
        ctx.report(0, "Quantizing colors");
        debug!(
            "Quantizing to {} colors with {:?}",
            target_count,
            self.quantizer.method()
        );
        Ok(self.quantizer.quantize_bitmap(bitmap, target_count, ctx)?)
    }

    /// Converts `source` to `settings.format`.
    ///
    /// Indexed formats use `palette` when given, otherwise a palette of
    /// `settings.target_color_count()` colors is quantized from the source.
    pub fn convert(
        &self,
        source: &SourceBitmap,
        settings: &TextureSettings,
        palette: Option<&Palette>,
        ctx: &TaskContext,
    ) -> Result<ConvertedTexture, PipelineError> {
        info!(
            "Converting {}x{} bitmap to {}",
            source.width(),
            source.height(),
            settings.format
        );

        let dimensions = (
            u16::try_from(source.width()),
            u16::try_from(source.height()),
        );
        let (width, height) = match dimensions {
            (Ok(width), Ok(height)) => (width, height),
            _ => {
                error!("Bitmap too large for a D2 texture");
                return Err(PipelineError::DimensionsTooLarge {
                    width: source.width(),
                    height: source.height(),
                });
            }
        };

        let rotated;
        let (bitmap, width, height) = if settings.rotation == Rotation::None {
            (source, width, height)
        } else {
            let (rgba, w, h) = settings.rotation.rotate(
                source.rgba(),
                width as usize,
                height as usize,
                4,
            );
            debug!("Pre-rotated source by {:?}", settings.rotation);
            rotated = SourceBitmap::new(w as u32, h as u32, rgba)?;
            (&rotated, w as u16, h as u16)
        };

        let converted = match settings.format {
            TextureFormat::Direct(format) => {
                ctx.check()?;
                let payload = pack_direct(bitmap.pixels(), format);
                debug!("Packed {} bytes of {:?}", payload.len(), format);
                ConvertedTexture {
                    format: settings.format,
                    width,
                    height,
                    rotation: settings.rotation,
                    palette: None,
                    palette_offset: 0,
                    payload,
                    total_error: 0.0,
                }
            }
            TextureFormat::Indexed(depth) => {
                let palette = match palette {
                    Some(palette) => palette.clone(),
                    None => self.quantize_bitmap(bitmap, settings.target_color_count(), ctx)?,
                };

                ctx.report(0, "Matching pixels");
                let matched = self.matcher.match_bitmap(
                    bitmap,
                    &palette,
                    depth,
                    settings.strategy,
                    settings.palette_offset,
                    ctx,
                )?;
                let buffer = IndexedBuffer::pack(
                    width as u32,
                    height as u32,
                    depth,
                    &matched.indices,
                )?;
                debug!(
                    "Packed {} indices into {} bytes",
                    matched.indices.len(),
                    buffer.data.len()
                );
                ConvertedTexture {
                    format: settings.format,
                    width,
                    height,
                    rotation: settings.rotation,
                    palette: Some(palette),
                    palette_offset: matched.offset,
                    payload: buffer.data,
                    total_error: matched.total_error,
                }
            }
        };

        ctx.report(100, "Conversion complete");
        info!("Conversion complete");
        Ok(converted)
    }

    /// Converts and serializes in one go; the converted texture is returned
    /// alongside so callers can reuse the chosen palette offset.
    pub fn encode_d2(
        &self,
        source: &SourceBitmap,
        settings: &TextureSettings,
        palette: Option<&Palette>,
        ctx: &TaskContext,
    ) -> Result<(Vec<u8>, ConvertedTexture), PipelineError> {
        let converted = self.convert(source, settings, palette, ctx)?;
        let bytes = texture::encode(&converted.to_d2(settings))?;
        Ok((bytes, converted))
    }
}

/// Decodes D2 bytes into an upright RGBA buffer for display.
pub fn preview(
    encoded: &[u8],
    external_palette: Option<&Palette>,
    palette_offset: usize,
) -> Result<Preview, PipelineError> {
    let texture = texture::decode(encoded)?;
    let (rgba, width, height) = texture.to_rgba_upright(external_palette, palette_offset)?;
    Ok(Preview {
        width,
        height,
        rgba,
    })
}
