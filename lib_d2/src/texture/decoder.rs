use log::{debug, error, info, warn};
use thiserror::Error;

use super::format::{
    D2Texture, Rotation, TextureFormat, FLAG_PALETTE, FLAG_PALETTE_NAME, FLAG_RLE,
    RESERVED_MASK, ROTATION_MASK, ROTATION_SHIFT,
};
use crate::color::{Color, Palette};
use crate::compression::{rle_decompression, unpack_direct, unpack_indices, PackError};
use crate::constants::MAGIC_HEADER;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid format or header")]
    InvalidHeader,
    #[error("Unsupported format tag {0}")]
    UnsupportedFormat(u8),
    #[error("Unexpected end of data while reading the palette name")]
    UnexpectedEofPaletteName,
    #[error("Palette name is not valid UTF-8")]
    InvalidPaletteName,
    #[error("Unexpected end of data while reading palette color #{0}")]
    UnexpectedEofPaletteColor(usize),
    #[error("Format {0} cannot carry an embedded palette")]
    PaletteOnDirectFormat(TextureFormat),
    #[error("Payload too short: expected {expected} bytes, got {actual}")]
    PayloadTruncated { expected: usize, actual: usize },
    #[error("Indexed texture has no palette to expand with")]
    MissingPalette,
    #[error("Invalid palette index: {0} exceeds palette size of {1}")]
    InvalidPaletteIndex(usize, usize),
    #[error("Pixel unpacking failed")]
    UnpackFailed(#[from] PackError),
}

pub fn decode(encoded_data: &[u8]) -> Result<D2Texture, DecodeError> {
    info!("Starting D2 decoding: {} bytes", encoded_data.len());

    // Check the header and magic number
    if encoded_data.len() < D2Texture::HEADER_SIZE || !encoded_data.starts_with(&MAGIC_HEADER) {
        error!("Invalid format or missing magic number in header");
        return Err(DecodeError::InvalidHeader);
    }
    debug!("Magic number validated successfully");
    let mut cursor = D2Texture::MAGIC_SIZE;

    let tag = encoded_data[cursor];
    let format = TextureFormat::from_tag(tag).ok_or_else(|| {
        error!("Unsupported format tag {}", tag);
        DecodeError::UnsupportedFormat(tag)
    })?;
    cursor += D2Texture::FORMAT_TAG_SIZE;

    let width = u16::from_le_bytes([encoded_data[cursor], encoded_data[cursor + 1]]);
    cursor += D2Texture::WIDTH_HEIGHT_SIZE;
    let height = u16::from_le_bytes([encoded_data[cursor], encoded_data[cursor + 1]]);
    cursor += D2Texture::WIDTH_HEIGHT_SIZE;

    let flags = encoded_data[cursor];
    cursor += D2Texture::FLAGS_SIZE;
    if flags & RESERVED_MASK != 0 {
        warn!("Reserved flag bits set: {:#010b}", flags);
    }
    let rotation = Rotation::from_quarter_turns((flags & ROTATION_MASK) >> ROTATION_SHIFT);
    debug!(
        "Header read: format={} width={} height={} flags={:#010b}",
        format, width, height, flags
    );

    // Palette name
    let mut palette_name = None;
    if flags & FLAG_PALETTE_NAME != 0 {
        let Some(&len) = encoded_data.get(cursor) else {
            error!("Unexpected end of data while reading palette name length");
            return Err(DecodeError::UnexpectedEofPaletteName);
        };
        cursor += 1;
        let end = cursor + len as usize;
        let bytes = encoded_data.get(cursor..end).ok_or_else(|| {
            error!("Unexpected end of data while reading palette name");
            DecodeError::UnexpectedEofPaletteName
        })?;
        let name = std::str::from_utf8(bytes).map_err(|_| {
            error!("Palette name is not valid UTF-8");
            DecodeError::InvalidPaletteName
        })?;
        debug!("Palette name: {}", name);
        palette_name = Some(name.to_owned());
        cursor = end;
    }

    // Embedded palette
    let mut palette = None;
    if flags & FLAG_PALETTE != 0 {
        let Some(entries) = format.palette_entries() else {
            error!("Embedded palette flagged on direct format {}", format);
            return Err(DecodeError::PaletteOnDirectFormat(format));
        };
        let mut colors = Vec::with_capacity(entries);
        for i in 0..entries {
            let Some(bytes) = encoded_data.get(cursor..cursor + 4) else {
                error!("Unexpected end of data while reading palette color #{}", i);
                return Err(DecodeError::UnexpectedEofPaletteColor(i));
            };
            colors.push(Color::new(bytes[0], bytes[1], bytes[2], bytes[3]));
            cursor += 4;
        }
        debug!("Read {} palette colors", entries);
        palette = Some(Palette::from_colors(colors));
    }

    // The remaining data is the pixel payload
    let rle = flags & FLAG_RLE != 0;
    let mut payload = if rle {
        rle_decompression(&encoded_data[cursor..])
    } else {
        encoded_data[cursor..].to_vec()
    };
    debug!("Payload length: {} (rle={})", payload.len(), rle);

    let expected = format.payload_len(width as usize * height as usize);
    if payload.len() < expected {
        error!("Payload has {} bytes, {} expected", payload.len(), expected);
        return Err(DecodeError::PayloadTruncated {
            expected,
            actual: payload.len(),
        });
    }
    if payload.len() > expected {
        warn!("Ignoring {} trailing payload bytes", payload.len() - expected);
        payload.truncate(expected);
    }

    info!("Decoding successful");
    Ok(D2Texture {
        magic: MAGIC_HEADER,
        format,
        width,
        height,
        rle,
        rotation,
        palette_name,
        palette,
        payload,
    })
}

impl D2Texture {
    /// Expands the payload to RGBA in stored orientation.
    ///
    /// Indexed pixels resolve through the embedded palette when there is one,
    /// otherwise through `external_palette` starting at `palette_offset`.
    pub fn to_rgba(
        &self,
        external_palette: Option<&Palette>,
        palette_offset: usize,
    ) -> Result<Vec<u8>, DecodeError> {
        let pixel_count = self.pixel_count();
        match self.format {
            TextureFormat::Direct(format) => Ok(unpack_direct(&self.payload, format, pixel_count)?),
            TextureFormat::Indexed(depth) => {
                let (palette, offset) = match (&self.palette, external_palette) {
                    (Some(embedded), _) => (embedded, 0),
                    (None, Some(external)) => (external, palette_offset),
                    (None, None) => {
                        error!("No palette available for indexed texture");
                        return Err(DecodeError::MissingPalette);
                    }
                };
                let indices = unpack_indices(&self.payload, depth, pixel_count)?;
                let mut rgba = Vec::with_capacity(pixel_count * 4);
                for index in indices {
                    let color = offset
                        .checked_add(index as usize)
                        .and_then(|absolute| palette.get(absolute))
                        .ok_or_else(|| {
                            let absolute = offset.saturating_add(index as usize);
                            error!("Palette index {} out of range", absolute);
                            DecodeError::InvalidPaletteIndex(absolute, palette.len())
                        })?;
                    rgba.extend_from_slice(&color.to_rgba());
                }
                Ok(rgba)
            }
        }
    }

    /// Like [`D2Texture::to_rgba`] but undoes the stored rotation.
    /// Returns the buffer with its upright width and height.
    pub fn to_rgba_upright(
        &self,
        external_palette: Option<&Palette>,
        palette_offset: usize,
    ) -> Result<(Vec<u8>, usize, usize), DecodeError> {
        let rgba = self.to_rgba(external_palette, palette_offset)?;
        Ok(self.rotation.inverse().rotate(
            &rgba,
            self.width as usize,
            self.height as usize,
            4,
        ))
    }
}
