use log::{debug, error, info, warn};
use thiserror::Error;

use super::format::{D2Texture, TextureFormat, FLAG_RLE};
use crate::compression::{rle_compression, rle_is_lossless};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Palette name is {0} bytes, the limit is 255")]
    PaletteNameTooLong(usize),
    #[error("Format {0} cannot carry an embedded palette")]
    PaletteOnDirectFormat(TextureFormat),
    #[error("Embedded palette for {format} needs {expected} colors, got {actual}")]
    PaletteSizeMismatch {
        format: TextureFormat,
        expected: usize,
        actual: usize,
    },
    #[error("Payload is {actual} bytes, {expected} expected for the texture dimensions")]
    PayloadSizeMismatch { expected: usize, actual: usize },
}

pub fn encode(texture: &D2Texture) -> Result<Vec<u8>, EncodingError> {
    info!(
        "Starting D2 encoding: {} {}x{}",
        texture.format, texture.width, texture.height
    );

    let expected = texture.format.payload_len(texture.pixel_count());
    if texture.payload.len() != expected {
        error!(
            "Payload length {} does not match expected {}",
            texture.payload.len(),
            expected
        );
        return Err(EncodingError::PayloadSizeMismatch {
            expected,
            actual: texture.payload.len(),
        });
    }

    let mut encoded_data: Vec<u8> = Vec::with_capacity(D2Texture::HEADER_SIZE + expected);

    // Step 1: Fixed header
    let mut flags = texture.flags();
    let compress = texture.rle && rle_is_lossless(&texture.payload);
    if texture.rle && !compress {
        warn!("Payload would not survive RLE decoding, storing it uncompressed");
        flags &= !FLAG_RLE;
    }

    encoded_data.extend_from_slice(&texture.magic); // Magic Number
    encoded_data.push(texture.format.tag()); // Format
    encoded_data.extend_from_slice(&texture.width.to_le_bytes()); // Width
    encoded_data.extend_from_slice(&texture.height.to_le_bytes()); // Height
    encoded_data.push(flags); // Flags
    debug!(
        "Header written:\nFormat: {}\nWidth: {}\nHeight: {}\nFlags: {:#010b}",
        texture.format, texture.width, texture.height, flags
    );

    // Step 2: Palette name
    if let Some(name) = &texture.palette_name {
        if name.len() > D2Texture::MAX_NAME_LEN {
            error!("Palette name of {} bytes exceeds the limit", name.len());
            return Err(EncodingError::PaletteNameTooLong(name.len()));
        }
        encoded_data.push(name.len() as u8);
        encoded_data.extend_from_slice(name.as_bytes());
        debug!("Palette name written: {}", name);
    }

    // Step 3: Embedded palette
    if let Some(palette) = &texture.palette {
        let Some(entries) = texture.format.palette_entries() else {
            error!("Embedded palette given for direct format {}", texture.format);
            return Err(EncodingError::PaletteOnDirectFormat(texture.format));
        };
        if palette.len() != entries {
            error!(
                "Embedded palette has {} colors, {} expected",
                palette.len(),
                entries
            );
            return Err(EncodingError::PaletteSizeMismatch {
                format: texture.format,
                expected: entries,
                actual: palette.len(),
            });
        }
        encoded_data.extend_from_slice(&palette.to_rgba_bytes());
        debug!("Palette data written with {} colors", entries);
    }

    // Step 4: Payload
    if compress {
        let compressed = rle_compression(&texture.payload);
        debug!(
            "RLE payload: {} -> {} bytes",
            texture.payload.len(),
            compressed.len()
        );
        encoded_data.extend_from_slice(&compressed);
    } else {
        encoded_data.extend_from_slice(&texture.payload);
        debug!("Raw payload written: {} bytes", texture.payload.len());
    }

    info!("Encoding completed: {} bytes", encoded_data.len());
    Ok(encoded_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{Color, Palette};
    use crate::compression::{DirectFormat, PixelDepth};

    #[test]
    fn test_header_layout() {
        let texture = D2Texture::new(
            TextureFormat::Direct(DirectFormat::Rgb565),
            0x0102,
            1,
            vec![0; 0x0102 * 2],
        );
        let encoded = encode(&texture).unwrap();
        assert_eq!(&encoded[..8], &[b'D', b'2', 4, 0x02, 0x01, 0x01, 0x00, 0x00]);
        assert_eq!(encoded.len(), 8 + 0x0102 * 2);
    }

    #[test]
    fn test_palette_name_and_entries() {
        let palette = Palette::from_colors(vec![Color::TRANSPARENT, Color::rgb(255, 0, 0)]);
        let texture = D2Texture::new(TextureFormat::Indexed(PixelDepth::Bpp1), 2, 1, vec![0b10])
            .with_palette(palette)
            .with_palette_name("ab");
        let encoded = encode(&texture).unwrap();
        assert_eq!(encoded[7], 0b0110);
        assert_eq!(&encoded[8..11], &[2, b'a', b'b']);
        assert_eq!(&encoded[11..19], &[0, 0, 0, 0, 255, 0, 0, 255]);
        assert_eq!(&encoded[19..], &[0b10]);
    }

    #[test]
    fn test_rle_payload() {
        let texture = D2Texture::new(TextureFormat::Indexed(PixelDepth::Bpp8), 4, 2, vec![0; 8])
            .with_rle(true);
        let encoded = encode(&texture).unwrap();
        assert_eq!(encoded[7] & FLAG_RLE, FLAG_RLE);
        assert_eq!(&encoded[8..], &[8, 0]);
    }

    #[test]
    fn test_ambiguous_rle_payload_stored_raw() {
        let texture = D2Texture::new(TextureFormat::Indexed(PixelDepth::Bpp8), 2, 1, vec![5, 7])
            .with_rle(true);
        let encoded = encode(&texture).unwrap();
        assert_eq!(encoded[7] & FLAG_RLE, 0);
        assert_eq!(&encoded[8..], &[5, 7]);
    }

    #[test]
    fn test_rejects_palette_on_direct_format() {
        let texture = D2Texture::new(TextureFormat::Direct(DirectFormat::Alpha8), 1, 1, vec![0])
            .with_palette(Palette::from_colors(vec![Color::BLACK; 2]));
        assert_eq!(
            encode(&texture),
            Err(EncodingError::PaletteOnDirectFormat(TextureFormat::Direct(
                DirectFormat::Alpha8
            )))
        );
    }

    #[test]
    fn test_rejects_wrong_palette_size() {
        let texture = D2Texture::new(TextureFormat::Indexed(PixelDepth::Bpp2), 1, 1, vec![0])
            .with_palette(Palette::from_colors(vec![Color::BLACK; 3]));
        assert!(matches!(
            encode(&texture),
            Err(EncodingError::PaletteSizeMismatch {
                expected: 4,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_long_name() {
        let texture = D2Texture::new(TextureFormat::Indexed(PixelDepth::Bpp8), 1, 1, vec![0])
            .with_palette_name("x".repeat(256));
        assert_eq!(encode(&texture), Err(EncodingError::PaletteNameTooLong(256)));
    }

    #[test]
    fn test_rejects_payload_mismatch() {
        let texture = D2Texture::new(TextureFormat::Indexed(PixelDepth::Bpp4), 3, 1, vec![0]);
        assert_eq!(
            encode(&texture),
            Err(EncodingError::PayloadSizeMismatch {
                expected: 2,
                actual: 1
            })
        );
    }
}
