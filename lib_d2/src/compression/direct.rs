use serde::{Deserialize, Serialize};

use super::PackError;
use crate::color::Color;
use crate::constants::OPAQUE_THRESHOLD;

/// Fixed bit-field pixel formats. The first channel in the name occupies the
/// most significant bits; multi-byte values are stored little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DirectFormat {
    Rgb565,
    Argb1555,
    Argb8888,
    Rgb888,
    Argb4444,
    Rgb444,
    Ai44,
    Rgba8888,
    Rgba4444,
    Rgba5551,
    Alpha8,
}

impl DirectFormat {
    pub const ALL: [DirectFormat; 11] = [
        Self::Rgb565,
        Self::Argb1555,
        Self::Argb8888,
        Self::Rgb888,
        Self::Argb4444,
        Self::Rgb444,
        Self::Ai44,
        Self::Rgba8888,
        Self::Rgba4444,
        Self::Rgba5551,
        Self::Alpha8,
    ];

    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Ai44 | Self::Alpha8 => 1,
            Self::Rgb565
            | Self::Argb1555
            | Self::Argb4444
            | Self::Rgb444
            | Self::Rgba4444
            | Self::Rgba5551 => 2,
            Self::Rgb888 => 3,
            Self::Argb8888 | Self::Rgba8888 => 4,
        }
    }

    pub const fn has_alpha(self) -> bool {
        !matches!(self, Self::Rgb565 | Self::Rgb888 | Self::Rgb444)
    }

    pub const fn packed_len(self, pixel_count: usize) -> usize {
        pixel_count * self.bytes_per_pixel()
    }

    /// Truncates each channel to its field width.
    pub fn pack_pixel(self, c: Color) -> u32 {
        let (r, g, b, a) = (c.r as u32, c.g as u32, c.b as u32, c.a as u32);
        let a1 = u32::from(c.a >= OPAQUE_THRESHOLD);
        match self {
            Self::Rgb565 => (r >> 3) << 11 | (g >> 2) << 5 | b >> 3,
            Self::Argb1555 => a1 << 15 | (r >> 3) << 10 | (g >> 3) << 5 | b >> 3,
            Self::Argb8888 => a << 24 | r << 16 | g << 8 | b,
            Self::Rgb888 => r << 16 | g << 8 | b,
            Self::Argb4444 => (a >> 4) << 12 | (r >> 4) << 8 | (g >> 4) << 4 | b >> 4,
            Self::Rgb444 => (r >> 4) << 8 | (g >> 4) << 4 | b >> 4,
            Self::Ai44 => (a >> 4) << 4 | intensity(c) >> 4,
            Self::Rgba8888 => r << 24 | g << 16 | b << 8 | a,
            Self::Rgba4444 => (r >> 4) << 12 | (g >> 4) << 8 | (b >> 4) << 4 | a >> 4,
            Self::Rgba5551 => (r >> 3) << 11 | (g >> 3) << 6 | (b >> 3) << 1 | a1,
            Self::Alpha8 => a,
        }
    }

    /// Shifts each field back to 8 bits. Low bits lost while packing stay zero.
    pub fn unpack_pixel(self, v: u32) -> Color {
        let field = |shift: u32, width: u32| ((v >> shift) & ((1 << width) - 1)) as u8;
        let bit_alpha = |bit: u8| if bit != 0 { 255 } else { 0 };
        match self {
            Self::Rgb565 => Color::rgb(field(11, 5) << 3, field(5, 6) << 2, field(0, 5) << 3),
            Self::Argb1555 => Color::new(
                field(10, 5) << 3,
                field(5, 5) << 3,
                field(0, 5) << 3,
                bit_alpha(field(15, 1)),
            ),
            Self::Argb8888 => Color::new(field(16, 8), field(8, 8), field(0, 8), field(24, 8)),
            Self::Rgb888 => Color::rgb(field(16, 8), field(8, 8), field(0, 8)),
            Self::Argb4444 => Color::new(
                field(8, 4) << 4,
                field(4, 4) << 4,
                field(0, 4) << 4,
                field(12, 4) << 4,
            ),
            Self::Rgb444 => Color::rgb(field(8, 4) << 4, field(4, 4) << 4, field(0, 4) << 4),
            Self::Ai44 => {
                let i = field(0, 4) << 4;
                Color::new(i, i, i, field(4, 4) << 4)
            }
            Self::Rgba8888 => Color::new(field(24, 8), field(16, 8), field(8, 8), field(0, 8)),
            Self::Rgba4444 => Color::new(
                field(12, 4) << 4,
                field(8, 4) << 4,
                field(4, 4) << 4,
                field(0, 4) << 4,
            ),
            Self::Rgba5551 => Color::new(
                field(11, 5) << 3,
                field(6, 5) << 3,
                field(1, 5) << 3,
                bit_alpha(field(0, 1)),
            ),
            Self::Alpha8 => Color::new(255, 255, 255, field(0, 8)),
        }
    }
}

fn intensity(c: Color) -> u32 {
    (299 * c.r as u32 + 587 * c.g as u32 + 114 * c.b as u32) / 1000
}

pub fn pack_direct(pixels: impl IntoIterator<Item = Color>, format: DirectFormat) -> Vec<u8> {
    let width = format.bytes_per_pixel();
    let mut packed = Vec::new();
    for pixel in pixels {
        let value = format.pack_pixel(pixel).to_le_bytes();
        packed.extend_from_slice(&value[..width]);
    }
    packed
}

/// Expands `pixel_count` packed pixels to an RGBA byte buffer.
pub fn unpack_direct(
    packed: &[u8],
    format: DirectFormat,
    pixel_count: usize,
) -> Result<Vec<u8>, PackError> {
    let expected = format.packed_len(pixel_count);
    if packed.len() < expected {
        return Err(PackError::Truncated {
            expected,
            actual: packed.len(),
        });
    }

    let width = format.bytes_per_pixel();
    let mut rgba = Vec::with_capacity(pixel_count * 4);
    for chunk in packed[..expected].chunks_exact(width) {
        let mut word = [0u8; 4];
        word[..width].copy_from_slice(chunk);
        let color = format.unpack_pixel(u32::from_le_bytes(word));
        rgba.extend_from_slice(&color.to_rgba());
    }
    Ok(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_colors() -> Vec<Color> {
        (0..64u32)
            .map(|i| {
                Color::new(
                    (i * 53 % 256) as u8,
                    (i * 97 % 256) as u8,
                    (i * 31 % 256) as u8,
                    (i * 71 % 256) as u8,
                )
            })
            .collect()
    }

    #[test]
    fn test_rgb565_field_layout() {
        let value = DirectFormat::Rgb565.pack_pixel(Color::rgb(0xFF, 0x00, 0x00));
        assert_eq!(value, 0xF800);
        let bytes = pack_direct([Color::rgb(0x00, 0xFF, 0x00)], DirectFormat::Rgb565);
        assert_eq!(bytes, vec![0xE0, 0x07]);
    }

    #[test]
    fn test_rgb565_unpack_truncates() {
        let rgba = unpack_direct(&[0xFF, 0xFF], DirectFormat::Rgb565, 1).unwrap();
        assert_eq!(rgba, vec![0xF8, 0xFC, 0xF8, 0xFF]);
    }

    #[test]
    fn test_argb8888_byte_order() {
        let bytes = pack_direct([Color::new(1, 2, 3, 4)], DirectFormat::Argb8888);
        assert_eq!(bytes, vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_alpha8_expands_to_white() {
        let rgba = unpack_direct(&[0x40], DirectFormat::Alpha8, 1).unwrap();
        assert_eq!(rgba, vec![255, 255, 255, 0x40]);
    }

    #[test]
    fn test_packed_values_round_trip() {
        for format in DirectFormat::ALL {
            let packed = pack_direct(sample_colors(), format);
            assert_eq!(packed.len(), format.packed_len(64));
            let rgba = unpack_direct(&packed, format, 64).unwrap();
            let repacked = pack_direct(
                rgba.chunks_exact(4)
                    .map(|c| Color::new(c[0], c[1], c[2], c[3])),
                format,
            );
            assert_eq!(repacked, packed, "{:?}", format);
        }
    }

    #[test]
    fn test_lossless_formats_preserve_colors() {
        let colors = sample_colors();
        for format in [DirectFormat::Argb8888, DirectFormat::Rgba8888] {
            let rgba = unpack_direct(&pack_direct(colors.clone(), format), format, 64).unwrap();
            let expected: Vec<u8> = colors.iter().flat_map(|c| c.to_rgba()).collect();
            assert_eq!(rgba, expected);
        }
    }

    #[test]
    fn test_unpack_truncated() {
        assert_eq!(
            unpack_direct(&[0; 5], DirectFormat::Rgb888, 2),
            Err(PackError::Truncated {
                expected: 6,
                actual: 5
            })
        );
    }
}
