use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::OPAQUE_THRESHOLD;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum BitmapError {
    #[error("No pixel data supplied")]
    NoData,
    #[error("Image dimensions cannot be zero: {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("Pixel buffer length {len} does not match dimensions {width}x{height}")]
    DimensionMismatch { len: usize, width: u32, height: u32 },
}

/// A single RGBA color. Alpha below [`OPAQUE_THRESHOLD`] counts as transparent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    pub const fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    #[inline]
    pub const fn is_transparent(self) -> bool {
        self.a < OPAQUE_THRESHOLD
    }

    /// Channel value by index: 0 = red, 1 = green, 2 = blue.
    #[inline]
    pub fn channel(self, channel: usize) -> u8 {
        match channel {
            0 => self.r,
            1 => self.g,
            _ => self.b,
        }
    }
}

/// A unique color and the number of pixels that carry it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightedColor {
    pub color: Color,
    pub count: u32,
}

impl WeightedColor {
    pub const fn new(color: Color, count: u32) -> Self {
        Self { color, count }
    }
}

/// Ordered list of colors. Index 0 is reserved for transparency by convention.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_colors(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    /// Builds a palette from packed RGBA quadruplets; a trailing partial entry is ignored.
    pub fn from_rgba_bytes(bytes: &[u8]) -> Self {
        let colors = bytes
            .chunks_exact(4)
            .map(|c| Color::new(c[0], c[1], c[2], c[3]))
            .collect();
        Self { colors }
    }

    pub fn to_rgba_bytes(&self) -> Vec<u8> {
        self.colors.iter().flat_map(|c| c.to_rgba()).collect()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<Color> {
        self.colors.get(index).copied()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn push(&mut self, color: Color) {
        self.colors.push(color);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Color> {
        self.colors.iter()
    }

    /// Copies `size` entries starting at `offset`, padding with black past the end.
    pub fn window(&self, offset: usize, size: usize) -> Palette {
        let colors = (0..size)
            .map(|i| {
                offset
                    .checked_add(i)
                    .and_then(|index| self.get(index))
                    .unwrap_or(Color::BLACK)
            })
            .collect();
        Palette { colors }
    }

    pub fn into_colors(self) -> Vec<Color> {
        self.colors
    }
}

impl From<Vec<Color>> for Palette {
    fn from(colors: Vec<Color>) -> Self {
        Self::from_colors(colors)
    }
}

/// Immutable RGBA input image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBitmap {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

impl SourceBitmap {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self, BitmapError> {
        if rgba.is_empty() {
            return Err(BitmapError::NoData);
        }
        if width == 0 || height == 0 {
            return Err(BitmapError::ZeroDimension { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(BitmapError::DimensionMismatch {
                len: rgba.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            rgba,
        })
    }

    pub fn from_colors(width: u32, height: u32, pixels: &[Color]) -> Result<Self, BitmapError> {
        Self::new(
            width,
            height,
            pixels.iter().flat_map(|c| c.to_rgba()).collect(),
        )
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }

    pub fn pixels(&self) -> impl Iterator<Item = Color> + '_ {
        self.rgba
            .chunks_exact(4)
            .map(|c| Color::new(c[0], c[1], c[2], c[3]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transparency_threshold() {
        assert!(Color::new(10, 20, 30, 127).is_transparent());
        assert!(!Color::new(10, 20, 30, 128).is_transparent());
    }

    #[test]
    fn test_bitmap_dimension_mismatch() {
        let result = SourceBitmap::new(2, 2, vec![0; 12]);
        assert_eq!(
            result,
            Err(BitmapError::DimensionMismatch {
                len: 12,
                width: 2,
                height: 2
            })
        );
    }

    #[test]
    fn test_bitmap_no_data() {
        assert_eq!(SourceBitmap::new(4, 4, Vec::new()), Err(BitmapError::NoData));
    }

    #[test]
    fn test_palette_window_pads_with_black() {
        let palette = Palette::from_colors(vec![Color::rgb(1, 2, 3), Color::rgb(4, 5, 6)]);
        let window = palette.window(1, 4);
        assert_eq!(window.len(), 4);
        assert_eq!(window.get(0), Some(Color::rgb(4, 5, 6)));
        assert_eq!(window.get(3), Some(Color::BLACK));

        let past_end = palette.window(usize::MAX - 1, 4);
        assert_eq!(past_end.colors(), &[Color::BLACK; 4]);
    }

    #[test]
    fn test_palette_rgba_bytes() {
        let bytes = [255, 0, 0, 255, 0, 255, 0, 128];
        let palette = Palette::from_rgba_bytes(&bytes);
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.to_rgba_bytes(), bytes);
    }
}
