use std::collections::HashMap;

use log::debug;

use crate::color::{Color, SourceBitmap, WeightedColor};

pub struct ColorHistogram;

impl ColorHistogram {
    /// Collects every opaque pixel into weighted unique colors.
    ///
    /// Colors are keyed on their RGB triple only (alpha just decides opacity) and
    /// come back in first-seen order with alpha forced to 255. An empty result
    /// means the bitmap has no opaque pixels.
    pub fn from_bitmap(bitmap: &SourceBitmap) -> Vec<WeightedColor> {
        Self::from_pixels(bitmap.pixels())
    }

    pub fn from_pixels(pixels: impl IntoIterator<Item = Color>) -> Vec<WeightedColor> {
        let mut slots: HashMap<[u8; 3], usize> = HashMap::new();
        let mut colors: Vec<WeightedColor> = Vec::new();

        for pixel in pixels {
            if pixel.is_transparent() {
                continue;
            }
            let key = [pixel.r, pixel.g, pixel.b];
            match slots.get(&key) {
                Some(&slot) => colors[slot].count += 1,
                None => {
                    slots.insert(key, colors.len());
                    colors.push(WeightedColor::new(Color::rgb(pixel.r, pixel.g, pixel.b), 1));
                }
            }
        }

        debug!("Histogram built: {} unique opaque colors", colors.len());
        colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_counts_and_order() {
        let pixels = [
            Color::rgb(255, 0, 0),
            Color::rgb(0, 255, 0),
            Color::rgb(255, 0, 0),
            Color::new(255, 0, 0, 200),
        ];
        let histogram = ColorHistogram::from_pixels(pixels);
        assert_eq!(
            histogram,
            vec![
                WeightedColor::new(Color::rgb(255, 0, 0), 3),
                WeightedColor::new(Color::rgb(0, 255, 0), 1),
            ]
        );
    }

    #[test]
    fn test_histogram_skips_transparent() {
        let pixels = [Color::new(1, 2, 3, 0), Color::new(4, 5, 6, 127)];
        assert!(ColorHistogram::from_pixels(pixels).is_empty());
    }

    #[test]
    fn test_histogram_from_bitmap() {
        let bitmap = SourceBitmap::new(2, 1, vec![9, 9, 9, 255, 9, 9, 9, 128]).unwrap();
        let histogram = ColorHistogram::from_bitmap(&bitmap);
        assert_eq!(histogram, vec![WeightedColor::new(Color::rgb(9, 9, 9), 2)]);
    }
}
