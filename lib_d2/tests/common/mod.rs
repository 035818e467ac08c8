#![allow(dead_code)]

use lib_d2::color::{Color, Palette, SourceBitmap};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

pub fn rng(seed: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed)
}

/// Opaque noise.
pub fn random_colors(seed: u64, count: usize) -> Vec<Color> {
    let mut rng = rng(seed);
    (0..count)
        .map(|_| Color::rgb(rng.gen(), rng.gen(), rng.gen()))
        .collect()
}

/// Noise where roughly one pixel in four is fully transparent.
pub fn random_colors_with_holes(seed: u64, count: usize) -> Vec<Color> {
    let mut rng = rng(seed);
    (0..count)
        .map(|_| {
            if rng.gen_ratio(1, 4) {
                Color::new(rng.gen(), rng.gen(), rng.gen(), 0)
            } else {
                Color::rgb(rng.gen(), rng.gen(), rng.gen())
            }
        })
        .collect()
}

pub fn random_palette(seed: u64, len: usize) -> Palette {
    Palette::from_colors(random_colors(seed, len))
}

/// Horizontal red ramp, vertical blue ramp.
pub fn gradient(width: u32, height: u32) -> SourceBitmap {
    let mut pixels = Vec::with_capacity((width * height) as usize);
    for y in 0..height {
        for x in 0..width {
            let r = (x * 255 / width.saturating_sub(1).max(1)) as u8;
            let b = (y * 255 / height.saturating_sub(1).max(1)) as u8;
            pixels.push(Color::rgb(r, 0, b));
        }
    }
    SourceBitmap::from_colors(width, height, &pixels).unwrap()
}

pub fn solid(width: u32, height: u32, color: Color) -> SourceBitmap {
    let pixels = vec![color; (width * height) as usize];
    SourceBitmap::from_colors(width, height, &pixels).unwrap()
}

pub fn random_bitmap(seed: u64, width: u32, height: u32) -> SourceBitmap {
    let pixels = random_colors(seed, (width * height) as usize);
    SourceBitmap::from_colors(width, height, &pixels).unwrap()
}

/// Grey ramp of `len` entries from black to white.
pub fn grey_ramp(len: usize) -> Palette {
    Palette::from_colors(
        (0..len)
            .map(|i| {
                let v = (i * 255 / len.saturating_sub(1).max(1)) as u8;
                Color::rgb(v, v, v)
            })
            .collect(),
    )
}
