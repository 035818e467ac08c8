use crate::color::{Color, WeightedColor};

/// Uniformly samples `target_count` colors by index, ignoring frequency.
pub fn simple_sample(colors: &[WeightedColor], target_count: usize) -> Vec<Color> {
    let step = colors.len() as f64 / target_count as f64;
    let mut palette: Vec<Color> = (0..target_count)
        .filter_map(|i| colors.get((i as f64 * step).floor() as usize))
        .map(|weighted| weighted.color)
        .collect();
    palette.resize(target_count, Color::BLACK);
    palette
}
