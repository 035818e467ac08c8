use log::debug;
use thiserror::Error;

use crate::color::{Color, WeightedColor};
use crate::constants::{
    MEDIAN_CUT_CHECKPOINT_INTERVAL, MEDIAN_CUT_MAX_ITERATIONS, MEDIAN_CUT_MIN_SCORE,
};
use crate::task::{Cancelled, TaskContext};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MedianCutError {
    #[error("Bucket #{0} has zero total weight")]
    ZeroWeightBucket(usize),
    #[error("Median cut was cancelled")]
    Cancelled(#[from] Cancelled),
}

/// A group of colors that will collapse into one palette entry.
#[derive(Debug, Clone)]
struct Bucket {
    colors: Vec<WeightedColor>,
}

impl Bucket {
    fn new(colors: Vec<WeightedColor>) -> Self {
        Self { colors }
    }

    /// Per-channel (max - min) over R, G, B.
    fn ranges(&self) -> [u8; 3] {
        let mut min = [u8::MAX; 3];
        let mut max = [u8::MIN; 3];
        for weighted in &self.colors {
            for channel in 0..3 {
                let value = weighted.color.channel(channel);
                min[channel] = min[channel].min(value);
                max[channel] = max[channel].max(value);
            }
        }
        [max[0] - min[0], max[1] - min[1], max[2] - min[2]]
    }

    /// Widest channel and its split score, `None` for single-color buckets.
    fn split_candidate(&self) -> Option<(usize, f64)> {
        if self.colors.len() <= 1 {
            return None;
        }
        let ranges = self.ranges();
        let mut channel = 0;
        for candidate in 1..3 {
            if ranges[candidate] > ranges[channel] {
                channel = candidate;
            }
        }
        let size = self.colors.len() as f64;
        Some((channel, ranges[channel] as f64 * (size + 1.0).ln()))
    }

    /// Sorts on `channel` and moves the upper half into a new bucket.
    fn split(&mut self, channel: usize) -> Bucket {
        self.colors.sort_by_key(|weighted| weighted.color.channel(channel));
        let mid = self.colors.len() / 2;
        Bucket::new(self.colors.split_off(mid))
    }

    /// Count-weighted mean color, `None` when every count is zero.
    fn average(&self) -> Option<Color> {
        let mut sums = [0u64; 3];
        let mut total = 0u64;
        for weighted in &self.colors {
            let weight = weighted.count as u64;
            sums[0] += weighted.color.r as u64 * weight;
            sums[1] += weighted.color.g as u64 * weight;
            sums[2] += weighted.color.b as u64 * weight;
            total += weight;
        }
        if total == 0 {
            return None;
        }
        let mean = |sum: u64| (sum as f64 / total as f64).round() as u8;
        Some(Color::rgb(mean(sums[0]), mean(sums[1]), mean(sums[2])))
    }
}

/// Recursively splits the most varied bucket until `target_count` buckets exist.
///
/// The returned list holds exactly `target_count` colors: missing entries are
/// cyclic copies of the ones found, extra entries are dropped.
pub fn median_cut(
    colors: &[WeightedColor],
    target_count: usize,
    ctx: &TaskContext,
) -> Result<Vec<Color>, MedianCutError> {
    let mut buckets = vec![Bucket::new(colors.to_vec())];
    let max_iterations = (target_count * 3).min(MEDIAN_CUT_MAX_ITERATIONS);
    let mut checkpoint = ctx.checkpoint("Quantizing colors", MEDIAN_CUT_CHECKPOINT_INTERVAL);

    for iteration in 0..max_iterations {
        if buckets.len() >= target_count {
            break;
        }

        let mut best: Option<(usize, usize, f64)> = None;
        for (slot, bucket) in buckets.iter().enumerate() {
            if let Some((channel, score)) = bucket.split_candidate() {
                if best.map_or(true, |(_, _, best_score)| score > best_score) {
                    best = Some((slot, channel, score));
                }
            }
        }

        let Some((slot, channel, score)) = best else {
            debug!("No splittable bucket left after {} iterations", iteration);
            break;
        };
        if score < MEDIAN_CUT_MIN_SCORE {
            debug!("Best split score {:.3} below threshold, stopping", score);
            break;
        }

        let upper = buckets[slot].split(channel);
        buckets.push(upper);
        checkpoint.tick(buckets.len(), target_count)?;
    }

    let mut palette = Vec::with_capacity(target_count);
    for (slot, bucket) in buckets.iter().enumerate() {
        palette.push(bucket.average().ok_or(MedianCutError::ZeroWeightBucket(slot))?);
    }
    debug!("Median cut produced {} buckets", palette.len());

    let found = palette.len();
    for i in 0..target_count.saturating_sub(found) {
        palette.push(palette[i % found]);
    }
    palette.truncate(target_count);

    Ok(palette)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weighted(r: u8, g: u8, b: u8, count: u32) -> WeightedColor {
        WeightedColor::new(Color::rgb(r, g, b), count)
    }

    #[test]
    fn test_median_cut_splits_widest_channel() {
        let colors = vec![
            weighted(200, 0, 0, 1),
            weighted(0, 0, 0, 1),
            weighted(210, 0, 0, 1),
            weighted(10, 0, 0, 1),
        ];
        let palette = median_cut(&colors, 2, &TaskContext::new()).unwrap();
        assert_eq!(palette, vec![Color::rgb(5, 0, 0), Color::rgb(205, 0, 0)]);
    }

    #[test]
    fn test_median_cut_weights_average() {
        let colors = vec![
            weighted(0, 0, 0, 3),
            weighted(100, 0, 0, 1),
            weighted(240, 0, 0, 1),
            weighted(250, 0, 0, 1),
        ];
        let palette = median_cut(&colors, 2, &TaskContext::new()).unwrap();
        assert_eq!(palette[0], Color::rgb(25, 0, 0));
        assert_eq!(palette[1], Color::rgb(245, 0, 0));
    }

    #[test]
    fn test_median_cut_duplicates_when_unsplittable() {
        // Identical RGB in every entry: score is zero, so no split happens.
        let colors = vec![weighted(7, 7, 7, 1), weighted(7, 7, 7, 2)];
        let palette = median_cut(&colors, 4, &TaskContext::new()).unwrap();
        assert_eq!(palette, vec![Color::rgb(7, 7, 7); 4]);
    }

    #[test]
    fn test_median_cut_zero_weight_fails() {
        let colors = vec![weighted(0, 0, 0, 0), weighted(255, 0, 0, 0)];
        assert!(matches!(
            median_cut(&colors, 2, &TaskContext::new()),
            Err(MedianCutError::ZeroWeightBucket(0))
        ));
    }

    #[test]
    fn test_median_cut_cancelled() {
        let ctx = TaskContext::new();
        ctx.token().cancel();
        let colors: Vec<WeightedColor> = (0..=255).map(|v| weighted(v, 0, 255 - v, 1)).collect();
        assert_eq!(
            median_cut(&colors, 64, &ctx),
            Err(MedianCutError::Cancelled(Cancelled))
        );
    }
}
