use serde::{Deserialize, Serialize};

use crate::color::Color;

/// Distance between two colors over R, G, B. Alpha never participates.
pub trait DistanceMetric {
    fn distance(&self, a: Color, b: Color) -> f64;
}

impl<M: DistanceMetric + ?Sized> DistanceMetric for &M {
    fn distance(&self, a: Color, b: Color) -> f64 {
        (**self).distance(a, b)
    }
}

#[inline]
fn deltas(a: Color, b: Color) -> [f64; 3] {
    [
        a.r as f64 - b.r as f64,
        a.g as f64 - b.g as f64,
        a.b as f64 - b.b as f64,
    ]
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Euclidean;

impl DistanceMetric for Euclidean {
    fn distance(&self, a: Color, b: Color) -> f64 {
        let [dr, dg, db] = deltas(a, b);
        (dr * dr + dg * dg + db * db).sqrt()
    }
}

/// Euclidean distance with luma weights on each channel.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedRgb;

impl DistanceMetric for WeightedRgb {
    fn distance(&self, a: Color, b: Color) -> f64 {
        let [dr, dg, db] = deltas(a, b);
        (0.299 * dr * dr + 0.587 * dg * dg + 0.114 * db * db).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl DistanceMetric for Manhattan {
    fn distance(&self, a: Color, b: Color) -> f64 {
        let [dr, dg, db] = deltas(a, b);
        dr.abs() + dg.abs() + db.abs()
    }
}

/// CIE76 delta E in CIELAB (D65 white point).
#[derive(Debug, Clone, Copy, Default)]
pub struct LabDeltaE;

impl LabDeltaE {
    fn srgb_to_linear(channel: u8) -> f64 {
        let c = channel as f64 / 255.0;
        if c <= 0.04045 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }

    fn lab_f(t: f64) -> f64 {
        const EPSILON: f64 = 216.0 / 24389.0;
        const KAPPA: f64 = 24389.0 / 27.0;
        if t > EPSILON {
            t.cbrt()
        } else {
            (KAPPA * t + 16.0) / 116.0
        }
    }

    pub fn to_lab(color: Color) -> [f64; 3] {
        let r = Self::srgb_to_linear(color.r);
        let g = Self::srgb_to_linear(color.g);
        let b = Self::srgb_to_linear(color.b);

        let x = (0.4124564 * r + 0.3575761 * g + 0.1804375 * b) / 0.95047;
        let y = 0.2126729 * r + 0.7151522 * g + 0.0721750 * b;
        let z = (0.0193339 * r + 0.1191920 * g + 0.9503041 * b) / 1.08883;

        let (fx, fy, fz) = (Self::lab_f(x), Self::lab_f(y), Self::lab_f(z));
        [116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz)]
    }
}

impl DistanceMetric for LabDeltaE {
    fn distance(&self, a: Color, b: Color) -> f64 {
        let la = Self::to_lab(a);
        let lb = Self::to_lab(b);
        let dl = la[0] - lb[0];
        let da = la[1] - lb[1];
        let db = la[2] - lb[2];
        (dl * dl + da * da + db * db).sqrt()
    }
}

/// Runtime-selectable metric, used where the choice comes from settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    Euclidean,
    WeightedRgb,
    Manhattan,
    LabDeltaE,
}

impl DistanceMetric for Metric {
    fn distance(&self, a: Color, b: Color) -> f64 {
        match self {
            Metric::Euclidean => Euclidean.distance(a, b),
            Metric::WeightedRgb => WeightedRgb.distance(a, b),
            Metric::Manhattan => Manhattan.distance(a, b),
            Metric::LabDeltaE => LabDeltaE.distance(a, b),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_euclidean_ignores_alpha() {
        let a = Color::new(0, 0, 0, 0);
        let b = Color::new(3, 4, 0, 255);
        assert_eq!(Euclidean.distance(a, b), 5.0);
    }

    #[test]
    fn test_manhattan() {
        let a = Color::rgb(10, 20, 30);
        let b = Color::rgb(0, 25, 27);
        assert_eq!(Manhattan.distance(a, b), 18.0);
    }

    #[test]
    fn test_lab_white_and_black() {
        let white = LabDeltaE::to_lab(Color::rgb(255, 255, 255));
        assert!((white[0] - 100.0).abs() < 0.01);
        assert!(white[1].abs() < 0.01 && white[2].abs() < 0.01);

        let black = LabDeltaE::to_lab(Color::BLACK);
        assert!(black[0].abs() < 0.01);
        assert!((LabDeltaE.distance(Color::BLACK, Color::rgb(255, 255, 255)) - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_metric_dispatch() {
        let a = Color::rgb(0, 0, 0);
        let b = Color::rgb(0, 10, 0);
        assert_eq!(Metric::Euclidean.distance(a, b), 10.0);
        assert_eq!(Metric::Manhattan.distance(a, b), 10.0);
        assert!(Metric::WeightedRgb.distance(a, b) < 10.0);
    }
}
