//! Statistics Calculator Module
//! Descriptive statistics, binning, density estimation and correlation used by figures.

use rayon::prelude::*;
use statrs::distribution::{Continuous, Normal};
use statrs::statistics::Statistics;

/// Tukey box-plot summary of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxSummary {
    pub whisker_low: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_high: f64,
    pub mean: f64,
    pub count: usize,
}

/// One histogram bin, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        sorted
    }

    /// Five-number summary with whiskers at the furthest points within 1.5 IQR.
    pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
        let sorted = Self::sorted(values);
        if sorted.is_empty() {
            return None;
        }

        let q1 = Self::percentile(&sorted, 25.0);
        let median = Self::percentile(&sorted, 50.0);
        let q3 = Self::percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        let whisker_low = sorted
            .iter()
            .copied()
            .find(|&v| v >= q1 - 1.5 * iqr)
            .unwrap_or(q1);
        let whisker_high = sorted
            .iter()
            .rev()
            .copied()
            .find(|&v| v <= q3 + 1.5 * iqr)
            .unwrap_or(q3);

        Some(BoxSummary {
            whisker_low,
            q1,
            median,
            q3,
            whisker_high,
            mean: sorted.iter().mean(),
            count: sorted.len(),
        })
    }

    /// Default bin count: square-root rule, clamped to 1..=50.
    pub fn default_bin_count(n: usize) -> usize {
        ((n as f64).sqrt().ceil() as usize).clamp(1, 50)
    }

    /// Equal-width bins over `[min, max]` of the sample.
    pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
        let sorted = Self::sorted(values);
        let (Some(&min), Some(&max)) = (sorted.first(), sorted.last()) else {
            return Vec::new();
        };
        let bins = bins.max(1);
        Self::histogram_in_range(&sorted, min, max, bins)
    }

    /// Equal-width bins over an explicit range, so several series share edges.
    pub fn histogram_in_range(values: &[f64], min: f64, max: f64, bins: usize) -> Vec<Bin> {
        let bins = bins.max(1);
        let width = if max > min { (max - min) / bins as f64 } else { 1.0 };
        let mut counts = vec![0usize; bins];

        for &v in values.iter().filter(|v| !v.is_nan()) {
            if v < min || v > max {
                continue;
            }
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| Bin {
                start: min + i as f64 * width,
                end: min + (i + 1) as f64 * width,
                count,
            })
            .collect()
    }

    /// Gaussian kernel density estimate sampled at `points` positions.
    /// Bandwidth follows Silverman's rule of thumb.
    pub fn kde(values: &[f64], points: usize) -> Vec<[f64; 2]> {
        let sorted = Self::sorted(values);
        let n = sorted.len();
        if n < 2 || points < 2 {
            return Vec::new();
        }

        let std = sorted.iter().std_dev();
        let iqr = Self::percentile(&sorted, 75.0) - Self::percentile(&sorted, 25.0);
        let spread = if iqr > 0.0 { std.min(iqr / 1.34) } else { std };
        let bandwidth = 0.9 * spread * (n as f64).powf(-0.2);
        if bandwidth.is_nan() || bandwidth <= 0.0 {
            return Vec::new();
        }
        let Ok(kernel) = Normal::new(0.0, 1.0) else {
            return Vec::new();
        };

        let lo = sorted[0] - 3.0 * bandwidth;
        let hi = sorted[n - 1] + 3.0 * bandwidth;
        let step = (hi - lo) / (points - 1) as f64;

        (0..points)
            .map(|i| {
                let x = lo + i as f64 * step;
                let density = sorted
                    .iter()
                    .map(|&v| kernel.pdf((x - v) / bandwidth))
                    .sum::<f64>()
                    / (n as f64 * bandwidth);
                [x, density]
            })
            .collect()
    }

    /// Pearson correlation over rows where both values are present.
    pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> f64 {
        let (xs, ys): (Vec<f64>, Vec<f64>) = a
            .iter()
            .zip(b.iter())
            .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
            .unzip();
        if xs.len() < 2 {
            return f64::NAN;
        }

        let sx = xs.iter().std_dev();
        let sy = ys.iter().std_dev();
        if sx == 0.0 || sy == 0.0 {
            return f64::NAN;
        }
        let cov = xs.iter().covariance(ys.iter());
        (cov / (sx * sy)).clamp(-1.0, 1.0)
    }

    /// Full correlation matrix, rows computed in parallel.
    pub fn correlation_matrix(columns: &[Vec<Option<f64>>]) -> Vec<Vec<f64>> {
        let n = columns.len();
        (0..n)
            .into_par_iter()
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            1.0
                        } else {
                            Self::pearson(&columns[i], &columns[j])
                        }
                    })
                    .collect()
            })
            .collect()
    }
}
