//! FILENAME: core/pivot-engine/src/stats.rs
//! Boxplot statistics over a group's values.
//!
//! Quartiles use linear interpolation between the two bracketing order
//! statistics (position `p * (n - 1)`). Whiskers sit at the most extreme
//! observed values within 1.5 x IQR of the quartiles, so they never extend
//! past the data. When no observed value lies between a bound and its
//! quartile, the whisker collapses onto the quartile.

use serde::{Deserialize, Serialize};

use records::Scalar;

/// Whisker reach in multiples of the interquartile range.
pub const WHISKER_IQR_FACTOR: f64 = 1.5;

/// Summary of one group's values for one value field. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxplotStats {
    pub count: usize,
    pub mean: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub iqr: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
}

/// The statistics exposed as wide-table columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxplotStat {
    Count,
    Mean,
    Median,
    Q1,
    Q3,
    WhiskerLow,
    WhiskerHigh,
}

impl BoxplotStat {
    pub const ALL: [BoxplotStat; 7] = [
        BoxplotStat::Count,
        BoxplotStat::Mean,
        BoxplotStat::Median,
        BoxplotStat::Q1,
        BoxplotStat::Q3,
        BoxplotStat::WhiskerLow,
        BoxplotStat::WhiskerHigh,
    ];

    /// Column suffix, e.g. `value-whislo`.
    pub fn label(self) -> &'static str {
        match self {
            BoxplotStat::Count => "count",
            BoxplotStat::Mean => "mean",
            BoxplotStat::Median => "med",
            BoxplotStat::Q1 => "q1",
            BoxplotStat::Q3 => "q3",
            BoxplotStat::WhiskerLow => "whislo",
            BoxplotStat::WhiskerHigh => "whishi",
        }
    }
}

impl BoxplotStats {
    /// Computes the summary of `values`; NaN entries are ignored.
    /// Returns `None` when nothing is left.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self::from_sorted(&sorted)
    }

    /// Computes the summary of ascending, NaN-free values.
    pub fn from_sorted(sorted: &[f64]) -> Option<Self> {
        let count = sorted.len();
        if count == 0 {
            return None;
        }

        let mean = compensated_sum(sorted) / count as f64;
        let q1 = quantile_sorted(sorted, 0.25)?;
        let median = quantile_sorted(sorted, 0.5)?;
        let q3 = quantile_sorted(sorted, 0.75)?;
        let iqr = q3 - q1;

        let low_bound = q1 - WHISKER_IQR_FACTOR * iqr;
        let high_bound = q3 + WHISKER_IQR_FACTOR * iqr;

        // Smallest value >= low bound; largest value <= high bound.
        let lo_idx = sorted.partition_point(|&v| v < low_bound);
        let hi_idx = sorted.partition_point(|&v| v <= high_bound);
        let whisker_low = match sorted.get(lo_idx) {
            Some(&v) if v <= q1 => v,
            _ => q1,
        };
        let whisker_high = match hi_idx.checked_sub(1).and_then(|i| sorted.get(i)) {
            Some(&v) if v >= q3 => v,
            _ => q3,
        };

        Some(BoxplotStats {
            count,
            mean,
            q1,
            median,
            q3,
            iqr,
            whisker_low,
            whisker_high,
        })
    }

    pub fn get(&self, stat: BoxplotStat) -> f64 {
        match stat {
            BoxplotStat::Count => self.count as f64,
            BoxplotStat::Mean => self.mean,
            BoxplotStat::Median => self.median,
            BoxplotStat::Q1 => self.q1,
            BoxplotStat::Q3 => self.q3,
            BoxplotStat::WhiskerLow => self.whisker_low,
            BoxplotStat::WhiskerHigh => self.whisker_high,
        }
    }

    /// The statistic as a cell value (the count stays an integer).
    pub fn scalar(&self, stat: BoxplotStat) -> Scalar {
        match stat {
            BoxplotStat::Count => Scalar::Integer(self.count as i64),
            other => Scalar::number(self.get(other)),
        }
    }
}

/// Linear-interpolation quantile of ascending data at probability `p`.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }

    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();

    if j + 1 >= n {
        Some(sorted[n - 1])
    } else if g == 0.0 {
        Some(sorted[j])
    } else {
        Some(sorted[j] + g * (sorted[j + 1] - sorted[j]))
    }
}

/// Neumaier-compensated sum.
fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut c = 0.0_f64;
    for &x in values {
        let t = sum + x;
        if sum.abs() >= x.abs() {
            c += (sum - t) + x;
        } else {
            c += (x - t) + sum;
        }
        sum = t;
    }
    sum + c
}
