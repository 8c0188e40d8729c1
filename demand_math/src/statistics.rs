//! Dispersion and location statistics for demand series
//!
//! Empty inputs never panic: location statistics return `0.0` (or `None` for
//! the median) and dispersion statistics return `0.0`.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Arithmetic mean, `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().mean()
}

/// Population standard deviation (divides by `n`).
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().population_std_dev()
}

/// Sample standard deviation (divides by `n - 1`), `0.0` below two points.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

/// Median of the values, `None` for an empty slice.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(Data::new(values.to_vec()).median())
}

/// Coefficient of variation in percent (`std / mean * 100`).
///
/// Returns `0.0` when the mean is not positive.
pub fn coefficient_of_variation(mean: f64, std: f64) -> f64 {
    if mean > 0.0 {
        std / mean * 100.0
    } else {
        0.0
    }
}

/// Summary statistics of one demand series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    /// Number of periods
    pub count: usize,
    /// Sum of all periods
    pub total: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Sample standard deviation
    pub std: f64,
    /// Coefficient of variation in percent, computed from the sample std
    pub cv: f64,
}

impl SeriesStats {
    /// Compute the summary for a series
    pub fn from_values(values: &[f64]) -> Self {
        let mean = mean(values);
        let std = sample_std(values);
        Self {
            count: values.len(),
            total: values.iter().sum(),
            mean,
            std,
            cv: coefficient_of_variation(mean, std),
        }
    }
}
