//! # Demand Math
//!
//! Numeric primitives used by the forecasting and replenishment crates.
//! Everything here is a pure function of a slice of per-period demand values,
//! so callers can run them on any thread without coordination.

use thiserror::Error;

pub mod accuracy;
pub mod moving_averages;
pub mod smoothing;
pub mod statistics;

pub use accuracy::{point_mape, AccuracyMetrics};
pub use moving_averages::{rolling_mean, trailing_mean};
pub use smoothing::{exponential_smoothing, smoothing_path, trend_slope};
pub use statistics::{
    coefficient_of_variation, mean, median, population_std, sample_std, SeriesStats,
};

/// Errors that can occur in demand calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for demand math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Denominators smaller than this are treated as zero.
pub const EPSILON: f64 = 1e-10;
