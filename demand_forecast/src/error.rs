//! Error types for the demand_forecast crate

use demand_math::MathError;
use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the demand_forecast crate
///
/// Only structural problems are errors. Per-SKU conditions such as short
/// history or a high anomaly rate are reported as [`crate::PlanningWarning`]s.
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A table required by the requested operation is absent or empty
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from mathematical operations
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// The run was cancelled before every SKU was processed
    #[error("Forecast run cancelled; partial results discarded")]
    Cancelled,
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
