//! Forecast error metrics

use serde::{Deserialize, Serialize};

/// Absolute percentage error of one forecast against one actual value.
///
/// A zero actual scores 100% unless the forecast is also zero.
pub fn point_mape(actual: f64, forecast: f64) -> f64 {
    if actual == 0.0 {
        return if forecast != 0.0 { 100.0 } else { 0.0 };
    }
    ((actual - forecast) / actual).abs() * 100.0
}

/// Forecast accuracy metrics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    /// Mean Absolute Percentage Error
    pub mape: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
}

impl AccuracyMetrics {
    /// Metrics for a single averaged forecast against an averaged actual
    pub fn from_point(actual: f64, forecast: f64) -> Self {
        let error = actual - forecast;
        Self {
            mape: point_mape(actual, forecast),
            mae: error.abs(),
            rmse: (error * error).sqrt(),
        }
    }
}

impl std::fmt::Display for AccuracyMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAPE:  {:.4}%", self.mape)?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        Ok(())
    }
}
