//! Configuration values for forecasting runs
//!
//! All thresholds live in plain structs that are passed into each component,
//! so tests can build alternate configurations without touching shared state.

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Period length that shipments are bucketed into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One period per calendar day
    #[default]
    Daily,
    /// One period per ISO week, starting Monday
    Weekly,
    /// One period per calendar month
    Monthly,
}

impl Granularity {
    /// Start of the period containing `date`
    pub fn period_start(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Weekly => {
                date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
            }
            Granularity::Monthly => date.with_day(1).unwrap_or(date),
        }
    }

    /// Days represented by one period
    pub fn days_per_period(self) -> f64 {
        match self {
            Granularity::Daily => 1.0,
            Granularity::Weekly => 7.0,
            Granularity::Monthly => 30.0,
        }
    }

    /// Fewest periods a SKU needs before it is forecast
    pub fn min_periods(self) -> usize {
        match self {
            Granularity::Daily => 30,
            Granularity::Weekly => 5,
            Granularity::Monthly => 3,
        }
    }

    /// Short, medium and long moving-average windows
    pub fn ma_windows(self) -> [usize; 3] {
        match self {
            Granularity::Daily => [30, 60, 90],
            Granularity::Weekly => [4, 9, 13],
            Granularity::Monthly => [3, 6, 12],
        }
    }

    /// Fewest periods a SKU needs before it is backtested
    pub fn min_backtest_periods(self) -> usize {
        match self {
            Granularity::Daily => 60,
            Granularity::Weekly => 9,
            Granularity::Monthly => 6,
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Daily => write!(f, "daily"),
            Granularity::Weekly => write!(f, "weekly"),
            Granularity::Monthly => write!(f, "monthly"),
        }
    }
}

impl FromStr for Granularity {
    type Err = ForecastError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" | "d" => Ok(Granularity::Daily),
            "weekly" | "w" => Ok(Granularity::Weekly),
            "monthly" | "m" => Ok(Granularity::Monthly),
            other => Err(ForecastError::InvalidParameter(format!(
                "unsupported granularity `{other}` (expected daily|weekly|monthly)"
            ))),
        }
    }
}

/// Threshold and smoothing factor used by one preset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmoothingConfig {
    /// Z-score above which a point is flagged
    pub z_score_threshold: f64,
    /// Exponential smoothing factor
    pub alpha: f64,
    /// Human-readable summary
    pub description: &'static str,
}

/// Named smoothing presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SmoothingPreset {
    /// Flags more points, smooths the heaviest
    #[serde(alias = "conservative")]
    Conservative,
    /// Default trade-off
    #[default]
    #[serde(alias = "balanced")]
    Balanced,
    /// Flags only extreme points, follows recent demand closely
    #[serde(alias = "aggressive")]
    Aggressive,
}

impl SmoothingPreset {
    /// Every preset, from heaviest to lightest smoothing
    pub const ALL: [SmoothingPreset; 3] = [
        SmoothingPreset::Conservative,
        SmoothingPreset::Balanced,
        SmoothingPreset::Aggressive,
    ];

    /// Parameters for this preset
    pub fn config(self) -> SmoothingConfig {
        match self {
            SmoothingPreset::Conservative => SmoothingConfig {
                z_score_threshold: 1.5,
                alpha: 0.03,
                description: "Heavy smoothing: flags moderate spikes, ~67 period memory",
            },
            SmoothingPreset::Balanced => SmoothingConfig {
                z_score_threshold: 2.0,
                alpha: 0.08,
                description: "Balanced smoothing: flags clear outliers, ~25 period memory",
            },
            SmoothingPreset::Aggressive => SmoothingConfig {
                z_score_threshold: 2.5,
                alpha: 0.15,
                description: "Light smoothing: flags only extreme outliers, ~13 period memory",
            },
        }
    }

    /// Resolve a preset name, falling back to `Balanced` for unknown names
    pub fn from_name_or_default(name: Option<&str>) -> Self {
        match name {
            None => SmoothingPreset::default(),
            Some(name) => name.parse().unwrap_or_else(|_| {
                tracing::warn!(preset = name, "unknown smoothing preset, using Balanced");
                SmoothingPreset::default()
            }),
        }
    }
}

impl fmt::Display for SmoothingPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingPreset::Conservative => write!(f, "Conservative"),
            SmoothingPreset::Balanced => write!(f, "Balanced"),
            SmoothingPreset::Aggressive => write!(f, "Aggressive"),
        }
    }
}

impl FromStr for SmoothingPreset {
    type Err = ForecastError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "conservative" => Ok(SmoothingPreset::Conservative),
            "balanced" => Ok(SmoothingPreset::Balanced),
            "aggressive" => Ok(SmoothingPreset::Aggressive),
            other => Err(ForecastError::InvalidParameter(format!(
                "unsupported smoothing preset `{other}` (expected conservative|balanced|aggressive)"
            ))),
        }
    }
}

/// Guards applied around Z-score anomaly detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyPolicy {
    /// Below this many points detection is skipped
    pub min_sample_size: usize,
    /// CV (percent) above which demand is treated as intermittent
    pub intermittent_cv_threshold: f64,
    /// Z threshold used instead of the preset for intermittent demand
    pub intermittent_z_threshold: f64,
    /// Anomaly percentage above which a data-quality warning is attached
    pub max_anomaly_pct: f64,
}

impl Default for AnomalyPolicy {
    fn default() -> Self {
        Self {
            min_sample_size: 30,
            intermittent_cv_threshold: 150.0,
            intermittent_z_threshold: 4.0,
            max_anomaly_pct: 20.0,
        }
    }
}

/// How flagged points are replaced before smoothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplacementMethod {
    /// Median of all non-flagged points
    #[default]
    Median,
    /// Average of the nearest non-flagged neighbours
    Neighbor,
}

/// Parameters for the two-tier seasonality model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalityConfig {
    /// Share of SKUs, by total volume, eligible for an individual profile
    pub top_volume_fraction: f64,
    /// Distinct months of history an individual profile requires
    pub min_months: usize,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        Self {
            top_volume_fraction: 0.2,
            min_months: 12,
        }
    }
}

/// Complete configuration of a forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub preset: SmoothingPreset,
    pub horizon_days: u32,
    pub granularity: Granularity,
    pub history_window_days: u32,
    pub replacement: ReplacementMethod,
    pub anomaly: AnomalyPolicy,
    pub seasonality: SeasonalityConfig,
    /// SKU count at which per-SKU work moves onto the rayon pool
    pub parallel_threshold: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            preset: SmoothingPreset::Balanced,
            horizon_days: 90,
            granularity: Granularity::Daily,
            history_window_days: 365,
            replacement: ReplacementMethod::Median,
            anomaly: AnomalyPolicy::default(),
            seasonality: SeasonalityConfig::default(),
            parallel_threshold: 64,
        }
    }
}

impl ForecastConfig {
    /// Reject values that would make the run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.horizon_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon_days must be greater than zero".to_string(),
            ));
        }
        if self.history_window_days == 0 {
            return Err(ForecastError::InvalidParameter(
                "history_window_days must be greater than zero".to_string(),
            ));
        }
        let fraction = self.seasonality.top_volume_fraction;
        if !(fraction > 0.0 && fraction <= 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "top_volume_fraction must be in (0, 1], got {fraction}"
            )));
        }
        if self.anomaly.intermittent_z_threshold <= 0.0 {
            return Err(ForecastError::InvalidParameter(
                "intermittent_z_threshold must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
