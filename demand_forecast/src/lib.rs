//! # Demand Forecast
//!
//! Per-SKU demand forecasting from shipment history.
//!
//! ## Features
//!
//! - Shipment aggregation to daily, weekly or monthly periods, anchored at a single run date
//! - Z-score anomaly detection with sample-size and intermittent-demand guards
//! - Anomaly replacement and exponential smoothing under named presets
//! - Two-tier monthly seasonality (individual profiles for top-volume SKUs, category profiles otherwise)
//! - 30/60/90 day moving averages, 80/20 backtesting and confidence scoring
//! - Snapshot-versus-actual comparison and forecast bias
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chrono::NaiveDate;
//! use demand_forecast::{CategoryMap, DataLoader, ForecastConfig, ForecastEngine};
//!
//! let shipments = DataLoader::from_csv("shipments.csv")?;
//! let today = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
//! let engine = ForecastEngine::new(ForecastConfig::default(), today)?;
//!
//! let (_table, output) = engine.forecast_shipments(&shipments, &CategoryMap::default())?;
//! for forecast in &output.forecasts {
//!     println!("{}: {:.1}/day ({})", forecast.sku, forecast.seasonal_daily, forecast.confidence);
//! }
//! # Ok::<(), demand_forecast::ForecastError>(())
//! ```

pub mod anomaly;
pub mod classification;
pub mod comparison;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod seasonality;
pub mod smoothing;
pub mod summary;
pub mod warnings;

pub use anomaly::{detect_anomalies, AnomalyResult, AnomalyWarning};
pub use classification::{confidence_score, ConfidenceLabel, DemandPattern, Trend, Volatility};
pub use comparison::{
    compare_forecast_vs_actual, BiasDirection, ComparisonRow, ForecastBias, SnapshotRow,
};
pub use config::{
    AnomalyPolicy, ForecastConfig, Granularity, ReplacementMethod, SeasonalityConfig,
    SmoothingConfig, SmoothingPreset,
};
pub use data::{
    normalize_sku, parse_shipment_date, Aggregation, AggregationStats, CategoryMap, CategoryRecord, DataLoader,
    DemandObservation, DemandSeries, DemandTable, RawShipment, TimeSeriesAggregator,
    UNCATEGORIZED,
};
pub use engine::{backtest, AccuracyRecord, ForecastEngine, ForecastOutput, ForecastRecord, SkuOutcome};
pub use error::{ForecastError, Result};
pub use seasonality::{SeasonalProfile, SeasonalityModel, SeasonalityTier};
pub use smoothing::{apply_demand_smoothing, replace_anomalies, SmoothingOutcome};
pub use summary::{AccuracyRankings, ForecastSummary, SkuTotal};
pub use warnings::{PlanningWarning, WarningKind};
