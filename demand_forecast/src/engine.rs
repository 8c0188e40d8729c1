//! Per-SKU forecasting engine
//!
//! For every SKU with enough history the engine computes:
//! - short, medium and long trailing moving averages and picks the longest usable one
//! - an anomaly-aware exponentially smoothed level
//! - a seasonally adjusted daily estimate and horizon total
//! - an 80/20 backtest, a confidence score and a demand-pattern label
//!
//! SKUs are independent of one another, so the per-SKU work runs on the rayon
//! pool once the SKU count reaches the configured threshold.

use crate::classification::{confidence_score, ConfidenceLabel, DemandPattern};
use crate::config::{ForecastConfig, Granularity};
use crate::data::{CategoryMap, DemandSeries, DemandTable, RawShipment, TimeSeriesAggregator};
use crate::error::{ForecastError, Result};
use crate::seasonality::{SeasonalityModel, SeasonalityTier};
use crate::smoothing::apply_demand_smoothing;
use crate::warnings::{PlanningWarning, WarningKind};
use chrono::NaiveDate;
use demand_math::{mean, trailing_mean, trend_slope, AccuracyMetrics, SeriesStats};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Share of a series used as the training set when backtesting
pub const BACKTEST_TRAIN_FRACTION: f64 = 0.8;

/// One row of the forecast table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub sku: String,
    pub category: String,
    /// Moving-average window that produced the primary estimate, e.g. "MA-90"
    pub forecast_method: String,
    pub avg_daily_demand: f64,
    pub ma_short_daily: f64,
    pub ma_medium_daily: f64,
    pub ma_long_daily: f64,
    /// Raw moving-average estimate
    pub primary_forecast_daily: f64,
    /// Anomaly-aware exponentially smoothed estimate
    pub smoothed_daily: f64,
    pub seasonal_index: f64,
    pub seasonality_tier: SeasonalityTier,
    /// Smoothed estimate scaled by the horizon's seasonal index
    pub seasonal_daily: f64,
    pub forecast_total_qty: f64,
    pub forecast_lower_bound: f64,
    pub forecast_upper_bound: f64,
    pub forecast_horizon_days: u32,
    pub history_periods: usize,
    pub history_days: f64,
    pub total_historical_demand: f64,
    /// Sample standard deviation, per day
    pub demand_std: f64,
    pub demand_cv: f64,
    pub demand_trend_slope: f64,
    pub demand_pattern: String,
    pub confidence_score: u32,
    pub confidence: ConfidenceLabel,
    pub mape: Option<f64>,
    pub mae: Option<f64>,
    pub anomaly_count: usize,
    pub anomaly_pct: f64,
    pub applied_z_threshold: f64,
    pub is_intermittent: bool,
    pub skipped_detection: bool,
    pub last_period: NaiveDate,
    pub snapshot_date: NaiveDate,
}

/// One row of the accuracy table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRecord {
    pub sku: String,
    /// Mean daily demand over the held-out periods
    pub actual_avg_demand: f64,
    /// Short moving average of the training tail, per day
    pub forecast_avg_demand: f64,
    pub mape: f64,
    pub mae: f64,
    pub rmse: f64,
    pub test_periods: usize,
}

/// Backtest one series with an 80/20 chronological split.
///
/// Returns `None` when the series is shorter than the granularity's backtest
/// minimum.
pub fn backtest(sku: &str, values: &[f64], granularity: Granularity) -> Result<Option<AccuracyRecord>> {
    if values.len() < granularity.min_backtest_periods() {
        return Ok(None);
    }

    let split = (values.len() as f64 * BACKTEST_TRAIN_FRACTION) as usize;
    let (train, test) = values.split_at(split);
    let [short_window, _, _] = granularity.ma_windows();
    let days = granularity.days_per_period();

    let forecast = trailing_mean(train, short_window)? / days;
    let actual = mean(test) / days;
    let metrics = AccuracyMetrics::from_point(actual, forecast);

    Ok(Some(AccuracyRecord {
        sku: sku.to_string(),
        actual_avg_demand: actual,
        forecast_avg_demand: forecast,
        mape: metrics.mape,
        mae: metrics.mae,
        rmse: metrics.rmse,
        test_periods: test.len(),
    }))
}

/// What the engine concluded for one SKU
#[derive(Debug, Clone)]
pub enum SkuOutcome {
    Forecast {
        record: Box<ForecastRecord>,
        accuracy: Option<AccuracyRecord>,
        warnings: Vec<PlanningWarning>,
    },
    /// Too little history; omitted from the forecast table
    InsufficientHistory(PlanningWarning),
}

/// Tables produced by a forecasting run
#[derive(Debug, Clone, Default)]
pub struct ForecastOutput {
    /// Sorted by SKU
    pub forecasts: Vec<ForecastRecord>,
    /// Sorted by SKU
    pub accuracy: Vec<AccuracyRecord>,
    pub warnings: Vec<PlanningWarning>,
    pub seasonality: SeasonalityModel,
    pub skipped_skus: usize,
}

impl ForecastOutput {
    /// Mean backtest MAPE, `None` when nothing was backtested
    pub fn average_mape(&self) -> Option<f64> {
        if self.accuracy.is_empty() {
            return None;
        }
        Some(self.accuracy.iter().map(|a| a.mape).sum::<f64>() / self.accuracy.len() as f64)
    }

    pub fn total_forecast_demand(&self) -> f64 {
        self.forecasts.iter().map(|f| f.forecast_total_qty).sum()
    }
}

/// Forecasting engine bound to one configuration and one `today`
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
    today: NaiveDate,
}

impl ForecastEngine {
    /// Create an engine; `today` anchors both the history window and the horizon
    pub fn new(config: ForecastConfig, today: NaiveDate) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, today })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Aggregator sharing this engine's granularity, window and `today`
    pub fn aggregator(&self) -> TimeSeriesAggregator {
        TimeSeriesAggregator::new(
            self.config.granularity,
            self.config.history_window_days,
            self.today,
        )
    }

    /// Aggregate raw shipments, then forecast
    pub fn forecast_shipments(
        &self,
        shipments: &[RawShipment],
        categories: &CategoryMap,
    ) -> Result<(DemandTable, ForecastOutput)> {
        let aggregation = self.aggregator().aggregate(shipments)?;
        let mut output = self.run(&aggregation.table, categories)?;
        output.warnings.extend(aggregation.stats.warnings());
        output.warnings.sort();
        Ok((aggregation.table, output))
    }

    /// Forecast every SKU in `table`
    pub fn run(&self, table: &DemandTable, categories: &CategoryMap) -> Result<ForecastOutput> {
        self.run_with_cancel(table, categories, &AtomicBool::new(false))
    }

    /// Forecast every SKU, stopping with [`ForecastError::Cancelled`] once
    /// `cancel` is raised. Partial results are never returned.
    pub fn run_with_cancel(
        &self,
        table: &DemandTable,
        categories: &CategoryMap,
        cancel: &AtomicBool,
    ) -> Result<ForecastOutput> {
        if table.is_empty() {
            return Err(ForecastError::MissingInput(
                "demand table has no SKUs".to_string(),
            ));
        }

        let seasonality = SeasonalityModel::build(table, categories, &self.config.seasonality);
        let series: Vec<&DemandSeries> = table.iter().collect();

        let task = |series: &&DemandSeries| -> Result<SkuOutcome> {
            if cancel.load(Ordering::Relaxed) {
                return Err(ForecastError::Cancelled);
            }
            self.forecast_sku(series, &seasonality)
        };

        let outcomes: Vec<SkuOutcome> = if series.len() >= self.config.parallel_threshold {
            tracing::debug!(skus = series.len(), "forecasting on the rayon pool");
            series.par_iter().map(task).collect::<Result<_>>()?
        } else {
            series.iter().map(task).collect::<Result<_>>()?
        };

        if cancel.load(Ordering::Relaxed) {
            return Err(ForecastError::Cancelled);
        }

        let mut output = ForecastOutput {
            seasonality,
            ..ForecastOutput::default()
        };
        for outcome in outcomes {
            match outcome {
                SkuOutcome::Forecast {
                    record,
                    accuracy,
                    warnings,
                } => {
                    output.forecasts.push(*record);
                    output.accuracy.extend(accuracy);
                    output.warnings.extend(warnings);
                }
                SkuOutcome::InsufficientHistory(warning) => {
                    output.skipped_skus += 1;
                    output.warnings.push(warning);
                }
            }
        }

        if categories.is_empty() {
            output.warnings.push(PlanningWarning::global(
                WarningKind::MissingCategory,
                "No category map supplied; every SKU is Uncategorized",
            ));
        } else {
            output.warnings.extend(
                categories.missing_warnings(output.forecasts.iter().map(|f| f.sku.as_str())),
            );
        }

        output.forecasts.sort_by(|a, b| a.sku.cmp(&b.sku));
        output.accuracy.sort_by(|a, b| a.sku.cmp(&b.sku));
        output.warnings.sort();

        match output.average_mape() {
            Some(avg_mape) => tracing::info!(
                forecasted = output.forecasts.len(),
                skipped = output.skipped_skus,
                backtested = output.accuracy.len(),
                avg_mape,
                total_demand = output.total_forecast_demand(),
                "generated forecasts"
            ),
            None => tracing::info!(
                forecasted = output.forecasts.len(),
                skipped = output.skipped_skus,
                total_demand = output.total_forecast_demand(),
                "generated forecasts; insufficient data for backtesting"
            ),
        }

        Ok(output)
    }

    /// Forecast a single SKU against an already built seasonality model
    pub fn forecast_sku(
        &self,
        series: &DemandSeries,
        seasonality: &SeasonalityModel,
    ) -> Result<SkuOutcome> {
        let granularity = self.config.granularity;
        let values = series.values();
        let n = values.len();
        let min_periods = granularity.min_periods();

        if n < min_periods {
            tracing::debug!(sku = series.sku(), periods = n, "insufficient history");
            return Ok(SkuOutcome::InsufficientHistory(PlanningWarning::for_sku(
                series.sku(),
                WarningKind::InsufficientHistory,
                format!("Insufficient history: {n} {granularity} periods, need {min_periods}"),
            )));
        }
        let Some(last_period) = series.last_period() else {
            return Err(ForecastError::DataError(format!(
                "series for {} has values but no periods",
                series.sku()
            )));
        };

        let days = granularity.days_per_period();
        let horizon = f64::from(self.config.horizon_days);

        let [short, medium, long] = granularity.ma_windows();
        let ma_short = trailing_mean(values, short)? / days;
        let ma_medium = trailing_mean(values, medium)? / days;
        let ma_long = trailing_mean(values, long)? / days;
        let (window, primary) = if n >= long {
            (long, ma_long)
        } else if n >= medium {
            (medium, ma_medium)
        } else {
            (short, ma_short)
        };

        let stats = SeriesStats::from_values(values);
        let slope = trend_slope(values);
        let pattern = DemandPattern::classify(stats.cv, slope);
        let demand_std = stats.std / days;

        let smoothing = apply_demand_smoothing(
            values,
            self.config.preset,
            self.config.replacement,
            &self.config.anomaly,
        )?;
        let smoothed_daily = smoothing.smoothed_forecast / days;

        let seasonal_index =
            seasonality.horizon_index(series.sku(), self.today, self.config.horizon_days);
        let seasonal_daily = smoothed_daily * seasonal_index;

        let accuracy = backtest(series.sku(), values, granularity)?;
        let mape = accuracy.as_ref().map(|a| a.mape);
        let history_days = n as f64 * days;
        let score = confidence_score(stats.cv, history_days, mape);

        let warnings = smoothing
            .anomaly
            .warnings
            .iter()
            .map(|w| PlanningWarning::for_sku(series.sku(), w.kind, w.message.clone()))
            .collect();

        let record = ForecastRecord {
            sku: series.sku().to_string(),
            category: seasonality
                .category(series.sku())
                .unwrap_or(crate::data::UNCATEGORIZED)
                .to_string(),
            forecast_method: format!("MA-{window}"),
            avg_daily_demand: stats.mean / days,
            ma_short_daily: ma_short,
            ma_medium_daily: ma_medium,
            ma_long_daily: ma_long,
            primary_forecast_daily: primary,
            smoothed_daily,
            seasonal_index,
            seasonality_tier: seasonality
                .tier(series.sku())
                .unwrap_or(SeasonalityTier::Category),
            seasonal_daily,
            forecast_total_qty: seasonal_daily * horizon,
            forecast_lower_bound: ((seasonal_daily - demand_std) * horizon).max(0.0),
            forecast_upper_bound: (seasonal_daily + demand_std) * horizon,
            forecast_horizon_days: self.config.horizon_days,
            history_periods: n,
            history_days,
            total_historical_demand: stats.total,
            demand_std,
            demand_cv: stats.cv,
            demand_trend_slope: slope,
            demand_pattern: pattern.to_string(),
            confidence_score: score,
            confidence: ConfidenceLabel::from_score(score),
            mape,
            mae: accuracy.as_ref().map(|a| a.mae),
            anomaly_count: smoothing.anomaly.anomaly_count,
            anomaly_pct: smoothing.anomaly.anomaly_pct,
            applied_z_threshold: smoothing.anomaly.applied_z_threshold,
            is_intermittent: smoothing.anomaly.is_intermittent,
            skipped_detection: smoothing.anomaly.skipped_detection,
            last_period,
            snapshot_date: self.today,
        };

        Ok(SkuOutcome::Forecast {
            record: Box::new(record),
            accuracy,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use chrono::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn daily_series(sku: &str, values: &[f64]) -> DemandSeries {
        let start = today() - Duration::days(values.len() as i64);
        DemandSeries::from_points(
            sku,
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (start + Duration::days(i as i64), v)),
        )
    }

    #[test]
    fn test_backtest_split() {
        let mut values = vec![10.0; 48];
        values.extend(vec![20.0; 12]);
        let record = backtest("A", &values, Granularity::Daily).unwrap().unwrap();

        assert_eq!(record.test_periods, 12);
        assert_approx_eq!(record.forecast_avg_demand, 10.0);
        assert_approx_eq!(record.actual_avg_demand, 20.0);
        assert_approx_eq!(record.mape, 50.0);
        assert_approx_eq!(record.mae, 10.0);

        assert!(backtest("A", &values[..59], Granularity::Daily)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_short_history_is_omitted() {
        let engine = ForecastEngine::new(ForecastConfig::default(), today()).unwrap();
        let table = DemandTable::from_series(vec![
            daily_series("LONG", &[5.0; 40]),
            daily_series("SHORT", &[5.0; 10]),
        ]);
        let output = engine.run(&table, &CategoryMap::default()).unwrap();

        assert_eq!(output.forecasts.len(), 1);
        assert_eq!(output.forecasts[0].sku, "LONG");
        assert_eq!(output.skipped_skus, 1);
        assert!(output
            .warnings
            .iter()
            .any(|w| w.kind == WarningKind::InsufficientHistory
                && w.sku.as_deref() == Some("SHORT")));
    }

    #[test]
    fn test_method_degrades_with_history() {
        let engine = ForecastEngine::new(ForecastConfig::default(), today()).unwrap();
        let table = DemandTable::from_series(vec![
            daily_series("A", &[5.0; 95]),
            daily_series("B", &[5.0; 65]),
            daily_series("C", &[5.0; 35]),
        ]);
        let output = engine.run(&table, &CategoryMap::default()).unwrap();
        let methods: Vec<&str> = output
            .forecasts
            .iter()
            .map(|f| f.forecast_method.as_str())
            .collect();
        assert_eq!(methods, vec!["MA-90", "MA-60", "MA-30"]);
    }

    #[test]
    fn test_uniform_forecast() {
        let engine = ForecastEngine::new(ForecastConfig::default(), today()).unwrap();
        let table = DemandTable::from_series(vec![daily_series("A", &[10.0; 40])]);
        let output = engine.run(&table, &CategoryMap::default()).unwrap();
        let record = &output.forecasts[0];

        assert_approx_eq!(record.primary_forecast_daily, 10.0);
        assert_approx_eq!(record.smoothed_daily, 10.0);
        assert_eq!(record.anomaly_count, 0);
        assert_eq!(record.demand_pattern, "Stable & Flat");
        assert_eq!(record.forecast_horizon_days, 90);
        assert_approx_eq!(record.forecast_total_qty, record.seasonal_daily * 90.0);
        // 40 days of history, no backtest
        assert_eq!(record.mape, None);
        assert_eq!(record.confidence_score, 70);
        assert_eq!(record.confidence, ConfidenceLabel::High);
    }

    #[test]
    fn test_cancelled_run_discards_results() {
        let engine = ForecastEngine::new(ForecastConfig::default(), today()).unwrap();
        let table = DemandTable::from_series(vec![daily_series("A", &[10.0; 40])]);
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            engine.run_with_cancel(&table, &CategoryMap::default(), &cancel),
            Err(ForecastError::Cancelled)
        ));
    }

    #[test]
    fn test_empty_table_is_missing_input() {
        let engine = ForecastEngine::new(ForecastConfig::default(), today()).unwrap();
        assert!(matches!(
            engine.run(&DemandTable::default(), &CategoryMap::default()),
            Err(ForecastError::MissingInput(_))
        ));
    }
}
