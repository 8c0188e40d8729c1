//! Forecast snapshots against realised shipments
//!
//! Snapshots are earlier forecast tables kept by the caller. Once a snapshot's
//! horizon has fully elapsed, each of its rows is compared with the quantity
//! actually shipped in `(snapshot_date, snapshot_date + horizon]`.

use crate::data::{normalize_sku, parse_shipment_date, RawShipment};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

fn default_horizon() -> u32 {
    90
}

/// The subset of a forecast row needed for comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub snapshot_date: NaiveDate,
    pub sku: String,
    #[serde(default)]
    pub category: Option<String>,
    pub forecast_total_qty: f64,
    #[serde(default)]
    pub forecast_method: Option<String>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default = "default_horizon")]
    pub forecast_horizon_days: u32,
}

/// Forecast against actual for one snapshot row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub snapshot_date: NaiveDate,
    pub sku: String,
    pub category: Option<String>,
    pub forecast_method: Option<String>,
    pub confidence: Option<String>,
    pub forecast_period_days: u32,
    pub forecast_total_qty: f64,
    pub actual_qty: f64,
    /// `actual - forecast`
    pub error: f64,
    pub abs_error: f64,
    pub pct_error: f64,
    pub abs_pct_error: f64,
}

fn pct_error(error: f64, actual: f64, forecast: f64) -> f64 {
    if actual > 0.0 {
        error / actual * 100.0
    } else if forecast > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Compare every elapsed snapshot with the shipments that followed it.
///
/// Snapshots whose horizon ends after `today` are skipped. SKUs without
/// shipments in the window count as zero actual demand.
pub fn compare_forecast_vs_actual(
    snapshots: &[SnapshotRow],
    shipments: &[RawShipment],
    today: NaiveDate,
) -> Vec<ComparisonRow> {
    let mut actual_by_day: HashMap<String, Vec<(NaiveDate, f64)>> = HashMap::new();
    for row in shipments {
        if !(row.quantity.is_finite() && row.quantity > 0.0) {
            continue;
        }
        if let Some(date) = parse_shipment_date(&row.date) {
            actual_by_day
                .entry(normalize_sku(&row.sku))
                .or_default()
                .push((date, row.quantity));
        }
    }

    let mut by_snapshot: BTreeMap<NaiveDate, Vec<&SnapshotRow>> = BTreeMap::new();
    for row in snapshots {
        by_snapshot.entry(row.snapshot_date).or_default().push(row);
    }

    let mut comparisons = Vec::new();
    for (snapshot_date, rows) in by_snapshot {
        let horizon = rows.first().map_or(default_horizon(), |r| r.forecast_horizon_days);
        let end = snapshot_date + Duration::days(i64::from(horizon));
        if end > today {
            tracing::debug!(%snapshot_date, %end, "snapshot horizon not yet elapsed");
            continue;
        }

        for row in rows {
            let actual_qty: f64 = actual_by_day
                .get(&normalize_sku(&row.sku))
                .map(|days| {
                    days.iter()
                        .filter(|(date, _)| *date > snapshot_date && *date <= end)
                        .map(|(_, qty)| qty)
                        .sum()
                })
                .unwrap_or(0.0);
            let error = actual_qty - row.forecast_total_qty;
            let pct = pct_error(error, actual_qty, row.forecast_total_qty);

            comparisons.push(ComparisonRow {
                snapshot_date,
                sku: row.sku.clone(),
                category: row.category.clone(),
                forecast_method: row.forecast_method.clone(),
                confidence: row.confidence.clone(),
                forecast_period_days: horizon,
                forecast_total_qty: row.forecast_total_qty,
                actual_qty,
                error,
                abs_error: error.abs(),
                pct_error: pct,
                abs_pct_error: pct.abs(),
            });
        }
    }

    comparisons
}

/// Whether forecasts ran high or low in aggregate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasDirection {
    OverForecasting,
    UnderForecasting,
    Neutral,
}

impl fmt::Display for BiasDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BiasDirection::OverForecasting => write!(f, "Over-forecasting"),
            BiasDirection::UnderForecasting => write!(f, "Under-forecasting"),
            BiasDirection::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Aggregate bias across comparison rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBias {
    pub total_forecast: f64,
    pub total_actual: f64,
    /// `(forecast - actual) / actual * 100`, 0 without actual demand
    pub bias_pct: f64,
    pub direction: BiasDirection,
    pub avg_error_pct: f64,
    pub avg_abs_error_pct: f64,
    pub num_comparisons: usize,
}

impl ForecastBias {
    pub fn from_comparisons(rows: &[ComparisonRow]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let n = rows.len() as f64;
        let total_forecast: f64 = rows.iter().map(|r| r.forecast_total_qty).sum();
        let total_actual: f64 = rows.iter().map(|r| r.actual_qty).sum();
        let bias_pct = if total_actual > 0.0 {
            (total_forecast - total_actual) / total_actual * 100.0
        } else {
            0.0
        };
        let direction = if bias_pct > 0.0 {
            BiasDirection::OverForecasting
        } else if bias_pct < 0.0 {
            BiasDirection::UnderForecasting
        } else {
            BiasDirection::Neutral
        };

        Some(Self {
            total_forecast,
            total_actual,
            bias_pct,
            direction,
            avg_error_pct: rows.iter().map(|r| r.pct_error).sum::<f64>() / n,
            avg_abs_error_pct: rows.iter().map(|r| r.abs_pct_error).sum::<f64>() / n,
            num_comparisons: rows.len(),
        })
    }
}
