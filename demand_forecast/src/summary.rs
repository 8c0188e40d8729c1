//! Run-level views over the forecast and accuracy tables

use crate::classification::ConfidenceLabel;
use crate::engine::{AccuracyRecord, ForecastRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// SKU and horizon total, for top-N listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuTotal {
    pub sku: String,
    pub forecast_total_qty: f64,
}

/// Headline numbers of one forecasting run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub total_skus_forecasted: usize,
    pub total_forecast_demand: f64,
    /// Mean MAPE over backtested SKUs
    pub avg_mape: Option<f64>,
    pub confidence_counts: BTreeMap<String, usize>,
    pub demand_patterns: BTreeMap<String, usize>,
    pub top_forecast_skus: Vec<SkuTotal>,
}

impl ForecastSummary {
    /// Summarise `forecasts`; `None` for an empty table
    pub fn from_forecasts(forecasts: &[ForecastRecord], top_n: usize) -> Option<Self> {
        if forecasts.is_empty() {
            return None;
        }

        let mapes: Vec<f64> = forecasts.iter().filter_map(|f| f.mape).collect();
        let avg_mape = (!mapes.is_empty()).then(|| mapes.iter().sum::<f64>() / mapes.len() as f64);

        let mut confidence_counts: BTreeMap<String, usize> = ConfidenceLabel::ALL
            .iter()
            .map(|label| (label.to_string(), 0))
            .collect();
        let mut demand_patterns = BTreeMap::new();
        for forecast in forecasts {
            *confidence_counts
                .entry(forecast.confidence.to_string())
                .or_insert(0) += 1;
            *demand_patterns
                .entry(forecast.demand_pattern.clone())
                .or_insert(0) += 1;
        }

        let mut ranked: Vec<&ForecastRecord> = forecasts.iter().collect();
        ranked.sort_by(|a, b| {
            b.forecast_total_qty
                .total_cmp(&a.forecast_total_qty)
                .then_with(|| a.sku.cmp(&b.sku))
        });
        let top_forecast_skus = ranked
            .into_iter()
            .take(top_n)
            .map(|f| SkuTotal {
                sku: f.sku.clone(),
                forecast_total_qty: f.forecast_total_qty,
            })
            .collect();

        Some(Self {
            total_skus_forecasted: forecasts.len(),
            total_forecast_demand: forecasts.iter().map(|f| f.forecast_total_qty).sum(),
            avg_mape,
            confidence_counts,
            demand_patterns,
            top_forecast_skus,
        })
    }

    pub fn confidence_count(&self, label: ConfidenceLabel) -> usize {
        self.confidence_counts
            .get(&label.to_string())
            .copied()
            .unwrap_or(0)
    }
}

/// Best and worst backtested SKUs by MAPE
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyRankings {
    pub best: Vec<AccuracyRecord>,
    pub worst: Vec<AccuracyRecord>,
}

impl AccuracyRankings {
    pub fn from_accuracy(accuracy: &[AccuracyRecord], top_n: usize) -> Self {
        let mut ranked: Vec<&AccuracyRecord> = accuracy.iter().collect();
        ranked.sort_by(|a, b| a.mape.total_cmp(&b.mape).then_with(|| a.sku.cmp(&b.sku)));

        let best = ranked.iter().take(top_n).map(|&a| a.clone()).collect();
        let worst = ranked.iter().rev().take(top_n).map(|&a| a.clone()).collect();
        Self { best, worst }
    }
}
