//! One planning run: shipments in, forecasts and a replenishment plan out
//!
//! Every date-relative step (history window, horizon months, snapshot date,
//! elapsed-snapshot checks) reads the single `today` the run was built with.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use demand_forecast::{
    compare_forecast_vs_actual, AccuracyRankings, AggregationStats, CategoryMap, CategoryRecord,
    ComparisonRow, ForecastBias, ForecastEngine, ForecastError, ForecastOutput, ForecastSummary,
    PlanningWarning, RawShipment, SnapshotRow,
};
use replenishment::{
    critical_items, DemandInput, ReplenishmentPlan, ReplenishmentPlanner, ReplenishmentRecord,
    SupplyIndex, SupplyTables, VendorSummary,
};
use serde::Serialize;

use crate::config::PlanningConfig;
use crate::error::Result;

/// Raw tables handed to a run; only `shipments` is required
#[derive(Debug, Clone, Default)]
pub struct PlanningInputs {
    pub shipments: Vec<RawShipment>,
    pub categories: Vec<CategoryRecord>,
    pub supply: SupplyTables,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplenishmentSummary {
    pub skus_evaluated: usize,
    pub skus_to_order: usize,
    pub total_suggested_units: f64,
    pub total_order_value: f64,
    pub skus_with_backorders: usize,
    pub vendors: Vec<VendorSummary>,
    pub critical_items: Vec<ReplenishmentRecord>,
}

/// Contents of `summary.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub today: NaiveDate,
    pub preset: String,
    pub granularity: String,
    pub horizon_days: u32,
    pub service_level: u32,
    pub shipments: AggregationStats,
    pub skipped_skus: usize,
    pub forecast: Option<ForecastSummary>,
    pub accuracy: AccuracyRankings,
    pub replenishment: ReplenishmentSummary,
    pub warning_count: usize,
}

#[derive(Debug, Clone)]
pub struct PlanningOutput {
    pub forecast: ForecastOutput,
    pub plan: ReplenishmentPlan,
    /// Every warning raised by the run, sorted
    pub warnings: Vec<PlanningWarning>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct PlanningRun {
    config: PlanningConfig,
    today: NaiveDate,
}

impl PlanningRun {
    pub fn new(config: PlanningConfig, today: NaiveDate) -> Self {
        Self { config, today }
    }

    pub fn config(&self) -> &PlanningConfig {
        &self.config
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn execute(&self, inputs: &PlanningInputs) -> Result<PlanningOutput> {
        self.execute_with_cancel(inputs, &AtomicBool::new(false))
    }

    pub fn execute_with_cancel(
        &self,
        inputs: &PlanningInputs,
        cancel: &AtomicBool,
    ) -> Result<PlanningOutput> {
        let engine = ForecastEngine::new(self.config.forecast.clone(), self.today)?;
        let planner = ReplenishmentPlanner::new(self.config.replenishment.clone())?;

        let (categories, mut warnings) = CategoryMap::from_records(inputs.categories.clone());
        let aggregation = engine.aggregator().aggregate(&inputs.shipments)?;
        warnings.extend(aggregation.stats.warnings());

        let forecast = engine.run_with_cancel(&aggregation.table, &categories, cancel)?;
        warnings.extend(forecast.warnings.iter().cloned());

        if cancel.load(Ordering::Relaxed) {
            return Err(ForecastError::Cancelled.into());
        }

        let (supply, supply_warnings) = SupplyIndex::build(&inputs.supply);
        warnings.extend(supply_warnings);
        let demand: Vec<DemandInput> =
            forecast.forecasts.iter().map(DemandInput::from_forecast).collect();
        let plan = planner.plan_with_cancel(&demand, &supply, cancel)?;
        warnings.extend(plan.warnings.iter().cloned());
        warnings.sort();
        warnings.dedup();

        let top_n = self.config.report.top_n;
        let summary = RunSummary {
            today: self.today,
            preset: self.config.forecast.preset.to_string(),
            granularity: self.config.forecast.granularity.to_string(),
            horizon_days: self.config.forecast.horizon_days,
            service_level: planner.service_level().percent(),
            shipments: aggregation.stats,
            skipped_skus: forecast.skipped_skus,
            forecast: ForecastSummary::from_forecasts(&forecast.forecasts, top_n),
            accuracy: AccuracyRankings::from_accuracy(&forecast.accuracy, top_n),
            replenishment: ReplenishmentSummary {
                skus_evaluated: plan.evaluated_skus,
                skus_to_order: plan.records.len(),
                total_suggested_units: plan.total_suggested_units(),
                total_order_value: plan.total_order_value(),
                skus_with_backorders: plan.skus_with_backorders(),
                vendors: VendorSummary::from_records(&plan.records),
                critical_items: critical_items(
                    &plan.records,
                    self.config.replenishment.critical_priority_threshold,
                    top_n,
                ),
            },
            warning_count: warnings.len(),
        };

        tracing::info!(
            today = %self.today,
            forecasted = forecast.forecasts.len(),
            to_order = plan.records.len(),
            total_units = summary.replenishment.total_suggested_units,
            warnings = warnings.len(),
            "planning run complete"
        );

        Ok(PlanningOutput { forecast, plan, warnings, summary })
    }

    /// Compare earlier forecast snapshots with the shipments that followed
    pub fn compare(
        &self,
        snapshots: &[SnapshotRow],
        shipments: &[RawShipment],
    ) -> (Vec<ComparisonRow>, Option<ForecastBias>) {
        let rows = compare_forecast_vs_actual(snapshots, shipments, self.today);
        let bias = ForecastBias::from_comparisons(&rows);
        tracing::info!(comparisons = rows.len(), "compared snapshots with actuals");
        (rows, bias)
    }
}
