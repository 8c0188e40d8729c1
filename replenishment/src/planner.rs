//! Replenishment planning
//!
//! One [`ReplenishmentRecord`] is evaluated per forecast SKU; the plan keeps
//! only the rows whose available supply is below the reorder point.

use crate::policy::{
    days_of_supply, priority_score, suggested_order, PolicyLevels, ReplenishmentPolicy,
    ServiceLevel,
};
use crate::supply::{LeadTimeSource, SupplyIndex, SupplyTables};
use crate::{ReplenishmentError, Result};
use demand_forecast::{ForecastRecord, PlanningWarning};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which forecast estimate supplied the daily demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandSource {
    Seasonal,
    Smoothed,
    MovingAverage,
    Average,
}

impl fmt::Display for DemandSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemandSource::Seasonal => write!(f, "seasonal"),
            DemandSource::Smoothed => write!(f, "smoothed"),
            DemandSource::MovingAverage => write!(f, "moving_average"),
            DemandSource::Average => write!(f, "average"),
        }
    }
}

/// Daily demand rate and variability for one SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandInput {
    pub sku: String,
    pub daily_demand: f64,
    pub demand_std: f64,
    pub source: DemandSource,
}

impl DemandInput {
    pub fn new(sku: impl Into<String>, daily_demand: f64, demand_std: f64) -> Self {
        Self {
            sku: sku.into(),
            daily_demand,
            demand_std,
            source: DemandSource::Average,
        }
    }

    /// Take the first positive estimate among seasonal, smoothed and
    /// moving-average demand, falling back to the plain average
    pub fn from_forecast(forecast: &ForecastRecord) -> Self {
        let candidates = [
            (forecast.seasonal_daily, DemandSource::Seasonal),
            (forecast.smoothed_daily, DemandSource::Smoothed),
            (forecast.primary_forecast_daily, DemandSource::MovingAverage),
        ];
        let (daily_demand, source) = candidates
            .into_iter()
            .find(|(value, _)| value.is_finite() && *value > 0.0)
            .unwrap_or((forecast.avg_daily_demand.max(0.0), DemandSource::Average));

        Self {
            sku: forecast.sku.clone(),
            daily_demand,
            demand_std: forecast.demand_std.max(0.0),
            source,
        }
    }
}

/// Policy levels, supply position and recommendation for one SKU
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishmentRecord {
    pub sku: String,
    pub product_name: Option<String>,
    pub vendor: String,
    pub daily_demand: f64,
    pub demand_source: DemandSource,
    pub demand_std: f64,
    pub lead_time_days: f64,
    pub lead_time_source: LeadTimeSource,
    pub service_level: u32,
    pub safety_stock: f64,
    pub reorder_point: f64,
    pub order_up_to_level: f64,
    pub on_hand_qty: f64,
    pub in_transit_qty: f64,
    pub open_po_qty: f64,
    pub available_supply: f64,
    pub backorder_qty: f64,
    pub days_of_supply: f64,
    pub below_reorder_point: bool,
    pub suggested_order_qty: f64,
    pub unit_cost: f64,
    /// `suggested_order_qty * unit_cost`, 0 without a known cost
    pub order_value: f64,
    pub priority_score: u32,
}

/// Plan rows plus run diagnostics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplenishmentPlan {
    /// Rows below their reorder point, by vendor then priority
    pub records: Vec<ReplenishmentRecord>,
    pub warnings: Vec<PlanningWarning>,
    /// SKUs evaluated before filtering
    pub evaluated_skus: usize,
}

impl ReplenishmentPlan {
    pub fn total_suggested_units(&self) -> f64 {
        self.records.iter().map(|r| r.suggested_order_qty).sum()
    }

    pub fn total_order_value(&self) -> f64 {
        self.records.iter().map(|r| r.order_value).sum()
    }

    pub fn skus_with_backorders(&self) -> usize {
        self.records.iter().filter(|r| r.backorder_qty > 0.0).count()
    }
}

fn plan_order(a: &ReplenishmentRecord, b: &ReplenishmentRecord) -> CmpOrdering {
    a.vendor
        .cmp(&b.vendor)
        .then_with(|| b.priority_score.cmp(&a.priority_score))
        .then_with(|| b.order_value.total_cmp(&a.order_value))
        .then_with(|| a.sku.cmp(&b.sku))
}

/// Net-requirements planner over a fixed policy
#[derive(Debug, Clone)]
pub struct ReplenishmentPlanner {
    policy: ReplenishmentPolicy,
    service_level: ServiceLevel,
    level_warning: Option<PlanningWarning>,
}

impl ReplenishmentPlanner {
    pub fn new(policy: ReplenishmentPolicy) -> Result<Self> {
        policy.validate()?;
        let (service_level, level_warning) = ServiceLevel::resolve(policy.service_level);
        Ok(Self {
            policy,
            service_level,
            level_warning,
        })
    }

    pub fn policy(&self) -> &ReplenishmentPolicy {
        &self.policy
    }

    /// The service level actually applied, after any fallback
    pub fn service_level(&self) -> ServiceLevel {
        self.service_level
    }

    /// Join `tables` and plan every forecast SKU
    pub fn plan_forecasts(
        &self,
        forecasts: &[ForecastRecord],
        tables: &SupplyTables,
    ) -> Result<ReplenishmentPlan> {
        let (supply, supply_warnings) = SupplyIndex::build(tables);
        let demand: Vec<DemandInput> = forecasts.iter().map(DemandInput::from_forecast).collect();
        let mut plan = self.plan(&demand, &supply)?;
        plan.warnings.extend(supply_warnings);
        plan.warnings.sort();
        Ok(plan)
    }

    pub fn plan(&self, demand: &[DemandInput], supply: &SupplyIndex) -> Result<ReplenishmentPlan> {
        self.plan_with_cancel(demand, supply, &AtomicBool::new(false))
    }

    /// Plan every SKU in `demand`, stopping with
    /// [`ReplenishmentError::Cancelled`] once `cancel` is raised.
    pub fn plan_with_cancel(
        &self,
        demand: &[DemandInput],
        supply: &SupplyIndex,
        cancel: &AtomicBool,
    ) -> Result<ReplenishmentPlan> {
        let mut plan = ReplenishmentPlan {
            warnings: self.level_warning.iter().cloned().collect(),
            ..ReplenishmentPlan::default()
        };
        if demand.is_empty() {
            tracing::info!("no forecasts to plan; replenishment plan is empty");
            return Ok(plan);
        }

        let task = |input: &DemandInput| -> Result<ReplenishmentRecord> {
            if cancel.load(Ordering::Relaxed) {
                return Err(ReplenishmentError::Cancelled);
            }
            Ok(self.evaluate(input, supply))
        };

        let evaluated: Vec<ReplenishmentRecord> = if demand.len() >= self.policy.parallel_threshold
        {
            tracing::debug!(skus = demand.len(), "planning on the rayon pool");
            demand.par_iter().map(task).collect::<Result<_>>()?
        } else {
            demand.iter().map(task).collect::<Result<_>>()?
        };

        if cancel.load(Ordering::Relaxed) {
            return Err(ReplenishmentError::Cancelled);
        }

        plan.evaluated_skus = evaluated.len();
        plan.records = evaluated
            .into_iter()
            .filter(|record| record.below_reorder_point)
            .collect();
        plan.records.sort_by(plan_order);

        tracing::info!(
            evaluated = plan.evaluated_skus,
            below_reorder_point = plan.records.len(),
            total_units = plan.total_suggested_units(),
            total_value = plan.total_order_value(),
            service_level = self.service_level.percent(),
            "generated replenishment plan"
        );
        Ok(plan)
    }

    /// Evaluate one SKU without filtering on the reorder point
    pub fn evaluate(&self, input: &DemandInput, supply: &SupplyIndex) -> ReplenishmentRecord {
        let daily_demand = if input.daily_demand.is_finite() {
            input.daily_demand.max(0.0)
        } else {
            0.0
        };
        let demand_std = if input.demand_std.is_finite() {
            input.demand_std.max(0.0)
        } else {
            0.0
        };
        let position = supply.supply(&input.sku);
        let (lead_time_days, lead_time_source) =
            supply.lead_time(&input.sku, self.policy.default_lead_time_days);

        let levels = PolicyLevels::compute(
            daily_demand,
            demand_std,
            lead_time_days,
            self.policy.review_period_days,
            self.service_level,
        );

        let available_supply = position.available_supply();
        let below_reorder_point = available_supply < levels.reorder_point;
        let suggested_order_qty = if below_reorder_point {
            suggested_order(levels.order_up_to, available_supply, position.backorder_qty)
        } else {
            0.0
        };
        let order_value = if position.unit_cost > 0.0 {
            suggested_order_qty * position.unit_cost
        } else {
            0.0
        };
        let days = days_of_supply(available_supply, daily_demand);

        tracing::debug!(
            sku = %input.sku,
            daily_demand,
            reorder_point = levels.reorder_point,
            available_supply,
            suggested_order_qty,
            lead_time_days,
            "evaluated sku"
        );

        ReplenishmentRecord {
            sku: input.sku.clone(),
            product_name: supply.product_name(&input.sku).map(str::to_string),
            vendor: supply.vendor(&input.sku).to_string(),
            daily_demand,
            demand_source: input.source,
            demand_std,
            lead_time_days,
            lead_time_source,
            service_level: self.service_level.percent(),
            safety_stock: levels.safety_stock,
            reorder_point: levels.reorder_point,
            order_up_to_level: levels.order_up_to,
            on_hand_qty: position.on_hand_qty,
            in_transit_qty: position.in_transit_qty,
            open_po_qty: position.open_po_qty,
            available_supply,
            backorder_qty: position.backorder_qty,
            days_of_supply: days,
            below_reorder_point,
            suggested_order_qty,
            unit_cost: position.unit_cost,
            order_value,
            priority_score: priority_score(days, position.backorder_qty, daily_demand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supply::{BackorderRecord, InventoryRecord, OpenPoRecord, SkuMasterRecord};
    use demand_forecast::WarningKind;
    use pretty_assertions::assert_eq;

    fn index(inventory: Vec<InventoryRecord>) -> SupplyIndex {
        SupplyIndex::build(&SupplyTables {
            inventory,
            ..SupplyTables::default()
        })
        .0
    }

    #[test]
    fn test_evaluate_below_reorder_point() {
        let planner = ReplenishmentPlanner::new(ReplenishmentPolicy {
            default_lead_time_days: 25.0,
            ..ReplenishmentPolicy::default()
        })
        .unwrap();
        let supply = index(vec![InventoryRecord::new("A", 100.0, 0.0, 2.0)]);
        let record = planner.evaluate(&DemandInput::new("A", 10.0, 2.0), &supply);

        assert_eq!(record.safety_stock, 16.0);
        assert_eq!(record.reorder_point, 266.0);
        assert_eq!(record.order_up_to_level, 406.0);
        assert!(record.below_reorder_point);
        assert_eq!(record.suggested_order_qty, 306.0);
        assert_eq!(record.order_value, 612.0);
        assert_eq!(record.days_of_supply, 10.0);
        assert_eq!(record.lead_time_source, LeadTimeSource::Default);
        assert_eq!(record.vendor, "Unknown");
        // 30 for 7-14 days of supply, 15 for 5-10 units a day
        assert_eq!(record.priority_score, 45);
    }

    #[test]
    fn test_plan_filters_and_orders() {
        let planner = ReplenishmentPlanner::new(ReplenishmentPolicy::default()).unwrap();
        let tables = SupplyTables {
            inventory: vec![
                InventoryRecord::new("A", 10.0, 0.0, 1.0),
                InventoryRecord::new("B", 5000.0, 0.0, 1.0),
                InventoryRecord::new("C", 0.0, 0.0, 4.0),
                InventoryRecord::new("D", 50.0, 0.0, 1.0),
            ],
            open_pos: vec![OpenPoRecord {
                sku: "D".to_string(),
                open_qty: 10.0,
                vendor: Some("Zeta".to_string()),
            }],
            backorders: vec![BackorderRecord {
                sku: "C".to_string(),
                backorder_qty: 12.0,
            }],
            sku_master: vec![
                SkuMasterRecord {
                    sku: "A".to_string(),
                    vendor: Some("Acme".to_string()),
                    product_name: Some("Anvil".to_string()),
                },
                SkuMasterRecord {
                    sku: "C".to_string(),
                    vendor: Some("Acme".to_string()),
                    product_name: None,
                },
            ],
            lead_times: vec![],
        };
        let (supply, _) = SupplyIndex::build(&tables);
        let demand = vec![
            DemandInput::new("A", 2.0, 1.0),
            DemandInput::new("B", 2.0, 1.0),
            DemandInput::new("C", 2.0, 1.0),
            DemandInput::new("D", 2.0, 1.0),
        ];
        let plan = planner.plan(&demand, &supply).unwrap();

        assert_eq!(plan.evaluated_skus, 4);
        let skus: Vec<&str> = plan.records.iter().map(|r| r.sku.as_str()).collect();
        // B is covered; Acme rows come first, C outranks A on backorders
        assert_eq!(skus, vec!["C", "A", "D"]);
        assert!(plan.records.iter().all(|r| r.below_reorder_point));
        assert_eq!(plan.records[1].product_name.as_deref(), Some("Anvil"));
        assert_eq!(plan.records[2].vendor, "Zeta");
        assert_eq!(plan.skus_with_backorders(), 1);
    }

    #[test]
    fn test_empty_demand_gives_empty_plan() {
        let planner = ReplenishmentPlanner::new(ReplenishmentPolicy::default()).unwrap();
        let plan = planner.plan(&[], &SupplyIndex::default()).unwrap();
        assert!(plan.records.is_empty());
        assert_eq!(plan.evaluated_skus, 0);
    }

    #[test]
    fn test_unknown_service_level_warns() {
        let planner = ReplenishmentPlanner::new(ReplenishmentPolicy {
            service_level: 80,
            ..ReplenishmentPolicy::default()
        })
        .unwrap();
        assert_eq!(planner.service_level(), ServiceLevel::P95);
        let plan = planner.plan(&[], &SupplyIndex::default()).unwrap();
        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(plan.warnings[0].kind, WarningKind::UnknownServiceLevel);
    }

    #[test]
    fn test_cancelled_plan() {
        let planner = ReplenishmentPlanner::new(ReplenishmentPolicy::default()).unwrap();
        let cancel = AtomicBool::new(true);
        let result = planner.plan_with_cancel(
            &[DemandInput::new("A", 1.0, 1.0)],
            &SupplyIndex::default(),
            &cancel,
        );
        assert_eq!(result, Err(ReplenishmentError::Cancelled));
    }
}
