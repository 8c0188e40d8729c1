//! Inventory policy math
//!
//! Safety stock, reorder point and order-up-to level follow the periodic
//! review model:
//!
//! - `safety_stock = z * demand_std * sqrt(lead_time)`
//! - `reorder_point = daily_demand * lead_time + safety_stock`
//! - `order_up_to = daily_demand * (lead_time + review_period) + safety_stock`
//!
//! The raw formulas here are unrounded. [`PolicyLevels::compute`] rounds to
//! whole units, ties to even, rounding safety stock first and building the
//! other two levels on the rounded value.

use crate::{ReplenishmentError, Result};
use demand_forecast::{PlanningWarning, WarningKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Days of supply reported when there is no demand to consume stock
pub const NO_DEMAND_DAYS_OF_SUPPLY: f64 = 999.0;

/// Target probability of not stocking out during a replenishment cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum ServiceLevel {
    P90,
    #[default]
    P95,
    P98,
    P99,
}

impl ServiceLevel {
    pub const ALL: [ServiceLevel; 4] = [
        ServiceLevel::P90,
        ServiceLevel::P95,
        ServiceLevel::P98,
        ServiceLevel::P99,
    ];

    /// Standard normal quantile for this level
    pub fn z_score(self) -> f64 {
        match self {
            ServiceLevel::P90 => 1.28,
            ServiceLevel::P95 => 1.65,
            ServiceLevel::P98 => 2.05,
            ServiceLevel::P99 => 2.33,
        }
    }

    pub fn percent(self) -> u32 {
        match self {
            ServiceLevel::P90 => 90,
            ServiceLevel::P95 => 95,
            ServiceLevel::P98 => 98,
            ServiceLevel::P99 => 99,
        }
    }

    pub fn from_percent(percent: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|level| level.percent() == percent)
    }

    /// Level for `percent`, falling back to 95% with a warning for values
    /// outside the table
    pub fn resolve(percent: u32) -> (Self, Option<PlanningWarning>) {
        match Self::from_percent(percent) {
            Some(level) => (level, None),
            None => {
                tracing::warn!(percent, "unsupported service level, using 95%");
                (
                    ServiceLevel::P95,
                    Some(PlanningWarning::global(
                        WarningKind::UnknownServiceLevel,
                        format!("Service level {percent}% is not supported; using 95%"),
                    )),
                )
            }
        }
    }
}

impl fmt::Display for ServiceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Planner-wide policy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplenishmentPolicy {
    /// Service level in percent; one of 90, 95, 98, 99
    pub service_level: u32,
    /// Lead time used when neither SKU nor vendor history exists
    pub default_lead_time_days: f64,
    pub review_period_days: f64,
    /// Priority at or above which a row counts as critical
    pub critical_priority_threshold: u32,
    /// SKU count at which planning moves onto the rayon pool
    pub parallel_threshold: usize,
}

impl Default for ReplenishmentPolicy {
    fn default() -> Self {
        Self {
            service_level: 95,
            default_lead_time_days: 73.0,
            review_period_days: 14.0,
            critical_priority_threshold: 50,
            parallel_threshold: 64,
        }
    }
}

impl ReplenishmentPolicy {
    pub fn validate(&self) -> Result<()> {
        if !(self.default_lead_time_days > 0.0) {
            return Err(ReplenishmentError::InvalidParameter(format!(
                "default_lead_time_days must be positive, got {}",
                self.default_lead_time_days
            )));
        }
        if !(self.review_period_days >= 0.0) {
            return Err(ReplenishmentError::InvalidParameter(format!(
                "review_period_days must not be negative, got {}",
                self.review_period_days
            )));
        }
        if self.critical_priority_threshold > 100 {
            return Err(ReplenishmentError::InvalidParameter(format!(
                "critical_priority_threshold must be within 0..=100, got {}",
                self.critical_priority_threshold
            )));
        }
        Ok(())
    }
}

/// Round to whole units, ties to even
pub fn round_units(value: f64) -> f64 {
    value.round_ties_even()
}

/// Unrounded safety stock, zero when any input is not positive
pub fn safety_stock(daily_demand: f64, demand_std: f64, lead_time_days: f64, z_score: f64) -> f64 {
    if daily_demand <= 0.0 || demand_std <= 0.0 || lead_time_days <= 0.0 {
        return 0.0;
    }
    (z_score * demand_std * lead_time_days.sqrt()).max(0.0)
}

/// Unrounded reorder point
pub fn reorder_point(daily_demand: f64, lead_time_days: f64, safety_stock: f64) -> f64 {
    if daily_demand <= 0.0 {
        return safety_stock;
    }
    (daily_demand * lead_time_days + safety_stock).max(0.0)
}

/// Unrounded order-up-to level
pub fn order_up_to_level(
    daily_demand: f64,
    lead_time_days: f64,
    review_period_days: f64,
    safety_stock: f64,
) -> f64 {
    if daily_demand <= 0.0 {
        return safety_stock;
    }
    (daily_demand * (lead_time_days + review_period_days) + safety_stock).max(0.0)
}

/// Net requirement plus committed backorders, in whole units
pub fn suggested_order(order_up_to: f64, available_supply: f64, backorder_qty: f64) -> f64 {
    let net_requirement = (order_up_to - available_supply).max(0.0);
    round_units(net_requirement + backorder_qty.max(0.0)).max(0.0)
}

/// Days the available supply lasts at the current demand rate
pub fn days_of_supply(available_supply: f64, daily_demand: f64) -> f64 {
    if daily_demand > 0.0 {
        available_supply / daily_demand
    } else {
        NO_DEMAND_DAYS_OF_SUPPLY
    }
}

/// Ordering urgency in 0..=100, higher is more urgent.
///
/// Additive bands for days of supply (up to 40), backorder coverage (up to 40)
/// and demand velocity (up to 20).
pub fn priority_score(days_of_supply: f64, backorder_qty: f64, daily_demand: f64) -> u32 {
    let mut score = 0;

    score += if days_of_supply < 7.0 {
        40
    } else if days_of_supply < 14.0 {
        30
    } else if days_of_supply < 30.0 {
        20
    } else if days_of_supply < 60.0 {
        10
    } else {
        0
    };

    if backorder_qty > 0.0 {
        score += if daily_demand > 0.0 {
            let backorder_days = backorder_qty / daily_demand;
            if backorder_days > 30.0 {
                40
            } else if backorder_days > 14.0 {
                30
            } else if backorder_days > 7.0 {
                20
            } else {
                10
            }
        } else {
            // backorders without any demand history
            20
        };
    }

    score += if daily_demand > 10.0 {
        20
    } else if daily_demand > 5.0 {
        15
    } else if daily_demand > 1.0 {
        10
    } else if daily_demand > 0.0 {
        5
    } else {
        0
    };

    score.min(100)
}

/// Rounded policy levels for one SKU
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyLevels {
    pub safety_stock: f64,
    pub reorder_point: f64,
    pub order_up_to: f64,
}

impl PolicyLevels {
    pub fn compute(
        daily_demand: f64,
        demand_std: f64,
        lead_time_days: f64,
        review_period_days: f64,
        service_level: ServiceLevel,
    ) -> Self {
        let safety_stock = round_units(safety_stock(
            daily_demand,
            demand_std,
            lead_time_days,
            service_level.z_score(),
        ));
        Self {
            safety_stock,
            reorder_point: round_units(reorder_point(daily_demand, lead_time_days, safety_stock)),
            order_up_to: round_units(order_up_to_level(
                daily_demand,
                lead_time_days,
                review_period_days,
                safety_stock,
            )),
        }
    }
}
