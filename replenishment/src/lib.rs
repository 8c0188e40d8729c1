//! # Replenishment
//!
//! Turns per-SKU demand forecasts into purchase recommendations under a
//! safety-stock and lead-time policy.
//!
//! ## Features
//!
//! - Service-level z-table, safety stock, reorder point and order-up-to level
//! - Net requirements against on-hand, in-transit and open PO supply, plus backorders
//! - Lead-time cascade from purchase-order history (SKU, vendor, international vendor, default)
//! - Priority scoring, vendor summaries and critical-item lists
//!
//! ## Quick Start
//!
//! ```rust
//! use replenishment::{DemandInput, ReplenishmentPlanner, ReplenishmentPolicy, SupplyIndex};
//! use replenishment::{InventoryRecord, SupplyTables};
//!
//! let planner = ReplenishmentPlanner::new(ReplenishmentPolicy::default())?;
//! let tables = SupplyTables {
//!     inventory: vec![InventoryRecord::new("A-1", 100.0, 0.0, 2.5)],
//!     ..SupplyTables::default()
//! };
//! let (supply, _warnings) = SupplyIndex::build(&tables);
//! let plan = planner.plan(&[DemandInput::new("A-1", 10.0, 2.0)], &supply)?;
//! assert_eq!(plan.records.len(), 1);
//! # Ok::<(), replenishment::ReplenishmentError>(())
//! ```

use thiserror::Error;

pub mod planner;
pub mod policy;
pub mod summary;
pub mod supply;

pub use planner::{
    DemandInput, DemandSource, ReplenishmentPlan, ReplenishmentPlanner, ReplenishmentRecord,
};
pub use policy::{
    days_of_supply, order_up_to_level, priority_score, reorder_point, round_units, safety_stock,
    suggested_order, PolicyLevels, ReplenishmentPolicy, ServiceLevel, NO_DEMAND_DAYS_OF_SUPPLY,
};
pub use summary::{critical_items, VendorSummary};
pub use supply::{
    normalize_sku, BackorderRecord, InventoryRecord, LeadTimeRecord, LeadTimeSource,
    LeadTimeTable, OpenPoRecord, SkuMasterRecord, SkuSupply, SupplyIndex, SupplyTables,
    UNKNOWN_VENDOR,
};

/// Errors that can occur while planning replenishment
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReplenishmentError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The run was cancelled before every SKU was planned
    #[error("Replenishment run cancelled; partial results discarded")]
    Cancelled,
}

/// Result type for replenishment operations
pub type Result<T> = std::result::Result<T, ReplenishmentError>;
