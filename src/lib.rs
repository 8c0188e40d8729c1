//! # Restock
//!
//! Workspace facade over the planning crates:
//!
//! - [`demand_math`]: numeric primitives over per-period demand
//! - [`demand_forecast`]: per-SKU demand forecasting from shipment history
//! - [`replenishment`]: safety stock, reorder points and order recommendations
//! - [`restock`]: configuration, table IO and end-to-end planning runs
//!
//! ## Example
//!
//! ```
//! use restock_workspace::replenishment::{safety_stock, ServiceLevel};
//!
//! let ss = safety_stock(10.0, 2.0, 25.0, ServiceLevel::P95.z_score());
//! assert!((ss - 16.5).abs() < 1e-9);
//! ```

pub use demand_forecast;
pub use demand_math;
pub use replenishment;
pub use restock;
