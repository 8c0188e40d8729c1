//! # Restock
//!
//! Planning runs over shipment history: layered configuration, canonical
//! table IO and the orchestration that feeds demand forecasts into the
//! replenishment planner under one run date.

pub mod config;
pub mod error;
pub mod io;
pub mod pipeline;

pub use config::{
    ConfigError, ConfigOverrides, LoadOptions, LogFormat, LoggingConfig, PlanningConfig,
    ReportConfig,
};
pub use error::{PlanningError, Result};
pub use pipeline::{PlanningInputs, PlanningOutput, PlanningRun, ReplenishmentSummary, RunSummary};
