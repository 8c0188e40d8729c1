//! Advisory output explaining why a SKU is present, absent or flagged

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of an advisory condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// Not enough periods to forecast; the SKU is omitted
    InsufficientHistory,
    /// Too few points for Z-score detection; the raw series was smoothed
    InsufficientSample,
    /// CV above the intermittent threshold; a higher Z threshold was used
    IntermittentDemand,
    /// More points were flagged than the data-quality limit allows
    HighAnomalyRate,
    /// SKU had no category and fell back to "Uncategorized"
    MissingCategory,
    /// A lookup table repeated a key; the first occurrence was kept
    DuplicateKey,
    /// Input rows dropped during aggregation
    InvalidRecord,
    /// Requested service level is not in the z table
    UnknownServiceLevel,
    /// A degenerate numeric input resolved to a fallback value
    DegenerateInput,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            WarningKind::InsufficientHistory => "insufficient_history",
            WarningKind::InsufficientSample => "insufficient_sample",
            WarningKind::IntermittentDemand => "intermittent_demand",
            WarningKind::HighAnomalyRate => "high_anomaly_rate",
            WarningKind::MissingCategory => "missing_category",
            WarningKind::DuplicateKey => "duplicate_key",
            WarningKind::InvalidRecord => "invalid_record",
            WarningKind::UnknownServiceLevel => "unknown_service_level",
            WarningKind::DegenerateInput => "degenerate_input",
        };
        f.write_str(label)
    }
}

/// One row of the warnings table
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlanningWarning {
    /// SKU the warning is about, `None` for run-level warnings
    pub sku: Option<String>,
    pub kind: WarningKind,
    pub message: String,
}

impl PlanningWarning {
    /// Warning attached to a single SKU
    pub fn for_sku(sku: impl Into<String>, kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            sku: Some(sku.into()),
            kind,
            message: message.into(),
        }
    }

    /// Warning about the run as a whole
    pub fn global(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            sku: None,
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for PlanningWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sku {
            Some(sku) => write!(f, "[{}] {}: {}", self.kind, sku, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}
