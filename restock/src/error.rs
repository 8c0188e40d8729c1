use std::path::PathBuf;

use demand_forecast::ForecastError;
use replenishment::ReplenishmentError;
use thiserror::Error;

use crate::config::ConfigError;

/// Anything that can stop a planning run
#[derive(Debug, Error)]
pub enum PlanningError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),

    #[error(transparent)]
    Replenishment(#[from] ReplenishmentError),

    #[error("could not read table `{path}`: {source}")]
    ReadTable { path: PathBuf, source: csv::Error },

    #[error("could not write table `{path}`: {source}")]
    WriteTable { path: PathBuf, source: csv::Error },

    #[error("could not write `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("could not serialize run summary: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PlanningError>;
