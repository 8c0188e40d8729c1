//! Canonical CSV and JSON tables at the edge of a run
//!
//! Column names are the field names of the row types; alias resolution and
//! spreadsheet export belong to whatever produces or consumes these files.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use demand_forecast::{DataLoader, RawShipment};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{PlanningError, Result};
use crate::pipeline::PlanningOutput;

pub const FORECAST_FILE: &str = "forecast.csv";
pub const ACCURACY_FILE: &str = "accuracy.csv";
pub const REPLENISHMENT_FILE: &str = "replenishment.csv";
pub const WARNINGS_FILE: &str = "warnings.csv";
pub const SUMMARY_FILE: &str = "summary.json";

/// Read a headed CSV table into rows of `T`
pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let read_error = |source| PlanningError::ReadTable { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(read_error)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(read_error)?;
    tracing::debug!(path = %path.display(), rows = rows.len(), "read table");
    Ok(rows)
}

/// [`read_table`] for optional inputs; `None` reads as an empty table
pub fn read_optional<T: DeserializeOwned>(path: Option<&Path>) -> Result<Vec<T>> {
    match path {
        Some(path) => read_table(path),
        None => Ok(Vec::new()),
    }
}

/// Shipment history through the polars loader
pub fn read_shipments(path: &Path) -> Result<Vec<RawShipment>> {
    let rows = DataLoader::from_csv(path)?;
    tracing::info!(path = %path.display(), rows = rows.len(), "loaded shipments");
    Ok(rows)
}

pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let write_error = |source| PlanningError::WriteTable { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(write_error)?;
    for row in rows {
        writer.serialize(row).map_err(write_error)?;
    }
    writer
        .flush()
        .map_err(|source| PlanningError::Io { path: path.to_path_buf(), source })?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file =
        File::create(path).map_err(|source| PlanningError::Io { path: path.to_path_buf(), source })?;
    serde_json::to_writer_pretty(BufWriter::new(file), value)?;
    Ok(())
}

/// Write every run table into `dir`, returning the paths written
pub fn write_outputs(dir: &Path, output: &PlanningOutput) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .map_err(|source| PlanningError::Io { path: dir.to_path_buf(), source })?;

    let forecast = dir.join(FORECAST_FILE);
    write_table(&forecast, &output.forecast.forecasts)?;
    let accuracy = dir.join(ACCURACY_FILE);
    write_table(&accuracy, &output.forecast.accuracy)?;
    let replenishment = dir.join(REPLENISHMENT_FILE);
    write_table(&replenishment, &output.plan.records)?;
    let warnings = dir.join(WARNINGS_FILE);
    write_table(&warnings, &output.warnings)?;
    let summary = dir.join(SUMMARY_FILE);
    write_json(&summary, &output.summary)?;

    tracing::info!(dir = %dir.display(), "wrote planning outputs");
    Ok(vec![forecast, accuracy, replenishment, warnings, summary])
}
