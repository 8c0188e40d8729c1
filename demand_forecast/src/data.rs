//! Shipment history handling for forecasting
//!
//! Raw shipment rows come in through [`DataLoader`] (polars) or straight from
//! the caller. [`TimeSeriesAggregator`] turns them into one clean
//! [`DemandSeries`] per SKU, bucketed to the configured granularity and
//! restricted to a trailing window anchored at the run's `today`.

use crate::config::Granularity;
use crate::error::{ForecastError, Result};
use crate::warnings::{PlanningWarning, WarningKind};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;

/// Category assigned to SKUs missing from the category map
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Canonical SKU key: trimmed, uppercased, internal whitespace collapsed.
///
/// Every table that names a SKU is keyed through this, so `" ab  12 "` in one
/// export and `"AB 12"` in another are the same item.
pub fn normalize_sku(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Column names of the canonical shipment schema
pub const SHIPMENT_COLUMNS: [&str; 3] = ["sku", "date", "quantity"];

/// One shipment row as supplied by the ingestion layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawShipment {
    pub sku: String,
    /// `YYYY-MM-DD` or `MM/DD/YY`
    pub date: String,
    pub quantity: f64,
}

impl RawShipment {
    pub fn new(sku: impl Into<String>, date: impl Into<String>, quantity: f64) -> Self {
        Self {
            sku: sku.into(),
            date: date.into(),
            quantity,
        }
    }
}

/// Parse a shipment date in any of the accepted formats
pub fn parse_shipment_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Datetime strings keep only their date part
    let date_part = match raw.char_indices().nth(10) {
        Some((idx, ' ')) | Some((idx, 'T')) => &raw[..idx],
        _ => raw,
    };

    // %y before %Y: "%m/%d/%Y" would read "24" as the year 24
    ["%Y-%m-%d", "%m/%d/%y", "%m/%d/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date_part, format).ok())
}

/// A single aggregated (sku, period, quantity) point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandObservation {
    pub sku: String,
    pub period_start: NaiveDate,
    pub quantity: f64,
}

/// Chronologically ordered demand for one SKU, one value per period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DemandSeries {
    sku: String,
    periods: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DemandSeries {
    /// Build a series from unordered points, summing repeated periods
    pub fn from_points<I>(sku: impl Into<String>, points: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        let mut buckets: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (period, quantity) in points {
            *buckets.entry(period).or_insert(0.0) += quantity;
        }
        let (periods, values) = buckets.into_iter().unzip();
        Self {
            sku: sku.into(),
            periods,
            values,
        }
    }

    pub fn sku(&self) -> &str {
        &self.sku
    }

    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Total quantity over the whole series
    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    pub fn last_period(&self) -> Option<NaiveDate> {
        self.periods.last().copied()
    }

    /// Demand summed per (year, month) of each period start
    pub fn monthly_totals(&self) -> BTreeMap<(i32, u32), f64> {
        let mut totals = BTreeMap::new();
        for (period, value) in self.periods.iter().zip(&self.values) {
            *totals.entry((period.year(), period.month())).or_insert(0.0) += value;
        }
        totals
    }

    /// Flatten back into observation rows
    pub fn observations(&self) -> impl Iterator<Item = DemandObservation> + '_ {
        self.periods
            .iter()
            .zip(&self.values)
            .map(|(&period_start, &quantity)| DemandObservation {
                sku: self.sku.clone(),
                period_start,
                quantity,
            })
    }
}

/// All SKU series of one run, keyed and iterated in SKU order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandTable {
    series: BTreeMap<String, DemandSeries>,
    /// Inclusive date range the history was drawn from, when known
    window: Option<(NaiveDate, NaiveDate)>,
}

impl DemandTable {
    pub fn from_series<I>(series: I) -> Self
    where
        I: IntoIterator<Item = DemandSeries>,
    {
        Self {
            series: series
                .into_iter()
                .map(|s| (s.sku.clone(), s))
                .collect(),
            window: None,
        }
    }

    /// Record the inclusive date range the series were drawn from
    pub fn with_window(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.window = Some((start, end));
        self
    }

    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.window
    }

    pub fn get(&self, sku: &str) -> Option<&DemandSeries> {
        self.series.get(sku)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DemandSeries> {
        self.series.values()
    }

    pub fn skus(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Pool SKU series into one series per category
    pub fn by_category(&self, categories: &CategoryMap) -> DemandTable {
        let mut pooled: BTreeMap<&str, Vec<(NaiveDate, f64)>> = BTreeMap::new();
        for series in self.iter() {
            pooled
                .entry(categories.category_of(&series.sku))
                .or_default()
                .extend(series.periods.iter().copied().zip(series.values.iter().copied()));
        }
        DemandTable {
            window: self.window,
            ..DemandTable::from_series(
                pooled
                    .into_iter()
                    .map(|(category, points)| DemandSeries::from_points(category, points)),
            )
        }
    }
}

/// Counters describing what the aggregator dropped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationStats {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub non_positive_quantity: usize,
    pub unparseable_date: usize,
    pub missing_sku: usize,
    pub outside_window: usize,
}

impl AggregationStats {
    /// Rows dropped for any reason
    pub fn dropped(&self) -> usize {
        self.input_rows - self.kept_rows
    }

    /// One run-level warning per non-zero drop reason
    pub fn warnings(&self) -> Vec<PlanningWarning> {
        let reasons = [
            (self.non_positive_quantity, "non-positive quantity"),
            (self.unparseable_date, "unparseable date"),
            (self.missing_sku, "empty SKU"),
        ];
        reasons
            .iter()
            .filter(|(count, _)| *count > 0)
            .map(|(count, reason)| {
                PlanningWarning::global(
                    WarningKind::InvalidRecord,
                    format!("Dropped {count} shipment rows with {reason}"),
                )
            })
            .collect()
    }
}

/// Output of one aggregation pass
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub table: DemandTable,
    pub stats: AggregationStats,
}

/// Builds clean per-SKU period series from raw shipment rows
#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesAggregator {
    granularity: Granularity,
    history_window_days: u32,
    today: NaiveDate,
}

impl TimeSeriesAggregator {
    /// `today` anchors the trailing window and must be shared by the whole run
    pub fn new(granularity: Granularity, history_window_days: u32, today: NaiveDate) -> Self {
        Self {
            granularity,
            history_window_days,
            today,
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Aggregate shipments into per-SKU series.
    ///
    /// Fails with [`ForecastError::MissingInput`] when there are no rows at
    /// all, or none survive cleaning and the window restriction.
    pub fn aggregate(&self, rows: &[RawShipment]) -> Result<Aggregation> {
        if rows.is_empty() {
            return Err(ForecastError::MissingInput(
                "shipment history is empty".to_string(),
            ));
        }

        let mut stats = AggregationStats {
            input_rows: rows.len(),
            ..AggregationStats::default()
        };
        let window = i64::from(self.history_window_days);
        let mut buckets: BTreeMap<String, Vec<(NaiveDate, f64)>> = BTreeMap::new();

        for row in rows {
            let sku = normalize_sku(&row.sku);
            if sku.is_empty() {
                stats.missing_sku += 1;
                continue;
            }
            if !(row.quantity.is_finite() && row.quantity > 0.0) {
                stats.non_positive_quantity += 1;
                continue;
            }
            let Some(date) = parse_shipment_date(&row.date) else {
                stats.unparseable_date += 1;
                continue;
            };
            let days_ago = (self.today - date).num_days();
            if !(0..=window).contains(&days_ago) {
                stats.outside_window += 1;
                continue;
            }

            stats.kept_rows += 1;
            buckets
                .entry(sku)
                .or_default()
                .push((self.granularity.period_start(date), row.quantity));
        }

        if buckets.is_empty() {
            return Err(ForecastError::MissingInput(format!(
                "no shipment history within the {}-day window ending {}",
                self.history_window_days, self.today
            )));
        }

        let table = DemandTable::from_series(
            buckets
                .into_iter()
                .map(|(sku, points)| DemandSeries::from_points(sku, points)),
        )
        .with_window(self.today - chrono::Duration::days(window), self.today);

        tracing::info!(
            skus = table.len(),
            kept = stats.kept_rows,
            dropped = stats.dropped(),
            granularity = %self.granularity,
            "aggregated shipment history"
        );

        Ok(Aggregation { table, stats })
    }
}

/// One row of the SKU to category map
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub sku: String,
    pub category: String,
}

/// SKU to category lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryMap {
    categories: BTreeMap<String, String>,
}

impl CategoryMap {
    /// Build the map, keeping the first occurrence of a repeated SKU
    pub fn from_records<I>(records: I) -> (Self, Vec<PlanningWarning>)
    where
        I: IntoIterator<Item = CategoryRecord>,
    {
        let mut categories = BTreeMap::new();
        let mut duplicates = BTreeSet::new();

        for record in records {
            let sku = normalize_sku(&record.sku);
            let category = record.category.trim();
            if sku.is_empty() || category.is_empty() {
                continue;
            }
            if categories.contains_key(&sku) {
                duplicates.insert(sku);
                continue;
            }
            categories.insert(sku, category.to_string());
        }

        let warnings = duplicates
            .into_iter()
            .map(|sku| {
                tracing::warn!(sku = %sku, "duplicate category mapping, keeping the first");
                PlanningWarning::for_sku(
                    sku,
                    WarningKind::DuplicateKey,
                    "Duplicate category mapping; first occurrence kept",
                )
            })
            .collect();

        (Self { categories }, warnings)
    }

    /// Category of `sku`, or [`UNCATEGORIZED`]
    pub fn category_of(&self, sku: &str) -> &str {
        self.categories
            .get(&normalize_sku(sku))
            .map(String::as_str)
            .unwrap_or(UNCATEGORIZED)
    }

    pub fn contains(&self, sku: &str) -> bool {
        self.categories.contains_key(&normalize_sku(sku))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Warnings for every SKU that falls back to [`UNCATEGORIZED`]
    pub fn missing_warnings<'a, I>(&self, skus: I) -> Vec<PlanningWarning>
    where
        I: IntoIterator<Item = &'a str>,
    {
        skus.into_iter()
            .filter(|sku| !self.contains(sku))
            .map(|sku| {
                PlanningWarning::for_sku(
                    sku,
                    WarningKind::MissingCategory,
                    format!("No category mapping; using \"{UNCATEGORIZED}\""),
                )
            })
            .collect()
    }
}

/// Data loader for canonical `sku,date,quantity` shipment frames
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load shipment rows from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Vec<RawShipment>> {
        let file = File::open(path)?;
        // Keep SKUs and dates as text so leading zeros and both date formats survive
        let text_columns = Schema::from_iter([
            Field::new("sku", DataType::Utf8),
            Field::new("date", DataType::Utf8),
        ]);
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .with_dtypes(Some(Arc::new(text_columns)))
            .finish()?;

        Self::from_dataframe(&df)
    }

    /// Convert an existing DataFrame into shipment rows
    pub fn from_dataframe(df: &DataFrame) -> Result<Vec<RawShipment>> {
        let names = df.get_column_names();
        for required in SHIPMENT_COLUMNS {
            if !names.contains(&required) {
                return Err(ForecastError::MissingInput(format!(
                    "shipment table has no `{required}` column"
                )));
            }
        }

        let skus = df.column("sku")?.cast(&DataType::Utf8)?;
        let dates = df.column("date")?.cast(&DataType::Utf8)?;
        let quantities = df.column("quantity")?.cast(&DataType::Float64)?;

        let rows = skus
            .utf8()?
            .into_iter()
            .zip(dates.utf8()?.into_iter())
            .zip(quantities.f64()?.into_iter())
            .map(|((sku, date), quantity)| RawShipment {
                sku: sku.unwrap_or_default().to_string(),
                date: date.unwrap_or_default().to_string(),
                // Nulls are dropped later as non-positive
                quantity: quantity.unwrap_or(0.0),
            })
            .collect();

        Ok(rows)
    }
}
