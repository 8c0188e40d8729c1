//! Two-tier monthly seasonality
//!
//! High-volume SKUs with enough history get an individual profile. Every other
//! SKU borrows the profile of its category, built from the pooled demand of all
//! SKUs in that category.

use crate::config::SeasonalityConfig;
use crate::data::{CategoryMap, DemandSeries, DemandTable};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Share of a calendar month the history window must cover for that month's
/// total to enter a profile
pub const MIN_MONTH_COVERAGE: f64 = 0.5;

fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next - Duration::days(1)))
}

/// Scale monthly totals from a window that clips the edge months.
///
/// A partly covered month is scaled to a full-month equivalent by its
/// covered days; months covered less than [`MIN_MONTH_COVERAGE`] are dropped.
fn full_month_totals(
    totals: &BTreeMap<(i32, u32), f64>,
    (start, end): (NaiveDate, NaiveDate),
) -> BTreeMap<(i32, u32), f64> {
    totals
        .iter()
        .filter_map(|(&(year, month), &total)| {
            let (first, last) = month_bounds(year, month)?;
            let days_in_month = (last - first).num_days() + 1;
            let covered = (last.min(end) - first.max(start)).num_days() + 1;
            let coverage = covered as f64 / days_in_month as f64;
            (coverage >= MIN_MONTH_COVERAGE).then(|| ((year, month), total / coverage.min(1.0)))
        })
        .collect()
}

/// Monthly seasonal indices, one per calendar month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeasonalProfile {
    indices: [f64; 12],
    populated: [bool; 12],
}

impl SeasonalProfile {
    /// Build a profile from demand totals keyed by (year, month).
    ///
    /// Each month's index is its average across observed years divided by the
    /// mean of all observed month averages. Returns `None` when there is no
    /// positive demand to normalise against.
    pub fn from_monthly_totals(totals: &BTreeMap<(i32, u32), f64>) -> Option<Self> {
        let mut sums = [0.0; 12];
        let mut years = [0usize; 12];
        for (&(_, month), &total) in totals {
            if !(1..=12).contains(&month) {
                continue;
            }
            let slot = month as usize - 1;
            sums[slot] += total;
            years[slot] += 1;
        }

        let averages: Vec<(usize, f64)> = (0..12)
            .filter(|&m| years[m] > 0)
            .map(|m| (m, sums[m] / years[m] as f64))
            .collect();
        if averages.is_empty() {
            return None;
        }
        let overall = averages.iter().map(|(_, avg)| avg).sum::<f64>() / averages.len() as f64;
        if overall <= 0.0 {
            return None;
        }

        let mut profile = SeasonalProfile {
            indices: [1.0; 12],
            populated: [false; 12],
        };
        for (m, avg) in averages {
            profile.indices[m] = avg / overall;
            profile.populated[m] = true;
        }
        Some(profile)
    }

    /// Profile of one series
    pub fn from_series(series: &DemandSeries) -> Option<Self> {
        Self::from_monthly_totals(&series.monthly_totals())
    }

    /// Profile of one series drawn from `window`, correcting the clipped
    /// edge months of that window
    pub fn from_series_within(
        series: &DemandSeries,
        window: Option<(NaiveDate, NaiveDate)>,
    ) -> Option<Self> {
        match window {
            Some(window) => {
                Self::from_monthly_totals(&full_month_totals(&series.monthly_totals(), window))
            }
            None => Self::from_series(series),
        }
    }

    /// Index for `month` (1-12); unobserved and out-of-range months are 1.0
    pub fn index(&self, month: u32) -> f64 {
        match month {
            1..=12 => self.indices[month as usize - 1],
            _ => 1.0,
        }
    }

    /// Number of calendar months with observed demand
    pub fn populated_months(&self) -> usize {
        self.populated.iter().filter(|&&p| p).count()
    }

    /// Mean index over the observed months
    pub fn average_populated_index(&self) -> f64 {
        let populated: Vec<f64> = (0..12)
            .filter(|&m| self.populated[m])
            .map(|m| self.indices[m])
            .collect();
        if populated.is_empty() {
            return 1.0;
        }
        populated.iter().sum::<f64>() / populated.len() as f64
    }
}

/// Which profile a SKU resolves through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityTier {
    Individual,
    Category,
}

impl fmt::Display for SeasonalityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonalityTier::Individual => write!(f, "individual"),
            SeasonalityTier::Category => write!(f, "category"),
        }
    }
}

/// Seasonal profiles for every SKU of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeasonalityModel {
    tiers: BTreeMap<String, SeasonalityTier>,
    individual: BTreeMap<String, SeasonalProfile>,
    categories: BTreeMap<String, SeasonalProfile>,
    sku_categories: BTreeMap<String, String>,
}

impl SeasonalityModel {
    /// Build the model from the full SKU pool.
    pub fn build(table: &DemandTable, categories: &CategoryMap, config: &SeasonalityConfig) -> Self {
        let mut ranked: Vec<(&str, f64)> = table.iter().map(|s| (s.sku(), s.total())).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        let candidates = (config.top_volume_fraction * ranked.len() as f64).ceil() as usize;

        let mut individual = BTreeMap::new();
        for &(sku, _) in ranked.iter().take(candidates) {
            let Some(series) = table.get(sku) else {
                continue;
            };
            if series.monthly_totals().len() < config.min_months {
                continue;
            }
            if let Some(profile) = SeasonalProfile::from_series_within(series, table.window()) {
                individual.insert(sku.to_string(), profile);
            }
        }

        let pooled = table.by_category(categories);
        let category_profiles: BTreeMap<String, SeasonalProfile> = pooled
            .iter()
            .filter_map(|series| {
                SeasonalProfile::from_series_within(series, pooled.window())
                    .map(|p| (series.sku().to_string(), p))
            })
            .collect();

        let mut tiers = BTreeMap::new();
        let mut sku_categories = BTreeMap::new();
        for sku in table.skus() {
            let tier = if individual.contains_key(sku) {
                SeasonalityTier::Individual
            } else {
                SeasonalityTier::Category
            };
            tiers.insert(sku.to_string(), tier);
            sku_categories.insert(sku.to_string(), categories.category_of(sku).to_string());
        }

        tracing::info!(
            individual = individual.len(),
            categories = category_profiles.len(),
            skus = tiers.len(),
            "built seasonality model"
        );

        Self {
            tiers,
            individual,
            categories: category_profiles,
            sku_categories,
        }
    }

    /// Tier assigned to `sku`, `None` for SKUs the model never saw
    pub fn tier(&self, sku: &str) -> Option<SeasonalityTier> {
        self.tiers.get(sku).copied()
    }

    pub fn category(&self, sku: &str) -> Option<&str> {
        self.sku_categories.get(sku).map(String::as_str)
    }

    pub fn individual_profile(&self, sku: &str) -> Option<&SeasonalProfile> {
        self.individual.get(sku)
    }

    pub fn category_profile(&self, category: &str) -> Option<&SeasonalProfile> {
        self.categories.get(category)
    }

    /// Number of SKUs with their own profile
    pub fn individual_count(&self) -> usize {
        self.individual.len()
    }

    /// Index for `sku` in `month`, resolved through the SKU's tier
    pub fn seasonal_index(&self, sku: &str, month: u32) -> f64 {
        let profile = match self.tier(sku) {
            Some(SeasonalityTier::Individual) => self.individual.get(sku),
            Some(SeasonalityTier::Category) => self
                .category(sku)
                .and_then(|category| self.categories.get(category)),
            None => None,
        };
        profile.map_or(1.0, |p| p.index(month))
    }

    /// Mean index over the calendar months touched by `(start, start + horizon_days]`
    pub fn horizon_index(&self, sku: &str, start: NaiveDate, horizon_days: u32) -> f64 {
        let months = horizon_months(start, horizon_days);
        if months.is_empty() {
            return 1.0;
        }
        months
            .iter()
            .map(|&month| self.seasonal_index(sku, month))
            .sum::<f64>()
            / months.len() as f64
    }
}

/// Calendar months (1-12) covered by the horizon, in order, without repeats
fn horizon_months(start: NaiveDate, horizon_days: u32) -> Vec<u32> {
    let mut months: Vec<(i32, u32)> = Vec::new();
    for offset in 1..=i64::from(horizon_days) {
        let day = start + Duration::days(offset);
        let key = (day.year(), day.month());
        if months.last() != Some(&key) {
            months.push(key);
        }
    }
    months.into_iter().map(|(_, month)| month).collect()
}
