//! Supply-side tables and their joins
//!
//! Inventory, open purchase orders, backorders, SKU master data and
//! purchase-order lead-time history are all keyed by [`normalize_sku`], so
//! `" ab  12 "` in one export joins `"AB 12"` in another.

use chrono::NaiveDate;
pub use demand_forecast::normalize_sku;
use demand_forecast::{parse_shipment_date, PlanningWarning, WarningKind};
use demand_math::median;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Vendor reported when neither PO history nor master data names one
pub const UNKNOWN_VENDOR: &str = "Unknown";

const INTERNATIONAL_SUFFIX: &str = " (International)";
const MAX_LEAD_TIME_DAYS: i64 = 365;

/// Stock position for one SKU at one location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub sku: String,
    pub on_hand_qty: f64,
    #[serde(default)]
    pub in_transit_qty: f64,
    #[serde(default)]
    pub unit_cost: f64,
}

impl InventoryRecord {
    pub fn new(sku: impl Into<String>, on_hand_qty: f64, in_transit_qty: f64, unit_cost: f64) -> Self {
        Self {
            sku: sku.into(),
            on_hand_qty,
            in_transit_qty,
            unit_cost,
        }
    }
}

/// Open quantity on a purchase order, domestic and international pre-merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPoRecord {
    pub sku: String,
    pub open_qty: f64,
    #[serde(default)]
    pub vendor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackorderRecord {
    pub sku: String,
    pub backorder_qty: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkuMasterRecord {
    pub sku: String,
    #[serde(default)]
    pub vendor: Option<String>,
    #[serde(default)]
    pub product_name: Option<String>,
}

/// One historical purchase order line with its order and receipt dates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadTimeRecord {
    pub sku: String,
    #[serde(default)]
    pub vendor: Option<String>,
    pub order_date: String,
    pub receipt_date: String,
    #[serde(default)]
    pub international: bool,
}

impl LeadTimeRecord {
    /// Days between order and receipt, when both dates parse and the gap is
    /// within 1..=365 days
    pub fn lead_time_days(&self) -> Option<f64> {
        let ordered: NaiveDate = parse_shipment_date(&self.order_date)?;
        let received: NaiveDate = parse_shipment_date(&self.receipt_date)?;
        let days = (received - ordered).num_days();
        (1..=MAX_LEAD_TIME_DAYS)
            .contains(&days)
            .then_some(days as f64)
    }

    fn vendor_name(&self) -> Option<&str> {
        non_blank(self.vendor.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A real vendor name: not blank and not the [`UNKNOWN_VENDOR`] placeholder
fn named_vendor(value: &str) -> Option<&str> {
    non_blank(Some(value)).filter(|v| !v.eq_ignore_ascii_case(UNKNOWN_VENDOR))
}

/// Every supply table a planning run may receive; any of them may be empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupplyTables {
    pub inventory: Vec<InventoryRecord>,
    pub open_pos: Vec<OpenPoRecord>,
    pub backorders: Vec<BackorderRecord>,
    pub sku_master: Vec<SkuMasterRecord>,
    pub lead_times: Vec<LeadTimeRecord>,
}

/// Where a SKU's lead time came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadTimeSource {
    Sku,
    Vendor,
    VendorInternational,
    Default,
}

impl fmt::Display for LeadTimeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeadTimeSource::Sku => write!(f, "sku"),
            LeadTimeSource::Vendor => write!(f, "vendor"),
            LeadTimeSource::VendorInternational => write!(f, "vendor_international"),
            LeadTimeSource::Default => write!(f, "default"),
        }
    }
}

/// Median lead times per SKU and per vendor
///
/// International vendors are keyed `"{vendor} (International)"`. International
/// SKU medians only fill SKUs with no domestic history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadTimeTable {
    by_sku: BTreeMap<String, f64>,
    by_vendor: BTreeMap<String, f64>,
}

fn medians(groups: BTreeMap<String, Vec<f64>>) -> BTreeMap<String, f64> {
    groups
        .into_iter()
        .filter_map(|(key, days)| median(&days).map(|m| (key, m)))
        .collect()
}

impl LeadTimeTable {
    /// Build medians from PO history, returning the number of rows skipped
    /// for unparseable dates or out-of-range lead times
    pub fn from_records(records: &[LeadTimeRecord]) -> (Self, usize) {
        let mut domestic_sku: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut international_sku: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut vendor: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        let mut skipped = 0;

        for record in records {
            let Some(days) = record.lead_time_days() else {
                skipped += 1;
                continue;
            };
            let sku = normalize_sku(&record.sku);
            let sku_groups = if record.international {
                &mut international_sku
            } else {
                &mut domestic_sku
            };
            if !sku.is_empty() {
                sku_groups.entry(sku).or_default().push(days);
            }
            if let Some(name) = record.vendor_name().and_then(named_vendor) {
                let key = if record.international {
                    format!("{name}{INTERNATIONAL_SUFFIX}")
                } else {
                    name.to_string()
                };
                vendor.entry(key).or_default().push(days);
            }
        }

        let mut by_sku = medians(domestic_sku);
        for (sku, days) in medians(international_sku) {
            by_sku.entry(sku).or_insert(days);
        }

        let table = Self {
            by_sku,
            by_vendor: medians(vendor),
        };
        tracing::debug!(
            skus = table.by_sku.len(),
            vendors = table.by_vendor.len(),
            skipped,
            "built lead time table"
        );
        (table, skipped)
    }

    pub fn sku_lead_time(&self, sku: &str) -> Option<f64> {
        self.by_sku.get(&normalize_sku(sku)).copied()
    }

    pub fn vendor_lead_time(&self, vendor: &str) -> Option<f64> {
        self.by_vendor.get(named_vendor(vendor)?).copied()
    }

    /// Resolve SKU, then vendor, then international vendor, then `default`.
    ///
    /// The vendor steps are skipped for the [`UNKNOWN_VENDOR`] placeholder.
    pub fn resolve(&self, sku: &str, vendor: &str, default: f64) -> (f64, LeadTimeSource) {
        if let Some(days) = self.sku_lead_time(sku) {
            return (days, LeadTimeSource::Sku);
        }
        if let Some(name) = named_vendor(vendor) {
            if let Some(days) = self.vendor_lead_time(name) {
                return (days, LeadTimeSource::Vendor);
            }
            let international = format!("{name}{INTERNATIONAL_SUFFIX}");
            if let Some(days) = self.by_vendor.get(&international) {
                return (*days, LeadTimeSource::VendorInternational);
            }
        }
        (default, LeadTimeSource::Default)
    }

    pub fn is_empty(&self) -> bool {
        self.by_sku.is_empty() && self.by_vendor.is_empty()
    }
}

/// Joined supply quantities for one SKU
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SkuSupply {
    pub on_hand_qty: f64,
    pub in_transit_qty: f64,
    pub open_po_qty: f64,
    pub backorder_qty: f64,
    pub unit_cost: f64,
}

impl SkuSupply {
    pub fn available_supply(&self) -> f64 {
        self.on_hand_qty + self.in_transit_qty + self.open_po_qty
    }
}

/// All supply tables joined by normalized SKU
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SupplyIndex {
    supply: BTreeMap<String, SkuSupply>,
    vendors: BTreeMap<String, String>,
    product_names: BTreeMap<String, String>,
    lead_times: LeadTimeTable,
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl SupplyIndex {
    /// Join the tables. Quantities for repeated SKUs are summed across rows;
    /// the first positive unit cost and the first master row win.
    pub fn build(tables: &SupplyTables) -> (Self, Vec<PlanningWarning>) {
        let mut index = Self::default();
        let mut warnings = Vec::new();
        let mut blank_keys = 0;

        for row in &tables.inventory {
            let sku = normalize_sku(&row.sku);
            if sku.is_empty() {
                blank_keys += 1;
                continue;
            }
            let entry = index.supply.entry(sku).or_default();
            entry.on_hand_qty += finite(row.on_hand_qty);
            entry.in_transit_qty += finite(row.in_transit_qty);
            if entry.unit_cost <= 0.0 && row.unit_cost > 0.0 {
                entry.unit_cost = finite(row.unit_cost);
            }
        }

        for row in &tables.open_pos {
            let sku = normalize_sku(&row.sku);
            if sku.is_empty() {
                blank_keys += 1;
                continue;
            }
            if let Some(vendor) = non_blank(row.vendor.as_deref()) {
                index
                    .vendors
                    .entry(sku.clone())
                    .or_insert_with(|| vendor.to_string());
            }
            index.supply.entry(sku).or_default().open_po_qty += finite(row.open_qty).max(0.0);
        }

        for row in &tables.backorders {
            let sku = normalize_sku(&row.sku);
            if sku.is_empty() {
                blank_keys += 1;
                continue;
            }
            index.supply.entry(sku).or_default().backorder_qty +=
                finite(row.backorder_qty).max(0.0);
        }

        for row in &tables.lead_times {
            if let Some(vendor) = row.vendor_name() {
                let sku = normalize_sku(&row.sku);
                if !sku.is_empty() {
                    index.vendors.entry(sku).or_insert_with(|| vendor.to_string());
                }
            }
        }

        let mut seen_master = BTreeSet::new();
        let mut duplicate_master = BTreeSet::new();
        for row in &tables.sku_master {
            let sku = normalize_sku(&row.sku);
            if sku.is_empty() {
                blank_keys += 1;
                continue;
            }
            if !seen_master.insert(sku.clone()) {
                duplicate_master.insert(sku);
                continue;
            }
            if let Some(vendor) = non_blank(row.vendor.as_deref()) {
                index
                    .vendors
                    .entry(sku.clone())
                    .or_insert_with(|| vendor.to_string());
            }
            if let Some(name) = non_blank(row.product_name.as_deref()) {
                index.product_names.insert(sku, name.to_string());
            }
        }
        for sku in duplicate_master {
            tracing::warn!(sku = %sku, "duplicate SKU master row, keeping the first");
            warnings.push(PlanningWarning::for_sku(
                sku,
                WarningKind::DuplicateKey,
                "Duplicate SKU master row; first occurrence kept",
            ));
        }

        let (lead_times, skipped) = LeadTimeTable::from_records(&tables.lead_times);
        index.lead_times = lead_times;
        if skipped > 0 {
            tracing::warn!(skipped, "lead time rows skipped");
            warnings.push(PlanningWarning::global(
                WarningKind::InvalidRecord,
                format!(
                    "{skipped} lead time rows skipped for unparseable dates or lead times outside 1-{MAX_LEAD_TIME_DAYS} days"
                ),
            ));
        }
        if blank_keys > 0 {
            warnings.push(PlanningWarning::global(
                WarningKind::InvalidRecord,
                format!("{blank_keys} supply rows skipped for a blank SKU"),
            ));
        }

        tracing::info!(
            skus = index.supply.len(),
            vendors = index.vendors.len(),
            "joined supply tables"
        );
        (index, warnings)
    }

    /// Supply for `sku`, zero everywhere when no table mentions it
    pub fn supply(&self, sku: &str) -> SkuSupply {
        self.supply
            .get(&normalize_sku(sku))
            .copied()
            .unwrap_or_default()
    }

    pub fn vendor(&self, sku: &str) -> &str {
        self.vendors
            .get(&normalize_sku(sku))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_VENDOR)
    }

    pub fn product_name(&self, sku: &str) -> Option<&str> {
        self.product_names
            .get(&normalize_sku(sku))
            .map(String::as_str)
    }

    /// Lead time for `sku` through the cascade, ending at `default`
    pub fn lead_time(&self, sku: &str, default: f64) -> (f64, LeadTimeSource) {
        self.lead_times.resolve(sku, self.vendor(sku), default)
    }

    pub fn lead_times(&self) -> &LeadTimeTable {
        &self.lead_times
    }

    /// Number of SKUs carrying any supply quantity
    pub fn len(&self) -> usize {
        self.supply.len()
    }

    pub fn is_empty(&self) -> bool {
        self.supply.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lead(sku: &str, vendor: &str, order: &str, receipt: &str, international: bool) -> LeadTimeRecord {
        LeadTimeRecord {
            sku: sku.to_string(),
            vendor: Some(vendor.to_string()),
            order_date: order.to_string(),
            receipt_date: receipt.to_string(),
            international,
        }
    }

    #[test]
    fn test_lead_time_days_range() {
        assert_eq!(
            lead("A", "V", "2024-01-01", "2024-01-31", false).lead_time_days(),
            Some(30.0)
        );
        assert_eq!(lead("A", "V", "2024-01-01", "2024-01-01", false).lead_time_days(), None);
        assert_eq!(lead("A", "V", "2024-01-01", "2023-12-01", false).lead_time_days(), None);
        assert_eq!(lead("A", "V", "2020-01-01", "2024-01-01", false).lead_time_days(), None);
        assert_eq!(lead("A", "V", "soon", "2024-01-01", false).lead_time_days(), None);
    }

    #[test]
    fn test_lead_time_cascade() {
        let records = vec![
            lead("A", "Acme", "2024-01-01", "2024-01-21", false),
            lead("A", "Acme", "2024-02-01", "2024-03-02", false),
            lead("A", "Acme", "2024-03-01", "2024-04-10", false),
            lead("B", "Acme", "2024-01-01", "2024-03-01", true),
            lead("C", "Overseas", "2024-01-01", "2024-04-10", true),
            lead("A", "Acme", "2024-01-01", "2024-12-31", true),
            lead("Z", "Acme", "bad", "2024-01-01", false),
        ];
        let (table, skipped) = LeadTimeTable::from_records(&records);
        assert_eq!(skipped, 1);

        // Domestic median for A wins over its international row
        assert_eq!(table.resolve("a", "Acme", 73.0), (30.0, LeadTimeSource::Sku));
        // International SKU history fills SKUs without domestic rows
        assert_eq!(table.resolve("B", "Acme", 73.0), (60.0, LeadTimeSource::Sku));
        assert_eq!(table.resolve("D", "Acme", 73.0), (30.0, LeadTimeSource::Vendor));
        assert_eq!(
            table.resolve("E", "Overseas", 73.0),
            (100.0, LeadTimeSource::VendorInternational)
        );
        assert_eq!(table.resolve("F", "Nobody", 73.0), (73.0, LeadTimeSource::Default));
    }

    #[test]
    fn test_placeholder_vendor_has_no_vendor_lead_time() {
        let records = vec![
            lead("Q", UNKNOWN_VENDOR, "2024-01-01", "2024-01-11", false),
            lead("R", "unknown", "2024-01-01", "2024-01-11", true),
        ];
        let (table, _) = LeadTimeTable::from_records(&records);

        // SKU history still counts
        assert_eq!(table.resolve("Q", UNKNOWN_VENDOR, 73.0), (10.0, LeadTimeSource::Sku));
        assert_eq!(table.vendor_lead_time(UNKNOWN_VENDOR), None);
        assert_eq!(table.resolve("F", UNKNOWN_VENDOR, 73.0), (73.0, LeadTimeSource::Default));
        assert_eq!(table.resolve("F", "  ", 73.0), (73.0, LeadTimeSource::Default));
    }

    #[test]
    fn test_supply_join() {
        let tables = SupplyTables {
            inventory: vec![
                InventoryRecord::new("ab 1", 60.0, 5.0, 0.0),
                InventoryRecord::new("AB  1", 40.0, 0.0, 3.5),
            ],
            open_pos: vec![
                OpenPoRecord {
                    sku: "AB 1".to_string(),
                    open_qty: 20.0,
                    vendor: Some("Acme".to_string()),
                },
                OpenPoRecord {
                    sku: "ab 1".to_string(),
                    open_qty: 10.0,
                    vendor: None,
                },
            ],
            backorders: vec![BackorderRecord {
                sku: " ab 1".to_string(),
                backorder_qty: 7.0,
            }],
            sku_master: vec![
                SkuMasterRecord {
                    sku: "AB 1".to_string(),
                    vendor: Some("Other".to_string()),
                    product_name: Some("Widget".to_string()),
                },
                SkuMasterRecord {
                    sku: "CD".to_string(),
                    vendor: Some("Bolt Co".to_string()),
                    product_name: None,
                },
                SkuMasterRecord {
                    sku: "cd".to_string(),
                    vendor: Some("Ignored".to_string()),
                    product_name: None,
                },
            ],
            lead_times: vec![],
        };
        let (index, warnings) = SupplyIndex::build(&tables);

        let supply = index.supply("AB 1");
        assert_eq!(
            supply,
            SkuSupply {
                on_hand_qty: 100.0,
                in_transit_qty: 5.0,
                open_po_qty: 30.0,
                backorder_qty: 7.0,
                unit_cost: 3.5,
            }
        );
        assert_eq!(supply.available_supply(), 135.0);

        // PO vendor outranks master data
        assert_eq!(index.vendor("ab 1"), "Acme");
        assert_eq!(index.vendor("CD"), "Bolt Co");
        assert_eq!(index.vendor("missing"), UNKNOWN_VENDOR);
        assert_eq!(index.product_name("AB 1"), Some("Widget"));
        assert_eq!(index.supply("missing"), SkuSupply::default());

        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::DuplicateKey);
        assert_eq!(warnings[0].sku.as_deref(), Some("CD"));
    }
}
