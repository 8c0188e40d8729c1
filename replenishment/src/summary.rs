//! Roll-ups over a replenishment plan

use crate::planner::ReplenishmentRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Order totals for one vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorSummary {
    pub vendor: String,
    pub sku_count: usize,
    pub total_units: f64,
    pub total_value: f64,
    pub backorder_units: f64,
    pub avg_priority: f64,
}

impl VendorSummary {
    /// One row per vendor, highest order value first
    pub fn from_records(records: &[ReplenishmentRecord]) -> Vec<Self> {
        let mut by_vendor: BTreeMap<&str, Vec<&ReplenishmentRecord>> = BTreeMap::new();
        for record in records {
            by_vendor.entry(record.vendor.as_str()).or_default().push(record);
        }

        let mut summaries: Vec<Self> = by_vendor
            .into_iter()
            .map(|(vendor, rows)| {
                let priority_total: u32 = rows.iter().map(|r| r.priority_score).sum();
                Self {
                    vendor: vendor.to_string(),
                    sku_count: rows.len(),
                    total_units: rows.iter().map(|r| r.suggested_order_qty).sum(),
                    total_value: rows.iter().map(|r| r.order_value).sum(),
                    backorder_units: rows.iter().map(|r| r.backorder_qty).sum(),
                    avg_priority: f64::from(priority_total) / rows.len() as f64,
                }
            })
            .collect();

        summaries.sort_by(|a, b| {
            b.total_value
                .total_cmp(&a.total_value)
                .then_with(|| a.vendor.cmp(&b.vendor))
        });
        summaries
    }
}

/// Rows at or above `threshold` priority, most urgent first, at most `top_n`
pub fn critical_items(
    records: &[ReplenishmentRecord],
    threshold: u32,
    top_n: usize,
) -> Vec<ReplenishmentRecord> {
    let mut critical: Vec<&ReplenishmentRecord> = records
        .iter()
        .filter(|r| r.priority_score >= threshold)
        .collect();
    critical.sort_by(|a, b| {
        b.priority_score
            .cmp(&a.priority_score)
            .then_with(|| a.days_of_supply.total_cmp(&b.days_of_supply))
            .then_with(|| a.sku.cmp(&b.sku))
    });
    critical.into_iter().take(top_n).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::DemandSource;
    use crate::supply::LeadTimeSource;
    use assert_approx_eq::assert_approx_eq;
    use pretty_assertions::assert_eq;

    fn record(sku: &str, vendor: &str, units: f64, value: f64, priority: u32, days: f64) -> ReplenishmentRecord {
        ReplenishmentRecord {
            sku: sku.to_string(),
            product_name: None,
            vendor: vendor.to_string(),
            daily_demand: 1.0,
            demand_source: DemandSource::Smoothed,
            demand_std: 0.5,
            lead_time_days: 30.0,
            lead_time_source: LeadTimeSource::Default,
            service_level: 95,
            safety_stock: 5.0,
            reorder_point: 35.0,
            order_up_to_level: 49.0,
            on_hand_qty: 0.0,
            in_transit_qty: 0.0,
            open_po_qty: 0.0,
            available_supply: 0.0,
            backorder_qty: if priority > 60 { 3.0 } else { 0.0 },
            days_of_supply: days,
            below_reorder_point: true,
            suggested_order_qty: units,
            unit_cost: 1.0,
            order_value: value,
            priority_score: priority,
        }
    }

    #[test]
    fn test_vendor_summary() {
        let records = vec![
            record("A", "Acme", 10.0, 100.0, 70, 2.0),
            record("B", "Acme", 5.0, 50.0, 40, 20.0),
            record("C", "Bolt", 200.0, 400.0, 20, 45.0),
        ];
        let summaries = VendorSummary::from_records(&records);

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].vendor, "Bolt");
        assert_eq!(summaries[1].sku_count, 2);
        assert_eq!(summaries[1].total_units, 15.0);
        assert_eq!(summaries[1].backorder_units, 3.0);
        assert_approx_eq!(summaries[1].avg_priority, 55.0);
        assert!(VendorSummary::from_records(&[]).is_empty());
    }

    #[test]
    fn test_critical_items() {
        let records = vec![
            record("A", "Acme", 10.0, 100.0, 50, 12.0),
            record("B", "Acme", 5.0, 50.0, 80, 3.0),
            record("C", "Bolt", 200.0, 400.0, 50, 4.0),
            record("D", "Bolt", 1.0, 1.0, 49, 1.0),
        ];
        let critical = critical_items(&records, 50, 10);
        let skus: Vec<&str> = critical.iter().map(|r| r.sku.as_str()).collect();
        assert_eq!(skus, vec!["B", "C", "A"]);

        assert_eq!(critical_items(&records, 50, 1).len(), 1);
    }
}
