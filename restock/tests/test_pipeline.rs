use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{Duration, NaiveDate};
use demand_forecast::{RawShipment, SnapshotRow, WarningKind};
use pretty_assertions::assert_eq;
use replenishment::{InventoryRecord, LeadTimeSource, ReplenishmentRecord, SupplyTables};
use restock::{io, PlanningConfig, PlanningInputs, PlanningRun};
use tempfile::TempDir;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn shipments_csv() -> String {
    let mut csv = String::from("sku,date,quantity\n");
    for d in 1..=120 {
        let date = (today() - Duration::days(d)).format("%Y-%m-%d");
        writeln!(csv, "FAST,{date},{}", 12 + d % 3).unwrap();
        writeln!(csv, "SLOW,{date},{}", 1 + d % 2).unwrap();
    }
    csv.push_str("BAD,not a date,5\n");
    csv
}

fn load_inputs(dir: &Path) -> PlanningInputs {
    let shipments = write_file(dir, "shipments.csv", &shipments_csv());
    let categories = write_file(dir, "categories.csv", "sku,category\nFAST,Tools\nSLOW,Tools\n");
    let inventory = write_file(
        dir,
        "inventory.csv",
        "sku,on_hand_qty,in_transit_qty,unit_cost\nfast,20,0,3.0\nSLOW,10000,0,1.0\n",
    );
    let lead_times = write_file(
        dir,
        "lead_times.csv",
        "sku,vendor,order_date,receipt_date,international\nFAST,Acme,2024-01-01,2024-01-31,false\n",
    );

    PlanningInputs {
        shipments: io::read_shipments(&shipments).unwrap(),
        categories: io::read_table(&categories).unwrap(),
        supply: SupplyTables {
            inventory: io::read_table(&inventory).unwrap(),
            lead_times: io::read_table(&lead_times).unwrap(),
            ..SupplyTables::default()
        },
    }
}

#[test]
fn test_plan_run_writes_every_table() {
    let dir = TempDir::new().unwrap();
    let inputs = load_inputs(dir.path());
    assert_eq!(inputs.shipments.len(), 241);

    let run = PlanningRun::new(PlanningConfig::default(), today());
    let output = run.execute(&inputs).unwrap();

    assert_eq!(output.forecast.forecasts.len(), 2);
    assert!(output
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::InvalidRecord && w.sku.is_none()));
    assert!(!output.warnings.iter().any(|w| w.kind == WarningKind::MissingCategory));

    let out = dir.path().join("plan");
    let written = io::write_outputs(&out, &output).unwrap();
    assert_eq!(written.len(), 5);
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }

    let plan: Vec<ReplenishmentRecord> = io::read_table(&out.join(io::REPLENISHMENT_FILE)).unwrap();
    assert_eq!(plan.len(), 1);
    let fast = &plan[0];
    assert_eq!(fast.sku, "FAST");
    assert_eq!(fast.vendor, "Acme");
    assert_eq!(fast.lead_time_days, 30.0);
    assert_eq!(fast.lead_time_source, LeadTimeSource::Sku);
    assert_eq!(fast.available_supply, 20.0);
    assert!(fast.suggested_order_qty > 0.0);
    assert_eq!(fast.order_value, fast.suggested_order_qty * 3.0);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join(io::SUMMARY_FILE)).unwrap()).unwrap();
    assert_eq!(summary["today"], "2024-06-30");
    assert_eq!(summary["service_level"], 95);
    assert_eq!(summary["replenishment"]["skus_to_order"], 1);
    assert_eq!(summary["forecast"]["total_skus_forecasted"], 2);
    assert_eq!(summary["shipments"]["unparseable_date"], 1);
}

#[test]
fn test_sku_case_variants_plan_as_one_item() {
    let mut shipments = Vec::new();
    for d in 1..=120 {
        let date = (today() - Duration::days(d)).format("%Y-%m-%d").to_string();
        shipments.push(RawShipment::new("widget", date.clone(), 5.0));
        shipments.push(RawShipment::new("WIDGET", date, 5.0));
    }
    let inputs = PlanningInputs {
        shipments,
        supply: SupplyTables {
            inventory: vec![InventoryRecord::new("Widget", 600.0, 0.0, 2.0)],
            ..SupplyTables::default()
        },
        ..PlanningInputs::default()
    };

    let output = PlanningRun::new(PlanningConfig::default(), today())
        .execute(&inputs)
        .unwrap();

    assert_eq!(output.forecast.forecasts.len(), 1);
    assert_eq!(output.forecast.forecasts[0].sku, "WIDGET");
    assert_eq!(output.plan.evaluated_skus, 1);

    // 10/day over the 73-day default lead time needs 730 against 600 on hand
    assert_eq!(output.plan.records.len(), 1);
    let widget = &output.plan.records[0];
    assert!((widget.daily_demand - 10.0).abs() < 1e-9);
    assert_eq!(widget.reorder_point, 730.0);
    assert_eq!(widget.available_supply, 600.0);
    assert_eq!(widget.suggested_order_qty, 270.0);
}

#[test]
fn test_forecast_only_run_without_supply_tables() {
    let dir = TempDir::new().unwrap();
    let shipments = write_file(dir.path(), "shipments.csv", &shipments_csv());
    let inputs = PlanningInputs {
        shipments: io::read_shipments(&shipments).unwrap(),
        ..PlanningInputs::default()
    };

    let run = PlanningRun::new(PlanningConfig::default(), today());
    let output = run.execute(&inputs).unwrap();

    assert_eq!(output.forecast.forecasts.len(), 2);
    // Without inventory every SKU with demand sits below its reorder point
    assert_eq!(output.plan.records.len(), 2);
    assert!(output.plan.records.iter().all(|r| r.vendor == "Unknown"));
    assert!(output
        .warnings
        .iter()
        .any(|w| w.kind == WarningKind::MissingCategory && w.sku.is_none()));
}

#[test]
fn test_forecast_snapshot_compared_after_horizon() {
    let dir = TempDir::new().unwrap();
    let inputs = load_inputs(dir.path());
    let output = PlanningRun::new(PlanningConfig::default(), today())
        .execute(&inputs)
        .unwrap();
    let out = dir.path().join("plan");
    io::write_outputs(&out, &output).unwrap();

    let snapshots: Vec<SnapshotRow> = io::read_table(&out.join(io::FORECAST_FILE)).unwrap();
    assert_eq!(snapshots.len(), 2);
    assert_eq!(snapshots[0].snapshot_date, today());
    assert_eq!(snapshots[0].category.as_deref(), Some("Tools"));

    let actuals: Vec<RawShipment> = (1..=90)
        .map(|d| {
            let date = (today() + Duration::days(d)).format("%Y-%m-%d").to_string();
            RawShipment::new("FAST", date, 13.0)
        })
        .collect();

    // Horizon not yet over
    let early = PlanningRun::new(PlanningConfig::default(), today() + Duration::days(30));
    let (rows, bias) = early.compare(&snapshots, &actuals);
    assert!(rows.is_empty());
    assert!(bias.is_none());

    let later = PlanningRun::new(PlanningConfig::default(), today() + Duration::days(120));
    let (rows, bias) = later.compare(&snapshots, &actuals);
    assert_eq!(rows.len(), 2);
    let fast = rows.iter().find(|r| r.sku == "FAST").unwrap();
    assert_eq!(fast.actual_qty, 90.0 * 13.0);
    let slow = rows.iter().find(|r| r.sku == "SLOW").unwrap();
    assert_eq!(slow.actual_qty, 0.0);
    assert_eq!(slow.pct_error, 100.0);
    assert_eq!(bias.unwrap().num_comparisons, 2);

    io::write_table(&dir.path().join("comparison.csv"), &rows).unwrap();
}
