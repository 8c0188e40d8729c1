// Runs a full planning pass over generated shipment history
use chrono::{Duration, NaiveDate};
use restock_workspace::demand_forecast::{CategoryRecord, RawShipment};
use restock_workspace::replenishment::{InventoryRecord, OpenPoRecord, SupplyTables};
use restock_workspace::restock::{PlanningConfig, PlanningInputs, PlanningRun};

const SKUS: [(&str, &str, f64); 4] = [
    ("HAMMER-16", "Tools", 14.0),
    ("WRENCH-SET", "Tools", 4.0),
    ("GLOVES-L", "Safety", 25.0),
    ("GOGGLES", "Safety", 0.8),
];

fn generate_shipments(today: NaiveDate, days: i64) -> Vec<RawShipment> {
    let mut rows = Vec::new();
    for (i, (sku, _, base)) in SKUS.iter().enumerate() {
        for d in 1..=days {
            let date = today - Duration::days(d);
            // Weekly cycle plus a slow drift
            let weekly = ((d % 7) as f64 / 7.0 * std::f64::consts::TAU).sin() * 0.3;
            let drift = 1.0 + (d as f64 / days as f64) * 0.2 * (i as f64 - 1.5);
            let mut qty = (base * (1.0 + weekly) * drift).round();
            // Occasional bulk order
            if d % 53 == (i as i64 * 11) % 53 {
                qty *= 8.0;
            }
            if qty > 0.0 {
                rows.push(RawShipment::new(*sku, date.format("%Y-%m-%d").to_string(), qty));
            }
        }
    }
    rows
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let today = NaiveDate::from_ymd_opt(2024, 6, 30).ok_or("invalid date")?;
    let inputs = PlanningInputs {
        shipments: generate_shipments(today, 400),
        categories: SKUS
            .iter()
            .map(|(sku, category, _)| CategoryRecord {
                sku: sku.to_string(),
                category: category.to_string(),
            })
            .collect(),
        supply: SupplyTables {
            inventory: vec![
                InventoryRecord::new("HAMMER-16", 300.0, 50.0, 7.5),
                InventoryRecord::new("WRENCH-SET", 900.0, 0.0, 22.0),
                InventoryRecord::new("GLOVES-L", 120.0, 0.0, 1.2),
                InventoryRecord::new("GOGGLES", 10.0, 0.0, 4.0),
            ],
            open_pos: vec![OpenPoRecord {
                sku: "GLOVES-L".to_string(),
                open_qty: 500.0,
                vendor: Some("SafeCo".to_string()),
            }],
            ..SupplyTables::default()
        },
    };

    let run = PlanningRun::new(PlanningConfig::default(), today);
    let output = run.execute(&inputs)?;

    println!("Forecasts as of {today}");
    println!("======================");
    for f in &output.forecast.forecasts {
        println!(
            "{:<12} {:>7.2}/day  {:>8.0} over {} days  [{}] {}",
            f.sku,
            f.seasonal_daily,
            f.forecast_total_qty,
            f.forecast_horizon_days,
            f.confidence,
            f.demand_pattern
        );
    }

    println!("\nReplenishment plan");
    println!("==================");
    for r in &output.plan.records {
        println!(
            "{:<12} {:<8} ROP {:>6.0}  avail {:>6.0}  order {:>6.0}  priority {:>3}",
            r.sku, r.vendor, r.reorder_point, r.available_supply, r.suggested_order_qty, r.priority_score
        );
    }

    println!("\n{} warnings", output.warnings.len());
    for w in &output.warnings {
        println!("  {w}");
    }
    Ok(())
}
