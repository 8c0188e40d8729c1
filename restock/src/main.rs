use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use demand_forecast::Granularity;
use replenishment::SupplyTables;
use restock::config::{ConfigOverrides, LoadOptions, LogFormat, PlanningConfig};
use restock::{io, PlanningInputs, PlanningRun};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "restock",
    about = "Demand forecasting and replenishment planning",
    after_help = "Examples:\n  restock plan --shipments shipments.csv --inventory inventory.csv --out plan/\n  restock compare --snapshots snapshots.csv --shipments shipments.csv"
)]
struct Cli {
    #[arg(long, global = true, help = "Path to restock.toml")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Run date (YYYY-MM-DD); defaults to the local date")]
    today: Option<NaiveDate>,
    #[arg(long, global = true, help = "Log level: trace|debug|info|warn|error")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Forecast demand and write a replenishment plan")]
    Plan(PlanArgs),
    #[command(about = "Compare elapsed forecast snapshots with actual shipments")]
    Compare(CompareArgs),
}

#[derive(Debug, Args)]
struct PlanArgs {
    #[arg(long, help = "Shipment history CSV (sku,date,quantity)")]
    shipments: PathBuf,
    #[arg(long, help = "SKU to category CSV (sku,category)")]
    categories: Option<PathBuf>,
    #[arg(long, help = "Inventory CSV (sku,on_hand_qty,in_transit_qty,unit_cost)")]
    inventory: Option<PathBuf>,
    #[arg(long, help = "Open PO CSV (sku,open_qty,vendor)")]
    open_pos: Option<PathBuf>,
    #[arg(long, help = "Backorder CSV (sku,backorder_qty)")]
    backorders: Option<PathBuf>,
    #[arg(long, help = "SKU master CSV (sku,vendor,product_name)")]
    sku_master: Option<PathBuf>,
    #[arg(long, help = "PO history CSV (sku,vendor,order_date,receipt_date,international)")]
    lead_times: Option<PathBuf>,
    #[arg(long, help = "Smoothing preset: conservative|balanced|aggressive")]
    preset: Option<String>,
    #[arg(long, help = "Service level percent: 90|95|98|99")]
    service_level: Option<u32>,
    #[arg(long, help = "Period length: daily|weekly|monthly")]
    granularity: Option<Granularity>,
    #[arg(long, help = "Forecast horizon in days")]
    horizon_days: Option<u32>,
    #[arg(long, help = "Output directory")]
    out: PathBuf,
}

#[derive(Debug, Args)]
struct CompareArgs {
    #[arg(long, help = "Forecast snapshot CSV")]
    snapshots: PathBuf,
    #[arg(long, help = "Shipment history CSV (sku,date,quantity)")]
    shipments: PathBuf,
    #[arg(long, help = "Write comparison rows to this CSV")]
    out: Option<PathBuf>,
}

fn init_logging(config: &PlanningConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.trim().to_ascii_lowercase()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut overrides =
        ConfigOverrides { log_level: cli.log_level.clone(), ..ConfigOverrides::default() };
    if let Command::Plan(args) = &cli.command {
        overrides.preset = args.preset.clone();
        overrides.service_level = args.service_level;
        overrides.granularity = args.granularity;
        overrides.horizon_days = args.horizon_days;
    }

    let config = PlanningConfig::load(LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config.clone(),
        overrides,
    })
    .context("loading configuration")?;
    init_logging(&config);

    let today = cli.today.unwrap_or_else(|| chrono::Local::now().date_naive());
    let run = PlanningRun::new(config, today);

    match cli.command {
        Command::Plan(args) => plan(&run, &args),
        Command::Compare(args) => compare(&run, &args),
    }
}

fn plan(run: &PlanningRun, args: &PlanArgs) -> Result<()> {
    let inputs = PlanningInputs {
        shipments: io::read_shipments(&args.shipments)
            .with_context(|| format!("loading shipments from {}", args.shipments.display()))?,
        categories: io::read_optional(args.categories.as_deref())?,
        supply: SupplyTables {
            inventory: io::read_optional(args.inventory.as_deref())?,
            open_pos: io::read_optional(args.open_pos.as_deref())?,
            backorders: io::read_optional(args.backorders.as_deref())?,
            sku_master: io::read_optional(args.sku_master.as_deref())?,
            lead_times: io::read_optional(args.lead_times.as_deref())?,
        },
    };

    let output = run.execute(&inputs).context("planning run failed")?;
    let written = io::write_outputs(&args.out, &output)?;

    let summary = &output.summary;
    println!(
        "Forecast {} SKUs as of {}; {} below reorder point, {:.0} units / {:.2} value to order",
        output.forecast.forecasts.len(),
        run.today(),
        summary.replenishment.skus_to_order,
        summary.replenishment.total_suggested_units,
        summary.replenishment.total_order_value,
    );
    if !output.warnings.is_empty() {
        println!("{} warnings (see {})", output.warnings.len(), io::WARNINGS_FILE);
    }
    for path in written {
        println!("  wrote {}", path.display());
    }
    Ok(())
}

fn compare(run: &PlanningRun, args: &CompareArgs) -> Result<()> {
    let snapshots = io::read_table(&args.snapshots)
        .with_context(|| format!("loading snapshots from {}", args.snapshots.display()))?;
    let shipments = io::read_shipments(&args.shipments)
        .with_context(|| format!("loading shipments from {}", args.shipments.display()))?;

    let (rows, bias) = run.compare(&snapshots, &shipments);
    if let Some(out) = &args.out {
        io::write_table(out, &rows)?;
    }

    match bias {
        Some(bias) => println!("{}", serde_json::to_string_pretty(&bias)?),
        None => println!("No snapshot has a fully elapsed horizon as of {}", run.today()),
    }
    Ok(())
}
