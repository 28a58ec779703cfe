//! CLI entry point for the batch ETL pipeline.

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use polars::prelude::*;
use std::path::PathBuf;
use tally_etl::pipeline::EtlPipeline;
use tally_etl::quality::{assert_non_empty, assert_unique_key, require_columns};
use tally_etl::transform::{add_time_parts, parse_datetime};
use tally_etl::{io, reporting, EtlConfig, Paths};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Batch ETL pipeline for order analytics",
    long_about = "Ingests raw order and user CSVs, validates and cleans them, joins them\n\
                  safely and writes columnar analytics artifacts plus run metadata.\n\n\
                  ENVIRONMENT VARIABLES:\n  \
                  TALLY_DATA_ROOT    Data root directory (overridden by --root)\n\n\
                  EXAMPLES:\n  \
                  # Full pipeline against ./data\n  \
                  tally-etl run\n\n  \
                  # Staged execution\n  \
                  tally-etl --root /srv/tally load\n  \
                  tally-etl --root /srv/tally clean\n  \
                  tally-etl --root /srv/tally build"
)]
struct Cli {
    /// Data root directory (defaults to TALLY_DATA_ROOT, then `.`)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show warnings and errors)
    #[arg(short, long)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read raw CSVs, enforce the canonical schema, write processed Parquet
    Load,
    /// Validate, clean and flag the raw inputs; write cleaned artifacts
    Clean,
    /// Join cleaned orders with users and write the analytics table
    Build,
    /// Run the full pipeline end-to-end and write run metadata
    Run,
}

/// Initialize the tracing subscriber for logging.
fn init_logging(level: &str, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level, cli.quiet);

    // Load environment variables from .env file
    dotenv().ok();

    let root = Paths::resolve_root(cli.root.as_deref());
    let paths = Paths::from_root(root);
    let config = EtlConfig::from_paths(&paths);
    info!("Data root: {}", paths.root.display());

    let result = match cli.command {
        Command::Load => cmd_load(&config),
        Command::Clean => cmd_clean(&config),
        Command::Build => cmd_build(&config),
        Command::Run => cmd_run(config),
    };

    if let Err(e) = &result {
        error!("Pipeline failed: {e}");
    }
    result
}

/// Day-one slice: raw CSVs in, schema-enforced Parquet out.
fn cmd_load(config: &EtlConfig) -> Result<()> {
    let orders = io::read_orders_csv(&config.raw_orders)?;
    let users = io::read_users_csv(&config.raw_users)?;

    let orders = tally_etl::enforce_orders_schema(&orders)?;
    let users = tally_etl::enforce_users_schema(&users)?;

    io::write_parquet(&orders, &config.out_orders)?;
    io::write_parquet(&users, &config.out_users)?;

    // read back as a sanity check that the artifacts are self-describing
    let check = io::read_parquet(&config.out_orders)?;
    info!("orders.parquet: {:?}", check.shape());
    Ok(())
}

/// Gates plus cleaning transforms; writes the cleaned artifacts and the
/// missingness report.
fn cmd_clean(config: &EtlConfig) -> Result<()> {
    let orders_raw = io::read_orders_csv(&config.raw_orders)?;
    let users_raw = io::read_users_csv(&config.raw_users)?;

    EtlPipeline::validate(&orders_raw, &users_raw)?;

    let users = EtlPipeline::prepare_users(&users_raw)?;
    let (orders_clean, missingness) = EtlPipeline::transform_orders(&orders_raw)?;

    io::write_parquet(&orders_clean, &config.out_orders_clean)?;
    io::write_parquet(&users, &config.out_users)?;
    io::write_parquet(&missingness, &config.missingness_report)?;

    info!("orders_clean.parquet: {:?}", orders_clean.shape());
    Ok(())
}

/// Join the cleaned artifacts and derive the analytics table.
fn cmd_build(config: &EtlConfig) -> Result<()> {
    let orders = io::read_parquet(&config.out_orders_clean)
        .map_err(|e| anyhow!("run `clean` first: {e}"))?;
    let users =
        io::read_parquet(&config.out_users).map_err(|e| anyhow!("run `clean` first: {e}"))?;

    require_columns(
        &orders,
        &["order_id", "user_id", "amount", "quantity", "created_at", "status_clean"],
        "orders_clean",
    )?;
    require_columns(&users, &["user_id", "country", "signup_date"], "users")?;
    assert_non_empty(&orders, "orders_clean")?;
    assert_non_empty(&users, "users")?;
    assert_unique_key(&users, "user_id")?;

    // no-ops when `clean` already parsed and derived these
    let orders = parse_datetime(&orders, "created_at", true)?;
    let orders = add_time_parts(&orders, "created_at")?;

    let joined = EtlPipeline::join_users(&orders, &users)?;
    let analytics = EtlPipeline::enrich(&joined)?;

    io::write_parquet(&analytics, &config.out_analytics)?;
    let summary = reporting::write_revenue_report(&analytics, &config.revenue_by_country)?;
    print_summary(&summary);
    Ok(())
}

/// Full end-to-end run.
fn cmd_run(config: EtlConfig) -> Result<()> {
    let pipeline = EtlPipeline::new(config);
    let outcome = pipeline.run()?;
    info!(
        "Analytics table: {} rows x {} columns",
        outcome.analytics.height(),
        outcome.analytics.width()
    );
    Ok(())
}

/// Print the revenue summary table.
///
/// Intentionally `println!` rather than logging: this is the user-facing
/// result of `build`, visible regardless of log level.
fn print_summary(summary: &DataFrame) {
    println!("{summary}");
}
