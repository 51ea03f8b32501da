//! # Batch Planner Entry Point
//!
//! Reads the exported count matrix, plans request windows and prints them as JSON.
//! Diagnostics go to stderr so stdout can be piped straight into the exporter.
//!
//! ```sh
//! # Plan with defaults from ./batch-config.toml (if present)
//! batch-planner matrix.csv > requests.json
//!
//! # Lower ceiling, keep the trailing small-event group, show a breakdown
//! batch-planner matrix.csv --ceiling 50000 --flush-trailing --summary
//! ```


use anyhow::Context;
use batch_planner_lib::{config::PlannerConfig, planner, records, report};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Split per-day event counts into request windows under a volume ceiling.
#[derive(Parser)]
#[command(name = "batch-planner", version)]
struct Cli {
    /// Count matrix CSV (header row, then id,day,event_type,count).
    #[arg(default_value = "matrix.csv")]
    input: PathBuf,

    /// Planner configuration file.
    #[arg(long, default_value = "batch-config.toml")]
    config: PathBuf,

    /// Override the per-request ceiling from the config file.
    #[arg(long)]
    ceiling: Option<u64>,

    /// Also request the last small-event group even if it never reached the ceiling.
    #[arg(long)]
    flush_trailing: bool,

    /// Try one-day windows when residual halving gets down to a single day.
    #[arg(long)]
    single_day_windows: bool,

    /// Write JSON to this file instead of stdout.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Print a per-stage breakdown to stderr.
    #[arg(long)]
    summary: bool,

    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(long, short)]
    verbose: bool,
}

/// Main application entry point.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = PlannerConfig::load_from_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(ceiling) = cli.ceiling {
        config.ceiling = ceiling;
    }
    if cli.flush_trailing {
        config.flush_trailing = true;
    }
    if cli.single_day_windows {
        config.single_day_windows = true;
    }
    config.validate().context("invalid planner settings")?;

    let records = records::read_records(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    let plan = planner::plan(&records, &config);

    match &cli.output {
        Some(path) => report::write_json(path, &plan.windows)
            .with_context(|| format!("writing {}", path.display()))?,
        None => println!("{}", report::to_json_pretty(&plan.windows)?),
    }

    if cli.summary {
        eprint!("{}", report::render_summary(&plan.summary));
    }

    Ok(())
}
