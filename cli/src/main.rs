mod commands;
mod config;

use anyhow::Result;
use clap::{ArgGroup, CommandFactory, Parser};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    ReplacePolicy, cmd_chart, cmd_delete, cmd_export, cmd_import, cmd_log, cmd_stats, cmd_view,
    view_count,
};
use crate::config::Config;
use bplog_core::store::FileStore;

const EXAMPLES: &str = "\
Examples:
  bplog 120 80                 Today, AM, no HR
  bplog 118 78 72 PM           Today, PM, with HR
  bplog 120 80 AM -1           Yesterday morning
  bplog 118 78 72 PM -3        3 days ago evening
  bplog 120 80 AM 2024-12-25   A specific date
  bplog --view 20              Last 20 readings
  bplog --stats                Averages, range and trend";

#[derive(Parser)]
#[command(
    name = "bplog",
    version,
    about = "A simple blood pressure logger",
    after_help = EXAMPLES,
    allow_negative_numbers = true,
    group(
        ArgGroup::new("mode")
            .args(["reading", "view", "stats", "chart", "delete", "import", "export"])
    )
)]
struct Cli {
    /// <systolic> <diastolic> [heartrate] [AM|PM] [-Ndays | YYYY-MM-DD]
    #[arg(value_name = "READING")]
    reading: Vec<String>,
    /// View the last N readings (default 10)
    #[arg(short, long, value_name = "N")]
    view: Option<Option<usize>>,
    /// Show statistics
    #[arg(short, long)]
    stats: bool,
    /// Show daily averages for the last 14 days
    #[arg(long)]
    chart: bool,
    /// Delete a reading by ID
    #[arg(long, value_name = "ID")]
    delete: Option<i64>,
    /// Replace all readings with the contents of a CSV file
    #[arg(long, value_name = "PATH")]
    import: Option<PathBuf>,
    /// Write all readings to a CSV file (default: bp-data-<today>.csv)
    #[arg(long, value_name = "PATH")]
    export: Option<Option<PathBuf>>,
    /// Replace an existing reading (or current data on import) without asking
    #[arg(short, long)]
    yes: bool,
    /// Output as JSON
    #[arg(long)]
    json: bool,
    /// Data file (default: $BPLOG_DATA, then the platform data directory)
    #[arg(long, value_name = "PATH")]
    data: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BPLOG_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init()
        .ok();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let nothing_requested = cli.reading.is_empty()
        && cli.view.is_none()
        && !cli.stats
        && !cli.chart
        && cli.delete.is_none()
        && cli.import.is_none()
        && cli.export.is_none();
    if nothing_requested {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    }

    let config = Config::load(cli.data)?;
    tracing::debug!(path = %config.data_path.display(), "using data file");
    let store = FileStore::new(config.data_path);
    let json = cli.json;

    if let Some(count) = cli.view {
        cmd_view(&store, view_count(count), json)
    } else if cli.stats {
        cmd_stats(&store, json)
    } else if cli.chart {
        cmd_chart(&store, json)
    } else if let Some(id) = cli.delete {
        cmd_delete(&store, id, json)
    } else if let Some(path) = cli.import {
        cmd_import(&store, &path, cli.yes, json)
    } else if let Some(path) = cli.export {
        cmd_export(&store, path, json)
    } else {
        cmd_log(&store, &cli.reading, ReplacePolicy::detect(cli.yes), json)
    }
}
