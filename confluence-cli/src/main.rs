//! Confluence CLI — validate and run commands.
//!
//! Commands:
//! - `validate` — parse and validate a TOML run config without running
//! - `run` — load data, simulate the universe, and write artifacts

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use confluence_runner::{load_bars, load_sentiment, run_universe, write_artifacts, RunConfig};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "confluence",
    about = "Confluence — signal fusion backtesting engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a TOML run config without running anything.
    Validate {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
    /// Run the configured universe and write artifacts.
    Run {
        /// Path to the TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Artifact output directory.
        #[arg(long, default_value = "artifacts")]
        out_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run { config, out_dir } => run(&config, &out_dir),
    }
}

fn validate(config_path: &PathBuf) -> Result<()> {
    let config = RunConfig::from_toml_file(config_path)?;
    let run_id = config.run_id()?;
    println!("config OK: {} symbols, run id {}", config.universe.len(), run_id);
    Ok(())
}

fn run(config_path: &PathBuf, out_dir: &PathBuf) -> Result<()> {
    let config = RunConfig::from_toml_file(config_path)?;

    // Embedders flip this to stop mid-run; the CLI runs to completion.
    let cancel = AtomicBool::new(false);

    let mut data = HashMap::new();
    for symbol in &config.universe {
        let store = load_bars(&config.data_dir, symbol)
            .with_context(|| format!("loading bars for '{symbol}'"))?;
        data.insert(symbol.clone(), store);
    }
    let sentiment = match &config.sentiment_file {
        Some(path) => load_sentiment(path).context("loading sentiment data")?,
        None => Vec::new(),
    };

    let report = run_universe(&config, &data, &sentiment, &cancel)?;
    let written = write_artifacts(&report, out_dir)?;
    info!(run_id = %report.run_id, files = written.len(), "artifacts written");

    for symbol_report in &report.reports {
        println!(
            "{:<8} {:>9} trades  return {:>8.2}%  max dd {:>6.2}%  sharpe {:>6.2}",
            symbol_report.symbol,
            symbol_report.metrics.trade_count,
            symbol_report.metrics.total_return * 100.0,
            symbol_report.metrics.max_drawdown * 100.0,
            symbol_report.metrics.sharpe,
        );
    }
    Ok(())
}
