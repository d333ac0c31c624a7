//! Artifact export — JSON report plus CSV trade tape and equity curves.
//!
//! The JSON report round-trips the whole `UniverseReport` with a schema
//! version; unknown versions are rejected on load. CSVs exist for external
//! analysis tools and are write-only.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use confluence_core::domain::{EquityPoint, TradeRecord};

use crate::runner::{UniverseReport, SCHEMA_VERSION};

// ─── JSON ───────────────────────────────────────────────────────────

/// Serialize a report to pretty JSON.
pub fn export_json(report: &UniverseReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report to JSON")
}

/// Deserialize a report, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<UniverseReport> {
    let report: UniverseReport =
        serde_json::from_str(json).context("failed to deserialize report from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

// ─── CSV ────────────────────────────────────────────────────────────

/// Trade tape as CSV.
///
/// Columns: symbol, direction, quantity, entry_timestamp, entry_price,
/// exit_timestamp, exit_price, exit_reason, gross_pnl, commission,
/// slippage, net_pnl.
pub fn export_trades_csv(trades: &[TradeRecord]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "symbol",
        "direction",
        "quantity",
        "entry_timestamp",
        "entry_price",
        "exit_timestamp",
        "exit_price",
        "exit_reason",
        "gross_pnl",
        "commission",
        "slippage",
        "net_pnl",
    ])?;
    for t in trades {
        wtr.write_record([
            t.symbol.clone(),
            format!("{:?}", t.direction),
            format!("{:.4}", t.quantity),
            t.entry_timestamp.to_rfc3339(),
            format!("{:.4}", t.entry_price),
            t.exit_timestamp.to_rfc3339(),
            format!("{:.4}", t.exit_price),
            format!("{:?}", t.exit_reason),
            format!("{:.2}", t.gross_pnl),
            format!("{:.2}", t.commission),
            format!("{:.2}", t.slippage),
            format!("{:.2}", t.net_pnl),
        ])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

/// Equity curve as CSV with columns `timestamp,equity`.
pub fn export_equity_csv(curve: &[EquityPoint]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "equity"])?;
    for point in curve {
        wtr.write_record([point.timestamp.to_rfc3339(), format!("{:.2}", point.equity)])?;
    }
    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output was not valid UTF-8")
}

/// Write the full artifact set under `dir`:
/// `report.json`, `trades_<SYMBOL>.csv`, `equity_<SYMBOL>.csv`.
///
/// Returns the paths written.
pub fn write_artifacts(report: &UniverseReport, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create artifact dir {}", dir.display()))?;
    let mut written = Vec::new();

    let json_path = dir.join("report.json");
    std::fs::write(&json_path, export_json(report)?)
        .with_context(|| format!("failed to write {}", json_path.display()))?;
    written.push(json_path);

    for symbol_report in &report.reports {
        let trades_path = dir.join(format!("trades_{}.csv", symbol_report.symbol));
        std::fs::write(&trades_path, export_trades_csv(&symbol_report.trades)?)
            .with_context(|| format!("failed to write {}", trades_path.display()))?;
        written.push(trades_path);

        let equity_path = dir.join(format!("equity_{}.csv", symbol_report.symbol));
        std::fs::write(&equity_path, export_equity_csv(&symbol_report.equity_curve)?)
            .with_context(|| format!("failed to write {}", equity_path.display()))?;
        written.push(equity_path);
    }
    Ok(written)
}
