//! Run orchestration — per-symbol fan-out and report assembly.
//!
//! Each symbol is an independent simulation with its own portfolio, so the
//! universe fans out across a rayon pool. Workers share nothing mutable;
//! the merge at the end is a read-only collection sorted by symbol, which
//! keeps the report deterministic regardless of scheduling.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use confluence_core::domain::{EquityPoint, TradeRecord};
use confluence_core::engine::{CostModel, RunStatus, Simulator};
use confluence_core::fusion::FusionEngine;
use confluence_core::indicators::{IndicatorSet, MacdCross, Momentum, Rsi, SmaCross};
use confluence_core::notify::LogNotifier;
use confluence_core::patterns::PatternMatcher;
use confluence_core::risk::RiskManager;
use confluence_core::sentiment::{SentimentAdapter, SentimentObservation};
use confluence_core::store::BarStore;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RunConfig;
use crate::metrics::PerformanceMetrics;

/// Bumped when the persisted report format changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

/// Results and metrics for one symbol's run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub status: RunStatus,
    pub metrics: PerformanceMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub trades: Vec<TradeRecord>,
    pub bars_processed: usize,
    pub skipped_bars: usize,
}

/// The whole universe's run output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseReport {
    pub schema_version: u32,
    pub run_id: String,
    pub generated_at: DateTime<Utc>,
    pub config: RunConfig,
    pub reports: Vec<SymbolReport>,
}

impl UniverseReport {
    pub fn report_for(&self, symbol: &str) -> Option<&SymbolReport> {
        self.reports.iter().find(|r| r.symbol == symbol)
    }
}

/// The stock indicator registry used for every run.
fn default_indicators() -> Result<IndicatorSet> {
    IndicatorSet::new(vec![
        Box::new(Momentum::new(5)),
        Box::new(Rsi::new(14)),
        Box::new(MacdCross::standard()),
        Box::new(SmaCross::new(10, 30)),
    ])
    .context("failed to build indicator registry")
}

fn build_simulator(config: &RunConfig, sentiment: &[SentimentObservation]) -> Result<Simulator> {
    let engine = &config.engine;
    let mut adapter = SentimentAdapter::new(engine.sentiment.clone())
        .context("invalid sentiment configuration")?;
    adapter.ingest_all(sentiment.iter().cloned());

    Simulator::new(
        engine.simulator.clone(),
        default_indicators()?,
        adapter,
        PatternMatcher::with_builtin(engine.patterns.clone())
            .context("invalid pattern configuration")?,
        FusionEngine::new(engine.fusion.clone()).context("invalid fusion configuration")?,
        RiskManager::new(engine.risk.clone()).context("invalid risk configuration")?,
        CostModel::new(engine.costs.clone(), engine.simulator.seed)
            .context("invalid cost configuration")?,
    )
    .context("invalid simulator configuration")
}

/// Run one symbol end to end and bundle its report.
pub fn run_symbol(
    config: &RunConfig,
    store: &BarStore,
    sentiment: &[SentimentObservation],
    cancel: &AtomicBool,
) -> Result<SymbolReport> {
    let mut simulator = build_simulator(config, sentiment)?;
    let mut notifier = LogNotifier;
    let result = simulator.run(store, &mut notifier, cancel);

    let equity: Vec<f64> = result.portfolio.equity_curve.iter().map(|p| p.equity).collect();
    let metrics = PerformanceMetrics::compute(&equity, &result.trades, config.risk_free_rate);

    Ok(SymbolReport {
        symbol: store.symbol().to_string(),
        status: result.status,
        metrics,
        equity_curve: result.portfolio.equity_curve,
        trades: result.trades,
        bars_processed: result.bars_processed,
        skipped_bars: store.skipped(),
    })
}

/// Run the whole universe in parallel and merge the reports.
///
/// Symbols missing from `data` fail the run rather than being silently
/// skipped. Reports are sorted by symbol so the merged output does not
/// depend on worker scheduling.
pub fn run_universe(
    config: &RunConfig,
    data: &HashMap<String, BarStore>,
    sentiment: &[SentimentObservation],
    cancel: &AtomicBool,
) -> Result<UniverseReport> {
    config.validate()?;
    let run_id = config.run_id()?;
    info!(run_id = %run_id, symbols = config.universe.len(), "universe run starting");

    let mut reports: Vec<SymbolReport> = config
        .universe
        .par_iter()
        .map(|symbol| {
            let store = data
                .get(symbol)
                .with_context(|| format!("no bar data loaded for '{symbol}'"))?;
            run_symbol(config, store, sentiment, cancel)
        })
        .collect::<Result<Vec<_>>>()?;
    reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    Ok(UniverseReport {
        schema_version: SCHEMA_VERSION,
        run_id,
        generated_at: Utc::now(),
        config: config.clone(),
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use confluence_core::domain::Bar;

    fn store_with_walk(symbol: &str, n: usize, drift: f64) -> BarStore {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut store = BarStore::new(symbol);
        for i in 0..n {
            let close = 100.0 + (i as f64 * 0.5).sin() * 4.0 + i as f64 * drift;
            store
                .append(Bar {
                    symbol: symbol.into(),
                    timestamp: base + Duration::days(i as i64),
                    open: close - 0.2,
                    high: close + 1.5,
                    low: close - 1.5,
                    close,
                    volume: 1000.0,
                })
                .unwrap();
        }
        store
    }

    fn two_symbol_setup() -> (RunConfig, HashMap<String, BarStore>) {
        let config = RunConfig {
            universe: vec!["AAA".into(), "BBB".into()],
            ..RunConfig::default()
        };
        let mut data = HashMap::new();
        data.insert("AAA".to_string(), store_with_walk("AAA", 120, 0.3));
        data.insert("BBB".to_string(), store_with_walk("BBB", 120, -0.2));
        (config, data)
    }

    #[test]
    fn universe_run_produces_sorted_reports() {
        let (config, data) = two_symbol_setup();
        let cancel = AtomicBool::new(false);
        let report = run_universe(&config, &data, &[], &cancel).unwrap();
        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.reports.len(), 2);
        assert_eq!(report.reports[0].symbol, "AAA");
        assert_eq!(report.reports[1].symbol, "BBB");
        for r in &report.reports {
            assert_eq!(r.status, RunStatus::Completed);
            assert_eq!(r.bars_processed, 120);
        }
    }

    #[test]
    fn missing_symbol_data_fails_the_run() {
        let (mut config, data) = two_symbol_setup();
        config.universe.push("CCC".into());
        let cancel = AtomicBool::new(false);
        assert!(run_universe(&config, &data, &[], &cancel).is_err());
    }

    #[test]
    fn universe_runs_are_reproducible() {
        let (config, data) = two_symbol_setup();
        let cancel = AtomicBool::new(false);
        let a = run_universe(&config, &data, &[], &cancel).unwrap();
        let b = run_universe(&config, &data, &[], &cancel).unwrap();
        assert_eq!(a.run_id, b.run_id);
        for (ra, rb) in a.reports.iter().zip(&b.reports) {
            assert_eq!(ra.trades.len(), rb.trades.len());
            assert_eq!(
                ra.equity_curve.last().map(|p| p.equity),
                rb.equity_curve.last().map(|p| p.equity)
            );
        }
    }
}
