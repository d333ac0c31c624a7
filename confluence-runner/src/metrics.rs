//! Performance metrics — pure functions from run outputs to statistics.
//!
//! Every metric is a pure function: equity curve and/or trade list in,
//! scalar out. Nothing here touches the engine or the data layer.

use confluence_core::domain::TradeRecord;
use serde::{Deserialize, Deserializer, Serialize};

/// Trading periods per year for daily bars.
const PERIODS_PER_YEAR: f64 = 252.0;

/// Aggregate performance metrics for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_volatility: f64,
    pub sharpe: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub avg_trade_pnl: f64,
    /// serde_json writes non-finite floats as `null`, so `null` reads
    /// back as the infinite profit factor that produced it.
    #[serde(deserialize_with = "null_as_infinity")]
    pub profit_factor: f64,
    pub trade_count: usize,
}

fn null_as_infinity<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve and trade list.
    ///
    /// `risk_free_rate` is the annualized rate used by the Sharpe ratio.
    pub fn compute(equity_curve: &[f64], trades: &[TradeRecord], risk_free_rate: f64) -> Self {
        Self {
            total_return: total_return(equity_curve),
            annualized_volatility: annualized_volatility(equity_curve),
            sharpe: sharpe_ratio(equity_curve, risk_free_rate),
            max_drawdown: max_drawdown(equity_curve),
            win_rate: win_rate(trades),
            avg_trade_pnl: avg_trade_pnl(trades),
            profit_factor: profit_factor(trades),
            trade_count: trades.len(),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Total return as a fraction: (final - initial) / initial.
pub fn total_return(equity_curve: &[f64]) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }
    let initial = equity_curve[0];
    if initial <= 0.0 {
        return 0.0;
    }
    (equity_curve[equity_curve.len() - 1] - initial) / initial
}

/// Per-period simple returns of the equity curve.
fn period_returns(equity_curve: &[f64]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

/// Annualized volatility: std of per-period returns scaled by sqrt(252).
pub fn annualized_volatility(equity_curve: &[f64]) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    var.sqrt() * PERIODS_PER_YEAR.sqrt()
}

/// Annualized Sharpe ratio over the given annualized risk-free rate.
///
/// Zero when the curve is too short or volatility is zero.
pub fn sharpe_ratio(equity_curve: &[f64], risk_free_rate: f64) -> f64 {
    let returns = period_returns(equity_curve);
    if returns.len() < 2 {
        return 0.0;
    }
    let mean = returns.iter().sum::<f64>() / returns.len() as f64;
    let var = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (returns.len() - 1) as f64;
    let std = var.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    let excess = mean - risk_free_rate / PERIODS_PER_YEAR;
    excess / std * PERIODS_PER_YEAR.sqrt()
}

/// Maximum peak-to-trough drawdown as a fraction in [0, 1].
pub fn max_drawdown(equity_curve: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0_f64;
    for &equity in equity_curve {
        peak = peak.max(equity);
        if peak > 0.0 {
            worst = worst.max((peak - equity) / peak);
        }
    }
    worst
}

/// Fraction of trades with positive net P&L (0.0 for no trades).
pub fn win_rate(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Mean net P&L per trade (0.0 for no trades).
pub fn avg_trade_pnl(trades: &[TradeRecord]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(|t| t.net_pnl).sum::<f64>() / trades.len() as f64
}

/// Gross profit over gross loss. Infinite when there are wins but no
/// losses; 0.0 with no trades or no wins.
pub fn profit_factor(trades: &[TradeRecord]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.net_pnl > 0.0).map(|t| t.net_pnl).sum();
    let gross_loss: f64 = trades
        .iter()
        .filter(|t| t.net_pnl < 0.0)
        .map(|t| -t.net_pnl)
        .sum();
    if gross_loss == 0.0 {
        if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    } else {
        gross_profit / gross_loss
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use confluence_core::domain::{Direction, ExitReason};

    fn trade(net_pnl: f64) -> TradeRecord {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        TradeRecord {
            symbol: "SPY".into(),
            direction: Direction::Long,
            quantity: 100.0,
            entry_timestamp: ts,
            entry_price: 100.0,
            exit_timestamp: ts,
            exit_price: 100.0 + net_pnl / 100.0,
            exit_reason: ExitReason::Signal,
            gross_pnl: net_pnl,
            commission: 0.0,
            slippage: 0.0,
            net_pnl,
        }
    }

    #[test]
    fn total_return_simple() {
        assert!((total_return(&[100.0, 110.0]) - 0.1).abs() < 1e-12);
        assert_eq!(total_return(&[100.0]), 0.0);
    }

    #[test]
    fn max_drawdown_finds_deepest_trough() {
        // Peak 120, trough 90: drawdown = 0.25
        let curve = [100.0, 120.0, 110.0, 90.0, 115.0];
        assert!((max_drawdown(&curve) - 0.25).abs() < 1e-12);
    }

    #[test]
    fn max_drawdown_zero_for_monotone_curve() {
        assert_eq!(max_drawdown(&[100.0, 105.0, 110.0]), 0.0);
    }

    #[test]
    fn flat_curve_has_zero_sharpe_and_vol() {
        let curve = [100.0, 100.0, 100.0, 100.0];
        assert_eq!(sharpe_ratio(&curve, 0.0), 0.0);
        assert_eq!(annualized_volatility(&curve), 0.0);
    }

    #[test]
    fn sharpe_decreases_with_higher_risk_free_rate() {
        let curve: Vec<f64> = (0..50).map(|i| 100.0 * 1.002_f64.powi(i)).collect();
        let at_zero = sharpe_ratio(&curve, 0.0);
        let at_five_pct = sharpe_ratio(&curve, 0.05);
        assert!(at_zero > at_five_pct);
    }

    #[test]
    fn win_rate_counts_only_positive_net() {
        let trades = vec![trade(100.0), trade(-50.0), trade(0.0), trade(25.0)];
        assert!((win_rate(&trades) - 0.5).abs() < 1e-12);
        assert_eq!(win_rate(&[]), 0.0);
    }

    #[test]
    fn avg_trade_pnl_is_mean() {
        let trades = vec![trade(100.0), trade(-40.0)];
        assert!((avg_trade_pnl(&trades) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn profit_factor_edge_cases() {
        assert_eq!(profit_factor(&[]), 0.0);
        assert_eq!(profit_factor(&[trade(50.0)]), f64::INFINITY);
        let mixed = vec![trade(100.0), trade(-50.0)];
        assert!((profit_factor(&mixed) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn compute_bundles_everything() {
        let curve: Vec<f64> = (0..30).map(|i| 100_000.0 + i as f64 * 100.0).collect();
        let trades = vec![trade(500.0), trade(-200.0)];
        let m = PerformanceMetrics::compute(&curve, &trades, 0.0);
        assert!(m.total_return > 0.0);
        assert_eq!(m.trade_count, 2);
        assert!((m.win_rate - 0.5).abs() < 1e-12);
    }
}
