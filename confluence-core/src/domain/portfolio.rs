//! Portfolio — aggregate state of cash + open positions + equity curve.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::position::Position;

/// One point on the equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
}

/// Aggregate portfolio state, exclusively owned by one simulation loop.
///
/// All mutation happens through order settlement. The accounting identity
/// `equity == cash + sum(signed position market values)` must hold at every
/// bar; `equity()` is the only way equity is computed.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub positions: HashMap<String, Position>,
    pub equity_curve: Vec<EquityPoint>,
    pub total_commission: f64,
    pub total_slippage: f64,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            cash: initial_capital,
            initial_capital,
            positions: HashMap::new(),
            equity_curve: Vec::new(),
            total_commission: 0.0,
            total_slippage: 0.0,
        }
    }

    /// Total equity = cash + sum of signed position market values.
    pub fn equity(&self, prices: &HashMap<String, f64>) -> f64 {
        let position_value: f64 = self
            .positions
            .values()
            .filter(|p| p.is_open())
            .map(|p| {
                let price = prices.get(&p.symbol).copied().unwrap_or(p.entry_price);
                p.market_value(price)
            })
            .sum();
        self.cash + position_value
    }

    /// Whether a symbol has an open position.
    pub fn has_open_position(&self, symbol: &str) -> bool {
        self.positions.get(symbol).is_some_and(|p| p.is_open())
    }

    pub fn open_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol).filter(|p| p.is_open())
    }

    pub fn open_position_mut(&mut self, symbol: &str) -> Option<&mut Position> {
        self.positions.get_mut(symbol).filter(|p| p.is_open())
    }

    /// Record a mark-to-market equity point.
    pub fn record_equity(&mut self, timestamp: DateTime<Utc>, prices: &HashMap<String, f64>) {
        let equity = self.equity(prices);
        debug_assert!(equity.is_finite(), "non-finite equity at {timestamp}");
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    /// Peak equity seen so far (initial capital if no points yet).
    pub fn peak_equity(&self) -> f64 {
        self.equity_curve
            .iter()
            .map(|p| p.equity)
            .fold(self.initial_capital, f64::max)
    }

    /// Current drawdown from peak as a fraction in [0, 1].
    pub fn current_drawdown(&self, prices: &HashMap<String, f64>) -> f64 {
        let peak = self.peak_equity();
        if peak <= 0.0 {
            return 0.0;
        }
        let equity = self.equity(prices);
        ((peak - equity) / peak).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn open_long(symbol: &str, quantity: f64, entry: f64) -> Position {
        Position {
            symbol: symbol.into(),
            quantity,
            entry_price: entry,
            stop_loss: entry * 0.95,
            take_profit: entry * 1.1,
            opened_at: ts(2),
            closed_at: None,
        }
    }

    #[test]
    fn equity_with_no_positions() {
        let portfolio = Portfolio::new(100_000.0);
        assert_eq!(portfolio.equity(&HashMap::new()), 100_000.0);
    }

    #[test]
    fn equity_with_long_position() {
        let mut portfolio = Portfolio::new(90_000.0);
        portfolio
            .positions
            .insert("SPY".into(), open_long("SPY", 100.0, 100.0));
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 110.0);
        // 90_000 + 100 * 110 = 101_000
        assert_eq!(portfolio.equity(&prices), 101_000.0);
    }

    #[test]
    fn equity_with_short_position() {
        let mut portfolio = Portfolio::new(110_000.0);
        portfolio
            .positions
            .insert("SPY".into(), open_long("SPY", -100.0, 100.0));
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 90.0);
        // 110_000 + (-100 * 90) = 101_000
        assert_eq!(portfolio.equity(&prices), 101_000.0);
    }

    #[test]
    fn closed_positions_excluded_from_equity() {
        let mut portfolio = Portfolio::new(100_000.0);
        let mut pos = open_long("SPY", 100.0, 100.0);
        pos.close(ts(3));
        portfolio.positions.insert("SPY".into(), pos);
        let mut prices = HashMap::new();
        prices.insert("SPY".to_string(), 200.0);
        assert_eq!(portfolio.equity(&prices), 100_000.0);
        assert!(!portfolio.has_open_position("SPY"));
    }

    #[test]
    fn drawdown_from_peak() {
        let mut portfolio = Portfolio::new(100_000.0);
        portfolio.equity_curve.push(EquityPoint {
            timestamp: ts(2),
            equity: 110_000.0,
        });
        portfolio.cash = 99_000.0;
        let dd = portfolio.current_drawdown(&HashMap::new());
        assert!((dd - 0.1).abs() < 1e-12);
    }
}
