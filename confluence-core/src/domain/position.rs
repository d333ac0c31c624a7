//! Position tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::Direction;

/// An open or closed position for one symbol.
///
/// Quantity is signed: positive for long, negative for short. Stop-loss
/// and take-profit levels are frozen at entry and never recomputed —
/// recomputing them after open would let later bars tighten the exit with
/// information that did not exist at entry time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl Position {
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }

    pub fn is_long(&self) -> bool {
        self.quantity > 0.0
    }

    pub fn is_short(&self) -> bool {
        self.quantity < 0.0
    }

    pub fn direction(&self) -> Direction {
        if self.is_long() {
            Direction::Long
        } else if self.is_short() {
            Direction::Short
        } else {
            Direction::Flat
        }
    }

    /// Signed market value at the given price.
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.entry_price)
    }

    /// Whether the bar range breaches the stop-loss level.
    pub fn stop_breached(&self, low: f64, high: f64) -> bool {
        if self.is_long() {
            low <= self.stop_loss
        } else {
            high >= self.stop_loss
        }
    }

    /// Whether the bar range breaches the take-profit level.
    pub fn take_breached(&self, low: f64, high: f64) -> bool {
        if self.is_long() {
            high >= self.take_profit
        } else {
            low <= self.take_profit
        }
    }

    /// Closing is terminal: sets `closed_at` once.
    pub fn close(&mut self, at: DateTime<Utc>) {
        debug_assert!(self.closed_at.is_none(), "position already closed");
        self.closed_at = Some(at);
    }
}
