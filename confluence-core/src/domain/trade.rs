//! Round-trip trade records extracted from order settlement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::signal::Direction;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Opposite-direction composite signal arrived.
    Signal,
    StopLoss,
    TakeProfit,
    /// Run ended with the position still open; closed at last mark.
    EndOfData,
}

/// A completed round-trip trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: f64,
    pub entry_timestamp: DateTime<Utc>,
    pub entry_price: f64,
    pub exit_timestamp: DateTime<Utc>,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub gross_pnl: f64,
    pub commission: f64,
    pub slippage: f64,
    pub net_pnl: f64,
}

impl TradeRecord {
    pub fn is_winner(&self) -> bool {
        self.net_pnl > 0.0
    }
}
