//! Order lifecycle types.
//!
//! Orders are created by the risk manager at decision time and resolved by
//! the simulator exactly one bar later — there are no same-bar fills, which
//! is what makes the no-lookahead property hold by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monotonic order identifier, unique within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

/// Buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Order lifecycle states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    /// Waiting for the next bar's open.
    Pending,
    /// Filled at the next bar's open (possibly slipped).
    Filled,
    /// Rejected with a reason (end of data, insane fill bar).
    Rejected { reason: String },
}

/// A single order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: f64,
    /// Decision timestamp — the bar whose information produced this order.
    pub requested_at: DateTime<Utc>,
    pub fill_price: Option<f64>,
    pub fill_timestamp: Option<DateTime<Utc>>,
    pub status: OrderStatus,
}

impl Order {
    pub fn pending(
        id: OrderId,
        symbol: String,
        side: OrderSide,
        quantity: f64,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            symbol,
            side,
            quantity,
            requested_at,
            fill_price: None,
            fill_timestamp: None,
            status: OrderStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }

    /// Mark the order filled. The fill timestamp must postdate the request.
    pub fn fill(&mut self, price: f64, timestamp: DateTime<Utc>) {
        debug_assert!(
            timestamp > self.requested_at,
            "fill timestamp must be strictly after decision timestamp"
        );
        self.fill_price = Some(price);
        self.fill_timestamp = Some(timestamp);
        self.status = OrderStatus::Filled;
    }

    pub fn reject(&mut self, reason: &str) {
        self.status = OrderStatus::Rejected {
            reason: reason.to_string(),
        };
    }
}

/// Generates sequential order IDs.
#[derive(Debug, Default)]
pub struct OrderIdGen {
    next: u64,
}

impl OrderIdGen {
    pub fn next_id(&mut self) -> OrderId {
        let id = OrderId(self.next);
        self.next += 1;
        id
    }
}
