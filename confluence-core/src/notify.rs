//! Notification hooks for direction changes and run lifecycle events.
//!
//! The simulator only ever calls the trait; production wires in the logging
//! notifier, tests wire in a recorder.

use crate::domain::{CompositeSignal, Direction, TradeRecord};
use tracing::info;

/// Receives significant simulation events. Implementations must not panic;
/// a notifier failure must never alter simulation results.
pub trait Notifier: Send {
    /// Composite direction differs from the previous bar's direction.
    fn direction_changed(&mut self, previous: Direction, composite: &CompositeSignal);

    /// A round-trip trade completed.
    fn trade_closed(&mut self, trade: &TradeRecord);
}

/// Default notifier: structured log lines, nothing else.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn direction_changed(&mut self, previous: Direction, composite: &CompositeSignal) {
        info!(
            symbol = %composite.symbol,
            timestamp = %composite.timestamp,
            ?previous,
            current = ?composite.direction,
            score = composite.score,
            "composite direction changed"
        );
    }

    fn trade_closed(&mut self, trade: &TradeRecord) {
        info!(
            symbol = %trade.symbol,
            net_pnl = trade.net_pnl,
            reason = ?trade.exit_reason,
            "trade closed"
        );
    }
}

/// Discards everything. Useful when running parameter sweeps.
#[derive(Debug, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn direction_changed(&mut self, _: Direction, _: &CompositeSignal) {}
    fn trade_closed(&mut self, _: &TradeRecord) {}
}
