//! Domain types: bars, signals, orders, positions, portfolio, trades.

pub mod bar;
pub mod order;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod trade;

pub use bar::Bar;
pub use order::{Order, OrderId, OrderIdGen, OrderSide, OrderStatus};
pub use portfolio::{EquityPoint, Portfolio};
pub use position::Position;
pub use signal::{CompositeSignal, Direction, Signal, SignalSource};
pub use trade::{ExitReason, TradeRecord};
