//! Error taxonomy.
//!
//! Abstentions (insufficient lookback, no sentiment in horizon, no pattern
//! match) are not errors — producers simply return `None`. Only startup
//! validation failures and systemic data-integrity violations surface here.

use thiserror::Error;

/// Data-integrity problems at the bar ingestion boundary.
///
/// A single rejected bar is skipped and logged; the simulator aborts only
/// when rejections exceed the configured tolerance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("bar for {symbol} at {timestamp} is out of order (last seen {last_seen})")]
    OutOfOrderBar {
        symbol: String,
        timestamp: String,
        last_seen: String,
    },
    #[error("duplicate bar timestamp {timestamp} for {symbol}")]
    DuplicateBar { symbol: String, timestamp: String },
    #[error("malformed bar for {symbol} at {timestamp}: {detail}")]
    MalformedBar {
        symbol: String,
        timestamp: String,
        detail: String,
    },
    #[error("symbol mismatch: expected {expected}, got {actual}")]
    SymbolMismatch { expected: String, actual: String },
}

/// Invalid configuration, detected at startup before any simulation.
///
/// Validation fails fast and never silently clamps.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("source weight for {name} must be finite and >= 0, got {value}")]
    InvalidWeight { name: &'static str, value: f64 },
    #[error("all source weights are zero; at least one must be positive")]
    AllWeightsZero,
    #[error("entry threshold must be finite and >= 0, got {0}")]
    InvalidThreshold(f64),
    #[error("{name} must be in (0, 1], got {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },
    #[error("{name} must be > 0, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("{name} must be >= 1, got {value}")]
    ZeroPeriod { name: &'static str, value: usize },
    #[error("sentiment half-life and horizon must be positive durations")]
    InvalidSentimentWindow,
    #[error("pattern template '{0}' is empty or contains non-finite values")]
    InvalidTemplate(String),
    #[error("duplicate indicator name '{0}' in registry")]
    DuplicateIndicator(String),
    #[error("indicator '{0}' declares a zero lookback")]
    ZeroLookback(String),
    #[error("initial capital must be positive, got {0}")]
    InvalidCapital(f64),
}
