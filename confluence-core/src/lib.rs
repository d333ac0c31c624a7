//! Confluence Core — signal fusion and event-driven backtesting engine.
//!
//! This crate contains the heart of the system:
//! - Domain types (bars, signals, orders, positions, portfolio, trades)
//! - Ordered bar store with ingestion-time integrity checks
//! - Three signal sources: indicator pipeline, sentiment adapter, pattern matcher
//! - Weighted fusion into a composite signal
//! - Risk manager with ATR sizing and a drawdown circuit breaker
//! - Bar-by-bar simulator with next-bar-open fills (no lookahead by construction)

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod fusion;
pub mod indicators;
pub mod notify;
pub mod patterns;
pub mod risk;
pub mod sentiment;
pub mod store;
