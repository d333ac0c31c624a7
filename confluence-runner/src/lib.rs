//! Confluence Runner — orchestration around the core engine.
//!
//! Loads bar and sentiment CSVs, fans the universe out across a rayon
//! pool (one independent simulation per symbol), computes performance
//! metrics, and writes JSON/CSV artifacts.

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{RunConfig, RunId};
pub use data_loader::{load_bars, load_sentiment, LoadError};
pub use export::{export_json, import_json, write_artifacts};
pub use metrics::PerformanceMetrics;
pub use runner::{run_symbol, run_universe, SymbolReport, UniverseReport, SCHEMA_VERSION};
