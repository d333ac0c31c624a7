//! Serializable run configuration.
//!
//! A `RunConfig` captures everything needed to reproduce a run: the
//! universe, data locations, the full engine configuration, and the
//! reporting parameters. Its blake3 hash is the run's identity; two runs
//! with identical configs get the same `RunId`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use confluence_core::config::EngineConfig;
use serde::{Deserialize, Serialize};

/// Content-addressable run identifier.
pub type RunId = String;

/// Full configuration for one universe run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Symbols to simulate, one independent run each.
    pub universe: Vec<String>,
    /// Directory of per-symbol bar CSVs (`<SYMBOL>.csv`).
    pub data_dir: PathBuf,
    /// Optional sentiment observation CSV covering the whole universe.
    #[serde(default)]
    pub sentiment_file: Option<PathBuf>,
    /// Annualized risk-free rate for the Sharpe ratio.
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub engine: EngineConfig,
}

impl RunConfig {
    /// Load and validate a TOML config file.
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: RunConfig = toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.universe.is_empty(), "universe must not be empty");
        anyhow::ensure!(
            self.risk_free_rate.is_finite() && self.risk_free_rate >= 0.0,
            "risk_free_rate must be finite and >= 0, got {}",
            self.risk_free_rate
        );
        self.engine
            .validate()
            .context("invalid engine configuration")?;
        Ok(())
    }

    /// Deterministic hash ID for this configuration.
    pub fn run_id(&self) -> Result<RunId> {
        let json = serde_json::to_string(self).context("RunConfig serialization failed")?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            universe: vec!["SPY".to_string()],
            data_dir: PathBuf::from("data"),
            sentiment_file: None,
            risk_free_rate: 0.0,
            engine: EngineConfig::default(),
        }
    }
}
