//! Aggregate engine configuration.
//!
//! One struct gathers every subsystem's parameters so a run can be
//! described by a single deserializable document. `validate()` delegates
//! to each section and fails on the first violation; nothing is clamped.

use serde::{Deserialize, Serialize};

use crate::engine::{CostConfig, SimulatorConfig};
use crate::error::ConfigError;
use crate::fusion::FusionConfig;
use crate::patterns::PatternConfig;
use crate::risk::RiskConfig;
use crate::sentiment::SentimentConfig;

/// Full engine configuration for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub simulator: SimulatorConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub risk: RiskConfig,
    #[serde(default)]
    pub sentiment: SentimentConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub costs: CostConfig,
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulator.validate()?;
        self.fusion.validate()?;
        self.risk.validate()?;
        self.sentiment.validate()?;
        self.patterns.validate()?;
        self.costs.validate()?;
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            fusion: FusionConfig::default(),
            risk: RiskConfig::default(),
            sentiment: SentimentConfig::default(),
            patterns: PatternConfig::default(),
            costs: CostConfig::default(),
        }
    }
}
