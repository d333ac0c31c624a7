//! Signal fusion — combines per-source signals into one composite score.
//!
//! Score = sum(weight_s * contribution_s) / sum(weight_s over PRESENT
//! sources). Normalizing by present weights only means an abstaining source
//! neither helps nor hurts; it simply drops out. A flat signal with nonzero
//! confidence is different: it is present, so its weight dilutes the score.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{CompositeSignal, Direction, Signal, SignalSource};
use crate::error::ConfigError;

/// Per-source weights plus the entry threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub indicator_weight: f64,
    pub sentiment_weight: f64,
    pub pattern_weight: f64,
    /// Composite |score| must reach this for a directional composite.
    pub entry_threshold: f64,
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for source in SignalSource::ALL {
            let w = self.weight(source);
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: source.name(),
                    value: w,
                });
            }
        }
        if self.indicator_weight == 0.0 && self.sentiment_weight == 0.0 && self.pattern_weight == 0.0
        {
            return Err(ConfigError::AllWeightsZero);
        }
        if !self.entry_threshold.is_finite() || self.entry_threshold < 0.0 {
            return Err(ConfigError::InvalidThreshold(self.entry_threshold));
        }
        Ok(())
    }

    pub fn weight(&self, source: SignalSource) -> f64 {
        match source {
            SignalSource::Indicator => self.indicator_weight,
            SignalSource::Sentiment => self.sentiment_weight,
            SignalSource::Pattern => self.pattern_weight,
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            indicator_weight: 0.5,
            sentiment_weight: 0.25,
            pattern_weight: 0.25,
            entry_threshold: 0.3,
        }
    }
}

/// Weighted-average fusion over whichever sources spoke this bar.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Fuse at most one signal per source into a composite.
    ///
    /// Returns `None` when no weighted source contributed — unanimous
    /// abstention produces no composite at all. A composite whose |score|
    /// is below the entry threshold comes back with `Direction::Flat` so
    /// downstream still sees that sources spoke.
    pub fn fuse(&self, signals: &[Signal]) -> Option<CompositeSignal> {
        let mut seen: HashMap<SignalSource, &Signal> = HashMap::new();
        for signal in signals {
            // Last write wins, but producers emit at most one per source.
            seen.insert(signal.source, signal);
        }

        let mut weighted_sum = 0.0;
        let mut present_weight = 0.0;
        let mut contributing = Vec::new();
        let (symbol, timestamp) = {
            let first = signals.first()?;
            (first.symbol.clone(), first.timestamp)
        };

        for source in SignalSource::ALL {
            let weight = self.config.weight(source);
            if weight == 0.0 {
                continue;
            }
            if let Some(signal) = seen.get(&source) {
                weighted_sum += weight * signal.contribution();
                present_weight += weight;
                contributing.push(source);
            }
        }

        if present_weight == 0.0 {
            return None;
        }

        let score = weighted_sum / present_weight;
        // Directional only strictly beyond the threshold; a zero score is
        // flat even at a zero threshold.
        let direction = if score.abs() <= self.config.entry_threshold || score == 0.0 {
            Direction::Flat
        } else if score > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };
        debug!(
            %symbol,
            score,
            sources = contributing.len(),
            "fused composite signal"
        );
        CompositeSignal::new(symbol, timestamp, direction, score, present_weight, contributing)
    }
}
