//! Sentiment fusion adapter — converts externally-scored text observations
//! into time-decayed signals.
//!
//! The core never parses text. Observations arrive pre-scored (polarity in
//! [-1, 1]) from an external collaborator and are aggregated with an
//! exponential half-life decay. No observation within the horizon means
//! the source abstains; a feed timeout is also an abstention, logged but
//! never fatal.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::domain::{Direction, Signal, SignalSource};
use crate::error::ConfigError;

/// A pre-scored text observation from the external analysis collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentObservation {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    /// Polarity in [-1, 1]; positive is bullish.
    pub polarity: f64,
}

/// Decay parameters for sentiment aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentConfig {
    /// Age at which an observation's influence halves.
    #[serde(with = "duration_secs")]
    pub half_life: Duration,
    /// Observations older than this are dropped entirely.
    #[serde(with = "duration_secs")]
    pub horizon: Duration,
    /// Decayed polarity magnitudes below this read as flat, not directional.
    pub neutral_band: f64,
}

impl SentimentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.half_life <= Duration::zero() || self.horizon <= Duration::zero() {
            return Err(ConfigError::InvalidSentimentWindow);
        }
        if !self.neutral_band.is_finite() || self.neutral_band < 0.0 {
            return Err(ConfigError::NonPositive {
                name: "sentiment.neutral_band",
                value: self.neutral_band,
            });
        }
        Ok(())
    }
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            half_life: Duration::days(1),
            horizon: Duration::days(7),
            neutral_band: 0.05,
        }
    }
}

/// Serde helper: chrono::Duration as whole seconds.
mod duration_secs {
    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(d.num_seconds())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = i64::deserialize(d)?;
        Ok(Duration::seconds(secs))
    }
}

/// Outcome of polling the external sentiment feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedOutcome {
    Observations(Vec<SentimentObservation>),
    /// The feed did not answer within the timeout. Treated as abstention.
    TimedOut,
}

/// Boundary trait for a live sentiment feed.
///
/// `poll` must return within `timeout`; implementations that cannot answer
/// in time return `FeedOutcome::TimedOut` rather than blocking the bar
/// advance.
pub trait SentimentFeed: Send + Sync {
    fn poll(&self, symbol: &str, as_of: DateTime<Utc>, timeout: Duration) -> FeedOutcome;
}

/// Time-decayed sentiment aggregator.
#[derive(Debug, Clone)]
pub struct SentimentAdapter {
    config: SentimentConfig,
    observations: Vec<SentimentObservation>,
}

impl SentimentAdapter {
    pub fn new(config: SentimentConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            observations: Vec::new(),
        })
    }

    /// Ingest an observation from the external boundary.
    ///
    /// Out-of-range polarity is skipped with a diagnostic — the collaborator
    /// promised [-1, 1] and silently clamping would hide its bug.
    pub fn ingest(&mut self, obs: SentimentObservation) {
        if !obs.polarity.is_finite() || obs.polarity.abs() > 1.0 {
            warn!(symbol = %obs.symbol, polarity = obs.polarity, "skipping out-of-range sentiment observation");
            return;
        }
        self.observations.push(obs);
    }

    pub fn ingest_all(&mut self, observations: impl IntoIterator<Item = SentimentObservation>) {
        for obs in observations {
            self.ingest(obs);
        }
    }

    /// Drain timed-feed results into the buffer; timeout becomes abstention.
    pub fn poll_feed(&mut self, feed: &dyn SentimentFeed, symbol: &str, as_of: DateTime<Utc>, timeout: Duration) {
        match feed.poll(symbol, as_of, timeout) {
            FeedOutcome::Observations(batch) => self.ingest_all(batch),
            FeedOutcome::TimedOut => {
                warn!(symbol, %as_of, "sentiment feed timed out; abstaining for this bar");
            }
        }
    }

    /// Decay weight for an observation of the given age.
    pub fn decay_weight(&self, age: Duration) -> f64 {
        let half_lives = age.num_milliseconds() as f64 / self.config.half_life.num_milliseconds() as f64;
        0.5_f64.powf(half_lives)
    }

    /// Aggregate decayed sentiment for (symbol, t).
    ///
    /// Uses only observations with `timestamp <= t` and age within the
    /// horizon. The aggregate is `sum(w_i * p_i) / max(sum(w_i), 1)`: with
    /// ample fresh coverage this is the decay-weighted mean, while a single
    /// stale observation contributes only its decayed weight rather than
    /// being renormalized back to full strength.
    pub fn signal_at(&self, symbol: &str, t: DateTime<Utc>) -> Option<Signal> {
        let mut weight_sum = 0.0;
        let mut weighted_polarity = 0.0;
        for obs in &self.observations {
            if obs.symbol != symbol || obs.timestamp > t {
                continue;
            }
            let age = t - obs.timestamp;
            if age > self.config.horizon {
                continue;
            }
            let w = self.decay_weight(age);
            weight_sum += w;
            weighted_polarity += w * obs.polarity;
        }

        if weight_sum == 0.0 {
            return None;
        }

        let aggregate = weighted_polarity / weight_sum.max(1.0);
        let direction = if aggregate > self.config.neutral_band {
            Direction::Long
        } else if aggregate < -self.config.neutral_band {
            Direction::Short
        } else {
            Direction::Flat
        };

        Some(Signal {
            source: SignalSource::Sentiment,
            symbol: symbol.to_string(),
            timestamp: t,
            direction,
            strength: aggregate.abs().min(1.0),
            confidence: weight_sum.min(1.0),
        })
    }
}
