//! Indicator pipeline — technical-analysis signal source.
//!
//! Each indicator is a deterministic pure function of a trailing bar window.
//! It declares a minimum lookback; given a shorter window (or malformed
//! input) it abstains rather than producing a degenerate value. The
//! pipeline fuses individual indicator votes into at most one `Signal` per
//! (symbol, timestamp) with `source = Indicator`.

pub mod atr;
pub mod macd;
pub mod momentum;
pub mod rsi;
pub mod sma_cross;

pub use atr::average_true_range;
pub use macd::MacdCross;
pub use momentum::Momentum;
pub use rsi::Rsi;
pub use sma_cross::SmaCross;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::{Bar, Direction, Signal, SignalSource};
use crate::error::ConfigError;

/// A single indicator's directional vote.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorVote {
    pub direction: Direction,
    /// Vote strength in [0, 1].
    pub strength: f64,
}

impl IndicatorVote {
    pub fn signed(&self) -> f64 {
        self.strength * self.direction.sign()
    }
}

/// Trait for technical indicators.
///
/// `vote` must only read the window it is given; the simulator hands it a
/// trailing window ending at the decision bar, which is what makes the
/// no-lookahead property hold for this source.
pub trait Indicator: Send + Sync {
    /// Registry name (e.g., "momentum_3").
    fn name(&self) -> &str;

    /// Minimum number of bars required before a vote can be produced.
    fn lookback(&self) -> usize;

    /// Evaluate on a trailing window ending at the decision bar.
    ///
    /// Returns `None` to abstain (insufficient history, neutral reading,
    /// or malformed input).
    fn vote(&self, window: &[Bar]) -> Option<IndicatorVote>;
}

/// Explicit indicator registry, validated at startup.
pub struct IndicatorSet {
    indicators: Vec<Box<dyn Indicator>>,
}

impl IndicatorSet {
    /// Build a registry. Fails fast on duplicate names or zero lookbacks.
    pub fn new(indicators: Vec<Box<dyn Indicator>>) -> Result<Self, ConfigError> {
        let mut seen: Vec<&str> = Vec::new();
        for ind in &indicators {
            if ind.lookback() == 0 {
                return Err(ConfigError::ZeroLookback(ind.name().to_string()));
            }
            if seen.contains(&ind.name()) {
                return Err(ConfigError::DuplicateIndicator(ind.name().to_string()));
            }
            seen.push(ind.name());
        }
        Ok(Self { indicators })
    }

    pub fn is_empty(&self) -> bool {
        self.indicators.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indicators.len()
    }

    /// Largest declared lookback across the registry (0 if empty).
    pub fn max_lookback(&self) -> usize {
        self.indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
    }

    /// Evaluate the whole pipeline on a trailing window ending at `timestamp`.
    ///
    /// Individual indicators abstain independently; the pipeline abstains
    /// only when every indicator abstained. A malformed window (NaN close)
    /// makes every indicator abstain and is logged once here.
    pub fn evaluate(
        &self,
        symbol: &str,
        timestamp: DateTime<Utc>,
        window: &[Bar],
    ) -> Option<Signal> {
        if self.indicators.is_empty() || window.is_empty() {
            return None;
        }
        if window.iter().any(|b| b.has_nan()) {
            warn!(symbol, %timestamp, "indicator window contains NaN bars; abstaining");
            return None;
        }

        let votes: Vec<IndicatorVote> = self
            .indicators
            .iter()
            .filter_map(|ind| {
                if window.len() < ind.lookback() {
                    return None;
                }
                ind.vote(window)
            })
            .collect();

        if votes.is_empty() {
            return None;
        }

        let mean: f64 = votes.iter().map(|v| v.signed()).sum::<f64>() / votes.len() as f64;
        let direction = if mean > 0.0 {
            Direction::Long
        } else if mean < 0.0 {
            Direction::Short
        } else {
            Direction::Flat
        };

        Some(Signal {
            source: SignalSource::Indicator,
            symbol: symbol.to_string(),
            timestamp,
            direction,
            strength: mean.abs().min(1.0),
            confidence: votes.len() as f64 / self.indicators.len() as f64,
        })
    }
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev close (or close for the first
/// bar), high/low bracket open and close by 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    use chrono::TimeZone;
    let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                symbol: "TEST".to_string(),
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_rejects_duplicate_names() {
        let result = IndicatorSet::new(vec![
            Box::new(Momentum::new(3)),
            Box::new(Momentum::new(3)),
        ]);
        assert!(matches!(result, Err(ConfigError::DuplicateIndicator(_))));
    }

    #[test]
    fn registry_accepts_distinct_periods() {
        let set = IndicatorSet::new(vec![
            Box::new(Momentum::new(3)),
            Box::new(Momentum::new(5)),
        ])
        .unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.max_lookback(), 5);
    }

    #[test]
    fn pipeline_abstains_with_short_window() {
        let set = IndicatorSet::new(vec![Box::new(Momentum::new(5))]).unwrap();
        let bars = make_bars(&[100.0, 101.0]);
        let ts = bars.last().unwrap().timestamp;
        assert!(set.evaluate("TEST", ts, &bars).is_none());
    }

    #[test]
    fn pipeline_abstains_on_nan_window() {
        let set = IndicatorSet::new(vec![Box::new(Momentum::new(3))]).unwrap();
        let mut bars = make_bars(&[100.0, 101.0, 102.0, 103.0]);
        bars[1].close = f64::NAN;
        let ts = bars.last().unwrap().timestamp;
        assert!(set.evaluate("TEST", ts, &bars).is_none());
    }

    #[test]
    fn pipeline_emits_long_on_rising_closes() {
        let set = IndicatorSet::new(vec![Box::new(Momentum::new(3))]).unwrap();
        let bars = make_bars(&[100.0, 102.0, 104.0, 106.0]);
        let ts = bars.last().unwrap().timestamp;
        let signal = set.evaluate("TEST", ts, &bars).unwrap();
        assert_eq!(signal.direction, Direction::Long);
        assert_eq!(signal.source, SignalSource::Indicator);
        assert!(signal.strength > 0.0);
        assert!((signal.confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn confidence_reflects_abstaining_members() {
        // Momentum(3) can vote on 4 bars; Momentum(10) cannot.
        let set = IndicatorSet::new(vec![
            Box::new(Momentum::new(3)),
            Box::new(Momentum::new(10)),
        ])
        .unwrap();
        let bars = make_bars(&[100.0, 102.0, 104.0, 106.0]);
        let ts = bars.last().unwrap().timestamp;
        let signal = set.evaluate("TEST", ts, &bars).unwrap();
        assert!((signal.confidence - 0.5).abs() < 1e-12);
    }
}
