//! Signals — a single source's directional opinion, and the fused composite.
//!
//! Signals are portfolio-agnostic and immutable once emitted: they describe
//! a market observation at a point in time, not a downstream decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The analytical source that produced a signal.
///
/// Modeled as a closed enum rather than a string: the fusion engine
/// normalizes over the weights of *present* sources, so membership must be
/// checkable without allocation or typo risk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalSource {
    Indicator,
    Sentiment,
    Pattern,
}

impl SignalSource {
    pub const ALL: [SignalSource; 3] = [
        SignalSource::Indicator,
        SignalSource::Sentiment,
        SignalSource::Pattern,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignalSource::Indicator => "indicator",
            SignalSource::Sentiment => "sentiment",
            SignalSource::Pattern => "pattern",
        }
    }
}

/// Directional intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// +1 for long, -1 for short, 0 for flat.
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
            Direction::Flat => 0.0,
        }
    }

    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
            Direction::Flat => Direction::Flat,
        }
    }
}

/// An immutable directional opinion from exactly one analytical source.
///
/// `strength` and `confidence` are both in [0, 1]. A source that has
/// nothing to say abstains (emits no signal at all) — an abstention is
/// explicitly distinct from a zero-strength signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub source: SignalSource,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    pub strength: f64,
    pub confidence: f64,
}

impl Signal {
    /// Weighted directional contribution: strength * confidence * sign.
    pub fn contribution(&self) -> f64 {
        self.strength * self.confidence * self.direction.sign()
    }
}

/// The fused decision across all available signal sources at one timestamp.
///
/// Derived, never independently created: `CompositeSignal::new` refuses an
/// empty contributing set, so a composite with no inputs cannot exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSignal {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub direction: Direction,
    /// Normalized fusion score in [-1, 1]; sign matches `direction` unless flat.
    pub score: f64,
    /// Sum of configured weights of the sources that contributed.
    pub weight: f64,
    pub contributing_sources: Vec<SignalSource>,
}

impl CompositeSignal {
    /// Build a composite signal. Returns `None` if no sources contributed.
    pub fn new(
        symbol: String,
        timestamp: DateTime<Utc>,
        direction: Direction,
        score: f64,
        weight: f64,
        contributing_sources: Vec<SignalSource>,
    ) -> Option<Self> {
        if contributing_sources.is_empty() {
            return None;
        }
        Some(Self {
            symbol,
            timestamp,
            direction,
            score,
            weight,
            contributing_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn direction_signs() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
        assert_eq!(Direction::Flat.sign(), 0.0);
    }

    #[test]
    fn signal_contribution() {
        let signal = Signal {
            source: SignalSource::Indicator,
            symbol: "SPY".into(),
            timestamp: ts(),
            direction: Direction::Short,
            strength: 0.8,
            confidence: 0.5,
        };
        assert!((signal.contribution() - (-0.4)).abs() < 1e-12);
    }

    #[test]
    fn composite_refuses_empty_sources() {
        let composite = CompositeSignal::new(
            "SPY".into(),
            ts(),
            Direction::Long,
            0.5,
            1.0,
            Vec::new(),
        );
        assert!(composite.is_none());
    }

    #[test]
    fn composite_serialization_roundtrip() {
        let composite = CompositeSignal::new(
            "SPY".into(),
            ts(),
            Direction::Long,
            0.7,
            1.5,
            vec![SignalSource::Indicator, SignalSource::Pattern],
        )
        .unwrap();
        let json = serde_json::to_string(&composite).unwrap();
        let deser: CompositeSignal = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.contributing_sources.len(), 2);
        assert_eq!(deser.direction, Direction::Long);
    }
}
