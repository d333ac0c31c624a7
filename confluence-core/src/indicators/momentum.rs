//! Momentum — rate of change over the lookback window.
//!
//! Votes long when price rose across the window, short when it fell.
//! Strength scales linearly with the magnitude of the move, saturating at
//! `full_strength_roc` (default 5%).

use crate::domain::{Bar, Direction};

use super::{Indicator, IndicatorVote};

/// Rate of change of the lookback window's closes (default full strength at 5%).
#[derive(Debug, Clone)]
pub struct Momentum {
    period: usize,
    full_strength_roc: f64,
    name: String,
}

impl Momentum {
    pub fn new(period: usize) -> Self {
        Self::with_scale(period, 0.05)
    }

    pub fn with_scale(period: usize, full_strength_roc: f64) -> Self {
        assert!(period >= 2, "momentum period must be >= 2");
        assert!(full_strength_roc > 0.0, "roc scale must be > 0");
        Self {
            period,
            full_strength_roc,
            name: format!("momentum_{period}"),
        }
    }
}

impl Indicator for Momentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn vote(&self, window: &[Bar]) -> Option<IndicatorVote> {
        if window.len() < self.period {
            return None;
        }
        let recent = &window[window.len() - self.period..];
        let first = recent[0].close;
        let last = recent[self.period - 1].close;
        if first <= 0.0 || !first.is_finite() || !last.is_finite() {
            return None;
        }
        let roc = (last - first) / first;
        let direction = if roc > 0.0 {
            Direction::Long
        } else if roc < 0.0 {
            Direction::Short
        } else {
            Direction::Flat
        };
        Some(IndicatorVote {
            direction,
            strength: (roc.abs() / self.full_strength_roc).min(1.0),
        })
    }
}
