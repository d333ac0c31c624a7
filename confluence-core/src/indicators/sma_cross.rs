//! Simple moving average crossover vote.

use crate::domain::{Bar, Direction};

use super::{Indicator, IndicatorVote};

/// Fast/slow SMA comparison: fast above slow votes long, below votes short.
///
/// Strength is the relative gap between the averages, full strength at a
/// 2% spread. Equal averages abstain.
#[derive(Debug, Clone)]
pub struct SmaCross {
    fast: usize,
    slow: usize,
    name: String,
}

impl SmaCross {
    pub fn new(fast: usize, slow: usize) -> Self {
        assert!(fast >= 1 && slow > fast, "need slow > fast >= 1");
        Self {
            fast,
            slow,
            name: format!("sma_cross_{fast}_{slow}"),
        }
    }
}

fn sma(closes: &[f64], period: usize) -> f64 {
    closes[closes.len() - period..].iter().sum::<f64>() / period as f64
}

impl Indicator for SmaCross {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow
    }

    fn vote(&self, window: &[Bar]) -> Option<IndicatorVote> {
        if window.len() < self.slow {
            return None;
        }
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
        let fast = sma(&closes, self.fast);
        let slow = sma(&closes, self.slow);
        if !fast.is_finite() || !slow.is_finite() || slow <= 0.0 {
            return None;
        }
        let spread = (fast - slow) / slow;
        if spread == 0.0 {
            return None;
        }
        let direction = if spread > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };
        Some(IndicatorVote {
            direction,
            strength: (spread.abs() / 0.02).min(1.0),
        })
    }
}
