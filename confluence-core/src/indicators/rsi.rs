//! Relative Strength Index with Wilder smoothing.
//!
//! Contrarian vote: oversold (< 30) votes long, overbought (> 70) votes
//! short, the neutral zone abstains. Strength scales with the distance
//! into the extreme zone.

use crate::domain::{Bar, Direction};

use super::{Indicator, IndicatorVote};

const OVERBOUGHT: f64 = 70.0;
const OVERSOLD: f64 = 30.0;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }

    /// Compute the RSI value for the last bar of the window.
    ///
    /// Wilder smoothing: seed averages over the first `period` deltas, then
    /// exponential with alpha = 1/period. Needs `period + 1` bars.
    fn value(&self, window: &[Bar]) -> Option<f64> {
        if window.len() < self.period + 1 {
            return None;
        }
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
        let mut gains = 0.0;
        let mut losses = 0.0;
        for w in closes[..=self.period].windows(2) {
            let delta = w[1] - w[0];
            if delta > 0.0 {
                gains += delta;
            } else {
                losses += -delta;
            }
        }
        let mut avg_gain = gains / self.period as f64;
        let mut avg_loss = losses / self.period as f64;

        let alpha = 1.0 / self.period as f64;
        for w in closes[self.period..].windows(2) {
            let delta = w[1] - w[0];
            let gain = delta.max(0.0);
            let loss = (-delta).max(0.0);
            avg_gain = alpha * gain + (1.0 - alpha) * avg_gain;
            avg_loss = alpha * loss + (1.0 - alpha) * avg_loss;
        }

        if avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = avg_gain / avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period + 1
    }

    fn vote(&self, window: &[Bar]) -> Option<IndicatorVote> {
        let rsi = self.value(window)?;
        if !rsi.is_finite() {
            return None;
        }
        if rsi >= OVERBOUGHT {
            Some(IndicatorVote {
                direction: Direction::Short,
                strength: ((rsi - OVERBOUGHT) / (100.0 - OVERBOUGHT)).min(1.0),
            })
        } else if rsi <= OVERSOLD {
            Some(IndicatorVote {
                direction: Direction::Long,
                strength: ((OVERSOLD - rsi) / OVERSOLD).min(1.0),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn monotone_rise_is_overbought_short() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let bars = make_bars(&closes);
        let vote = Rsi::new(14).vote(&bars).unwrap();
        assert_eq!(vote.direction, Direction::Short);
        assert_eq!(vote.strength, 1.0); // RSI = 100, fully into the zone
    }

    #[test]
    fn monotone_fall_is_oversold_long() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 - i as f64 * 0.5).collect();
        let bars = make_bars(&closes);
        let vote = Rsi::new(14).vote(&bars).unwrap();
        assert_eq!(vote.direction, Direction::Long);
        assert!(vote.strength > 0.9);
    }

    #[test]
    fn neutral_zone_abstains() {
        // Alternating small moves keep RSI near 50.
        let closes: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 100.0 } else { 100.5 })
            .collect();
        let bars = make_bars(&closes);
        assert!(Rsi::new(14).vote(&bars).is_none());
    }

    #[test]
    fn abstains_below_lookback() {
        let bars = make_bars(&[100.0, 101.0, 102.0]);
        assert!(Rsi::new(14).vote(&bars).is_none());
    }
}
