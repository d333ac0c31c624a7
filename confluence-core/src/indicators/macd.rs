//! MACD histogram vote (EMA fast/slow with a signal-line EMA).

use crate::domain::{Bar, Direction};

use super::{Indicator, IndicatorVote};

/// MACD(fast, slow, signal) voting by histogram sign, gated on agreement
/// with the MACD line's own sign.
///
/// The histogram alone reverts toward zero while an old trend merely
/// decays, which reads as a reversal that is not there; when the two
/// disagree the indicator abstains. Strength is the histogram magnitude
/// relative to 0.5% of the last close, saturating at 1.0.
#[derive(Debug, Clone)]
pub struct MacdCross {
    fast: usize,
    slow: usize,
    signal: usize,
    name: String,
}

impl MacdCross {
    pub fn new(fast: usize, slow: usize, signal: usize) -> Self {
        assert!(fast >= 1 && slow > fast, "need slow > fast >= 1");
        assert!(signal >= 1, "signal period must be >= 1");
        Self {
            fast,
            slow,
            signal,
            name: format!("macd_{fast}_{slow}_{signal}"),
        }
    }

    pub fn standard() -> Self {
        Self::new(12, 26, 9)
    }
}

/// EMA series over `values` with the conventional alpha = 2/(period+1).
/// Seeded with the first value.
fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev = match values.first() {
        Some(&v) => v,
        None => return out,
    };
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

impl Indicator for MacdCross {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.slow + self.signal
    }

    fn vote(&self, window: &[Bar]) -> Option<IndicatorVote> {
        if window.len() < self.lookback() {
            return None;
        }
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
        let fast = ema_series(&closes, self.fast);
        let slow = ema_series(&closes, self.slow);
        let macd: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
        let signal_line = ema_series(&macd, self.signal);

        let macd_last = *macd.last()?;
        let hist = macd_last - signal_line.last()?;
        let last_close = *closes.last()?;
        if !hist.is_finite() || !macd_last.is_finite() || last_close <= 0.0 {
            return None;
        }
        if hist == 0.0 || macd_last == 0.0 {
            return None;
        }
        // A decaying trend pulls the histogram across zero while the MACD
        // line keeps its sign; that is exhaustion, not a reversal.
        if (hist > 0.0) != (macd_last > 0.0) {
            return None;
        }
        let direction = if hist > 0.0 {
            Direction::Long
        } else {
            Direction::Short
        };
        Some(IndicatorVote {
            direction,
            strength: (hist.abs() / (last_close * 0.005)).min(1.0),
        })
    }
}
