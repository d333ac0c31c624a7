//! Average True Range — the volatility estimate used for position sizing
//! and protective exit levels.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|).
//! ATR here is a simple mean of the last `period` true ranges, which is
//! what the risk manager needs; it is not a voting indicator.

use crate::domain::Bar;

/// True range of `bar` given the previous close (plain high-low if none).
pub fn true_range(bar: &Bar, prev_close: Option<f64>) -> f64 {
    let high_low = bar.high - bar.low;
    match prev_close {
        Some(pc) => high_low.max((bar.high - pc).abs()).max((bar.low - pc).abs()),
        None => high_low,
    }
}

/// ATR over the last `period` bars of the window.
///
/// Returns `None` on insufficient history, a non-positive result, or NaN
/// input — callers treat all three as "cannot size".
pub fn average_true_range(window: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || window.len() < period + 1 {
        return None;
    }
    let recent = &window[window.len() - (period + 1)..];
    // f64::max ignores NaN operands, so a NaN price could slip through the
    // true-range math as a finite value; screen the bars up front.
    if recent.iter().any(|b| b.has_nan()) {
        return None;
    }
    let mut sum = 0.0;
    for i in 1..recent.len() {
        sum += true_range(&recent[i], Some(recent[i - 1].close));
    }
    let atr = sum / period as f64;
    if atr.is_finite() && atr > 0.0 {
        Some(atr)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| Bar {
                symbol: "TEST".to_string(),
                timestamp: base + chrono::Duration::days(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    #[test]
    fn true_range_uses_prev_close_gap() {
        let bars = ohlc_bars(&[(98.0, 102.0, 97.0, 100.0), (110.0, 115.0, 108.0, 112.0)]);
        // Gap up: TR = max(7, |115-100|, |108-100|) = 15
        let tr = true_range(&bars[1], Some(bars[0].close));
        assert!((tr - 15.0).abs() < 1e-10);
    }

    #[test]
    fn atr_is_mean_of_true_ranges() {
        let bars = ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
        ]);
        let atr = average_true_range(&bars, 3).unwrap();
        assert!((atr - 23.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn atr_requires_period_plus_one_bars() {
        let bars = ohlc_bars(&[(100.0, 105.0, 95.0, 102.0), (102.0, 108.0, 100.0, 106.0)]);
        assert!(average_true_range(&bars, 3).is_none());
    }

    #[test]
    fn atr_rejects_nan() {
        let mut bars = ohlc_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 107.0, 98.0, 99.0),
        ]);
        bars[1].high = f64::NAN;
        assert!(average_true_range(&bars, 2).is_none());
    }
}
