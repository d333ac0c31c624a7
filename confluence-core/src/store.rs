//! Bar store — ordered, append-only sequence of bars for one symbol.
//!
//! The store is the single ingestion point for market data. It enforces
//! strictly increasing timestamps and OHLC sanity; a rejected bar is
//! skipped with a diagnostic, never silently accepted. Downstream readers
//! only ever see trailing windows ending at an index, so nothing past the
//! simulator's cursor can leak into a decision.

use tracing::warn;

use crate::domain::Bar;
use crate::error::DataError;

/// Ordered, immutable-once-stored bar sequence for a single symbol.
#[derive(Debug, Clone)]
pub struct BarStore {
    symbol: String,
    bars: Vec<Bar>,
    skipped: usize,
}

impl BarStore {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            bars: Vec::new(),
            skipped: 0,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Count of bars rejected so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn get(&self, index: usize) -> Option<&Bar> {
        self.bars.get(index)
    }

    /// Trailing window of up to `len` bars ending at `end` (inclusive).
    ///
    /// Returns fewer bars than requested near the start of history; callers
    /// that need a full lookback abstain on a short window.
    pub fn window(&self, len: usize, end: usize) -> &[Bar] {
        if end >= self.bars.len() {
            return &[];
        }
        let start = (end + 1).saturating_sub(len);
        &self.bars[start..=end]
    }

    /// All bars up to and including `end`.
    pub fn up_to(&self, end: usize) -> &[Bar] {
        if end >= self.bars.len() {
            return &self.bars;
        }
        &self.bars[..=end]
    }

    /// Append a bar, enforcing symbol match, ordering, and sanity.
    ///
    /// On rejection the bar is skipped (counted, logged by the caller or
    /// here) and the specific violation is returned.
    pub fn append(&mut self, bar: Bar) -> Result<(), DataError> {
        if bar.symbol != self.symbol {
            self.skipped += 1;
            return Err(DataError::SymbolMismatch {
                expected: self.symbol.clone(),
                actual: bar.symbol,
            });
        }
        if let Some(last) = self.bars.last() {
            if bar.timestamp == last.timestamp {
                self.skipped += 1;
                warn!(symbol = %self.symbol, timestamp = %bar.timestamp, "skipping duplicate bar");
                return Err(DataError::DuplicateBar {
                    symbol: self.symbol.clone(),
                    timestamp: bar.timestamp.to_rfc3339(),
                });
            }
            if bar.timestamp < last.timestamp {
                self.skipped += 1;
                warn!(symbol = %self.symbol, timestamp = %bar.timestamp, "skipping out-of-order bar");
                return Err(DataError::OutOfOrderBar {
                    symbol: self.symbol.clone(),
                    timestamp: bar.timestamp.to_rfc3339(),
                    last_seen: last.timestamp.to_rfc3339(),
                });
            }
        }
        if !bar.is_sane() {
            self.skipped += 1;
            warn!(symbol = %self.symbol, timestamp = %bar.timestamp, "skipping malformed bar");
            return Err(DataError::MalformedBar {
                symbol: self.symbol.clone(),
                timestamp: bar.timestamp.to_rfc3339(),
                detail: if bar.has_nan() {
                    "NaN price".into()
                } else {
                    "OHLC range violation".into()
                },
            });
        }
        self.bars.push(bar);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(day: u32, close: f64) -> Bar {
        Bar {
            symbol: "SPY".into(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    #[test]
    fn append_in_order() {
        let mut store = BarStore::new("SPY");
        store.append(bar(2, 100.0)).unwrap();
        store.append(bar(3, 101.0)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.skipped(), 0);
    }

    #[test]
    fn rejects_duplicate_timestamp() {
        let mut store = BarStore::new("SPY");
        store.append(bar(2, 100.0)).unwrap();
        let err = store.append(bar(2, 101.0)).unwrap_err();
        assert!(matches!(err, DataError::DuplicateBar { .. }));
        assert_eq!(store.len(), 1);
        assert_eq!(store.skipped(), 1);
    }

    #[test]
    fn rejects_out_of_order() {
        let mut store = BarStore::new("SPY");
        store.append(bar(5, 100.0)).unwrap();
        let err = store.append(bar(3, 99.0)).unwrap_err();
        assert!(matches!(err, DataError::OutOfOrderBar { .. }));
    }

    #[test]
    fn rejects_nan_bar() {
        let mut store = BarStore::new("SPY");
        let mut b = bar(2, 100.0);
        b.close = f64::NAN;
        let err = store.append(b).unwrap_err();
        assert!(matches!(err, DataError::MalformedBar { .. }));
    }

    #[test]
    fn rejects_symbol_mismatch() {
        let mut store = BarStore::new("SPY");
        let mut b = bar(2, 100.0);
        b.symbol = "QQQ".into();
        let err = store.append(b).unwrap_err();
        assert!(matches!(err, DataError::SymbolMismatch { .. }));
    }

    #[test]
    fn window_is_trailing_and_bounded() {
        let mut store = BarStore::new("SPY");
        for day in 2..=10 {
            store.append(bar(day, 100.0 + day as f64)).unwrap();
        }
        let w = store.window(3, 4);
        assert_eq!(w.len(), 3);
        assert_eq!(w[2].close, store.get(4).unwrap().close);

        // Near the start of history the window is short, not padded.
        let w = store.window(5, 1);
        assert_eq!(w.len(), 2);
    }

    #[test]
    fn window_past_end_is_empty() {
        let mut store = BarStore::new("SPY");
        store.append(bar(2, 100.0)).unwrap();
        assert!(store.window(3, 5).is_empty());
    }
}
