//! CSV data loading for bars and sentiment observations.
//!
//! Bars live in one CSV per symbol (`<SYMBOL>.csv`) with columns
//! `timestamp,open,high,low,close,volume` and RFC 3339 timestamps.
//! Malformed or out-of-order rows are rejected by the bar store and
//! counted; whether that sinks the run is the simulator's integrity
//! budget call, not the loader's.

use std::path::Path;

use chrono::{DateTime, Utc};
use confluence_core::domain::Bar;
use confluence_core::sentiment::SentimentObservation;
use confluence_core::store::BarStore;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("no bars loaded for '{symbol}' from {path}")]
    EmptyData { symbol: String, path: String },
}

#[derive(Debug, Deserialize)]
struct BarRow {
    timestamp: DateTime<Utc>,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct SentimentRow {
    symbol: String,
    timestamp: DateTime<Utc>,
    polarity: f64,
}

/// Load one symbol's bars from `<data_dir>/<SYMBOL>.csv`.
///
/// Rows the store rejects (duplicates, out-of-order, insane OHLC) are
/// skipped and counted on the returned store.
pub fn load_bars(data_dir: &Path, symbol: &str) -> Result<BarStore, LoadError> {
    let path = data_dir.join(format!("{symbol}.csv"));
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(&path).map_err(|e| LoadError::Csv {
        path: display.clone(),
        source: e,
    })?;

    let mut store = BarStore::new(symbol);
    for row in reader.deserialize::<BarRow>() {
        let row = row.map_err(|e| LoadError::Csv {
            path: display.clone(),
            source: e,
        })?;
        let bar = Bar {
            symbol: symbol.to_string(),
            timestamp: row.timestamp,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            volume: row.volume,
        };
        // Integrity violations are the store's to log and count.
        let _ = store.append(bar);
    }

    if store.is_empty() {
        return Err(LoadError::EmptyData {
            symbol: symbol.to_string(),
            path: display,
        });
    }
    info!(
        symbol,
        bars = store.len(),
        skipped = store.skipped(),
        "loaded bar data"
    );
    Ok(store)
}

/// Load the sentiment observation CSV covering the whole universe.
///
/// Columns: `symbol,timestamp,polarity`. Out-of-range polarity rows are
/// dropped here with a diagnostic; the adapter would reject them anyway.
pub fn load_sentiment(path: &Path) -> Result<Vec<SentimentObservation>, LoadError> {
    let display = path.display().to_string();
    let mut reader = csv::Reader::from_path(path).map_err(|e| LoadError::Csv {
        path: display.clone(),
        source: e,
    })?;

    let mut observations = Vec::new();
    for row in reader.deserialize::<SentimentRow>() {
        let row = row.map_err(|e| LoadError::Csv {
            path: display.clone(),
            source: e,
        })?;
        if !row.polarity.is_finite() || row.polarity.abs() > 1.0 {
            warn!(
                symbol = %row.symbol,
                polarity = row.polarity,
                "dropping out-of-range sentiment row"
            );
            continue;
        }
        observations.push(SentimentObservation {
            symbol: row.symbol,
            timestamp: row.timestamp,
            polarity: row.polarity,
        });
    }
    info!(rows = observations.len(), "loaded sentiment data");
    Ok(observations)
}
