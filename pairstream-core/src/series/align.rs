//! Exact-timestamp join of two price series

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

use crate::error::{DataError, DataResult};
use crate::series::PriceSeries;

/// Close prices of both legs at one shared timestamp
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPairRecord {
    pub timestamp: DateTime<Utc>,
    pub close_a: f64,
    pub close_b: f64,
}

/// Inner join of two series on exact timestamps, ordered ascending
#[derive(Debug, Clone)]
pub struct AlignedPair {
    pub symbol_a: String,
    pub symbol_b: String,
    pub records: Vec<AlignedPairRecord>,
}

/// Join two series on exactly matching timestamps.
///
/// Rows present in only one leg are dropped. Series sampled on different
/// grids can therefore lose most of their rows; a warning fires when more
/// than half of the shorter leg is dropped.
pub fn align_pair(series_a: &PriceSeries, series_b: &PriceSeries) -> DataResult<AlignedPair> {
    if series_a.is_empty() {
        return Err(DataError::DataUnavailable {
            subject: series_a.symbol().to_string(),
        });
    }
    if series_b.is_empty() {
        return Err(DataError::DataUnavailable {
            subject: series_b.symbol().to_string(),
        });
    }

    let closes_b: BTreeMap<DateTime<Utc>, f64> = series_b
        .bars()
        .iter()
        .map(|bar| (bar.timestamp, bar.close))
        .collect();

    let mut records = Vec::new();
    for bar in series_a.bars() {
        if let Some(&close_b) = closes_b.get(&bar.timestamp) {
            records.push(AlignedPairRecord {
                timestamp: bar.timestamp,
                close_a: bar.close,
                close_b,
            });
        }
    }

    if records.is_empty() {
        return Err(DataError::AlignmentEmpty {
            symbol_a: series_a.symbol().to_string(),
            symbol_b: series_b.symbol().to_string(),
        });
    }

    let shorter = series_a.len().min(series_b.len());
    let dropped = shorter - records.len();
    if dropped * 2 > shorter {
        warn!(
            "Exact-timestamp join of {}/{} kept {} of {} rows; inputs do not share a sampling grid",
            series_a.symbol(),
            series_b.symbol(),
            records.len(),
            shorter
        );
    }

    Ok(AlignedPair {
        symbol_a: series_a.symbol().to_string(),
        symbol_b: series_b.symbol().to_string(),
        records,
    })
}
