//! Pair ratio z-score computation

pub mod rolling;

pub use rolling::{rolling_mean, rolling_sample_std};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DataError, DataResult};
use crate::series::align::align_pair;
use crate::series::PriceSeries;

/// Feature computation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Rolling window length in aligned rows, at least 2
    pub window: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: 60, // One hour of minute bars
        }
    }
}

/// One emitted feature row: both closes plus the ratio z-score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRecord {
    pub timestamp: DateTime<Utc>,
    pub close_a: f64,
    pub close_b: f64,
    pub z_score: f64,
}

/// Computes the rolling z-score of the close ratio between two legs.
///
/// For each aligned row from index `window - 1` onwards, the ratio
/// `close_a / close_b` is standardized against the mean and sample standard
/// deviation of the trailing `window` ratios. The first `window - 1` rows
/// are warm-up and never emitted. A window with zero variance produces a
/// NaN z-score, which is carried through rather than treated as an error.
#[derive(Debug, Clone)]
pub struct FeatureEngine {
    config: FeatureConfig,
}

impl FeatureEngine {
    pub fn new(config: FeatureConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Align both legs and compute one [`FeatureRecord`] per post-warm-up row.
    ///
    /// Rows whose own ratio is not finite (a zero close on leg B) are
    /// skipped; with `n` aligned rows and all ratios finite the output has
    /// `max(0, n - window + 1)` records.
    pub fn compute(
        &self,
        series_a: &PriceSeries,
        series_b: &PriceSeries,
    ) -> DataResult<Vec<FeatureRecord>> {
        let window = self.config.window;
        if window < 2 {
            return Err(DataError::InvalidWindow { window });
        }

        let aligned = align_pair(series_a, series_b)?;
        let ratios: Vec<f64> = aligned
            .records
            .iter()
            .map(|record| record.close_a / record.close_b)
            .collect();

        let means = rolling_mean(&ratios, window);
        let stds = rolling_sample_std(&ratios, window);

        let mut records = Vec::with_capacity(means.len());
        for (offset, (&mean, &std_dev)) in means.iter().zip(&stds).enumerate() {
            let index = offset + window - 1;
            let ratio = ratios[index];
            if !ratio.is_finite() {
                continue;
            }
            let record = &aligned.records[index];
            records.push(FeatureRecord {
                timestamp: record.timestamp,
                close_a: record.close_a,
                close_b: record.close_b,
                z_score: (ratio - mean) / std_dev,
            });
        }

        info!(
            "Computed {} feature rows for {}/{} (window {})",
            records.len(),
            aligned.symbol_a,
            aligned.symbol_b,
            window
        );
        Ok(records)
    }
}
