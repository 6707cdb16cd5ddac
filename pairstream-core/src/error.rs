//! Error types for data preparation

use chrono::{DateTime, Utc};

/// Custom result type for data preparation operations
pub type DataResult<T> = Result<T, DataError>;

/// Error types for series loading, alignment and feature computation
#[derive(Debug, Clone, thiserror::Error)]
pub enum DataError {
    #[error("No data available for {subject}")]
    DataUnavailable { subject: String },

    #[error("No overlapping timestamps between {symbol_a} and {symbol_b}")]
    AlignmentEmpty { symbol_a: String, symbol_b: String },

    #[error("Rolling window must be at least 2, got {window}")]
    InvalidWindow { window: usize },

    #[error("Out-of-order timestamp {timestamp} for {symbol}")]
    OutOfOrder { symbol: String, timestamp: DateTime<Utc> },

    #[error("Parse error in {path} line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },

    #[error("I/O error: {message}")]
    Io { message: String },
}

impl From<std::io::Error> for DataError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }
}
