//! Error types for feed producers

use thiserror::Error;

/// Custom result type for feed operations
pub type FeedResult<T> = Result<T, FeedError>;

#[derive(Debug, Clone, Error)]
pub enum FeedError {
    #[error("Failed to bind {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("Replay speed {speed} must be a positive finite multiplier")]
    InvalidSpeed { speed: f64 },

    #[error("No data to replay")]
    NoData,

    #[error("Encode error: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Encode(err.to_string())
    }
}
