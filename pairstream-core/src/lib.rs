//! Pairstream Core Library
//!
//! Market data preparation for pairs trading: ordered price series, an
//! exact-timestamp pair join, rolling z-score feature computation, and the
//! JSON wire schema shared by every feed producer.

pub mod error;
pub mod features;
pub mod series;
pub mod wire;

// Re-export main types for easy access
pub use error::{DataError, DataResult};
pub use features::{FeatureConfig, FeatureEngine, FeatureRecord};
pub use series::align::{align_pair, AlignedPair, AlignedPairRecord};
pub use series::{load_bars_csv, PriceBar, PriceSeries, ProcessedRow, ProcessedSeries};
pub use wire::{
    BatchUpdate, BatchUpdateMessage, FeatureMessage, FeedMessage, Instrument, SymbolId,
    TickMessage,
};
