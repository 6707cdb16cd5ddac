//! JSON wire schema shared by every feed producer.
//!
//! Three frame kinds travel over the feed socket: per-instrument ticks,
//! pair feature updates and batched multi-instrument updates. Consumers
//! decode frames with [`codec::decode`] without knowing which producer is
//! on the other end.

pub mod codec;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol plus the exchange it trades on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId {
    symbol: String,
    exchange: String,
}

impl SymbolId {
    pub fn new(symbol: impl Into<String>, exchange: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            exchange: exchange.into(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.exchange)
    }
}

/// Tradeable instrument, tagged by kind on the wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Instrument {
    Stock(SymbolId),
    Future(SymbolId),
}

impl Instrument {
    pub fn stock(symbol: impl Into<String>, exchange: impl Into<String>) -> Self {
        Self::Stock(SymbolId::new(symbol, exchange))
    }

    pub fn symbol_id(&self) -> &SymbolId {
        match self {
            Self::Stock(id) | Self::Future(id) => id,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol_id())
    }
}

/// Single-instrument quote with a synthetic bid/ask around the last price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMessage {
    pub instrument: Instrument,
    pub last: f64,
    pub bid: f64,
    pub ask: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl TickMessage {
    pub fn with_half_spread(
        instrument: Instrument,
        last: f64,
        half_spread: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument,
            last,
            bid: last - half_spread,
            ask: last + half_spread,
            timestamp,
        }
    }
}

/// Discriminator value carried in the `type` field of feature frames
pub const FEATURE_MESSAGE_KIND: &str = "feature";

/// Pair feature update keyed by the joined pair symbol, e.g. `AAPL_MSFT`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub symbol: String,
    /// Non-finite z-scores cross the wire as null; JSON has no NaN literal
    #[serde(with = "z_score_serde")]
    pub z_score: f64,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl FeatureMessage {
    pub fn new(symbol: impl Into<String>, z_score: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: FEATURE_MESSAGE_KIND.to_string(),
            symbol: symbol.into(),
            z_score,
            timestamp,
        }
    }
}

mod z_score_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// One instrument inside a batch frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdate {
    pub symbol: String,
    pub exchange: String,
    pub price: f64,
    pub bid: f64,
    pub ask: f64,
}

/// Batched update frame; the timestamp is RFC 3339 on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchUpdateMessage {
    pub updates: Vec<BatchUpdate>,
    pub timestamp: DateTime<Utc>,
}

impl BatchUpdateMessage {
    /// Single-instrument batch with the bid/ask straddling the price
    pub fn single(
        symbol: impl Into<String>,
        exchange: impl Into<String>,
        price: f64,
        spread: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            updates: vec![BatchUpdate {
                symbol: symbol.into(),
                exchange: exchange.into(),
                price,
                bid: price - spread / 2.0,
                ask: price + spread / 2.0,
            }],
            timestamp,
        }
    }
}

/// Any frame a consumer can pull off the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeedMessage {
    Tick(TickMessage),
    Feature(FeatureMessage),
    Batch(BatchUpdateMessage),
}
