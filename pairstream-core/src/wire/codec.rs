//! Frame encoding and decoding

use serde::Serialize;

use crate::wire::FeedMessage;

/// Encode any wire message as a single-line JSON frame
pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}

/// Decode a frame into whichever message kind it carries
pub fn decode(frame: &str) -> Result<FeedMessage, serde_json::Error> {
    serde_json::from_str(frame)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{BatchUpdateMessage, FeatureMessage, Instrument, TickMessage};
    use chrono::{TimeZone, Utc};
    use serde_json::{json, Value};

    #[test]
    fn tick_frames_match_the_wire_layout() {
        let timestamp = Utc.timestamp_millis_opt(1_672_560_001_000).single().unwrap();
        let tick = TickMessage::with_half_spread(
            Instrument::stock("AAPL", "NASDAQ"),
            155.0,
            0.01,
            timestamp,
        );

        let encoded = encode(&tick).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            json!({
                "instrument": {
                    "type": "Stock",
                    "data": {"symbol": "AAPL", "exchange": "NASDAQ"}
                },
                "last": 155.0,
                "bid": 154.99,
                "ask": 155.01,
                "timestamp": 1_672_560_001_000_i64,
            })
        );
    }

    #[test]
    fn feature_frames_match_the_wire_layout() {
        let timestamp = Utc.timestamp_millis_opt(1_672_560_060_000).single().unwrap();
        let message = FeatureMessage::new("AAPL_MSFT", 1.2345, timestamp);

        let encoded = encode(&message).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "feature",
                "symbol": "AAPL_MSFT",
                "z_score": 1.2345,
                "timestamp": 1_672_560_060_000_i64,
            })
        );
    }

    #[test]
    fn batch_frames_carry_an_rfc3339_timestamp() {
        let timestamp = Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap();
        let message = BatchUpdateMessage::single("AAPL", "NASDAQ", 150.0, 0.02, timestamp);

        let encoded = encode(&message).unwrap();
        let value: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(
            value,
            json!({
                "updates": [{
                    "symbol": "AAPL",
                    "exchange": "NASDAQ",
                    "price": 150.0,
                    "bid": 149.99,
                    "ask": 150.01,
                }],
                "timestamp": "2023-01-01T10:00:00Z",
            })
        );
    }

    #[test]
    fn decode_dispatches_on_frame_shape() {
        let tick_frame = r#"{"instrument":{"type":"Stock","data":{"symbol":"AAPL","exchange":"NASDAQ"}},"last":155.0,"bid":154.99,"ask":155.01,"timestamp":1672560001000}"#;
        match decode(tick_frame).unwrap() {
            FeedMessage::Tick(tick) => {
                assert_eq!(tick.instrument.symbol_id().symbol(), "AAPL");
                assert_eq!(tick.last, 155.0);
                assert_eq!(
                    tick.timestamp,
                    Utc.timestamp_millis_opt(1_672_560_001_000).single().unwrap()
                );
            }
            other => panic!("expected tick, got {:?}", other),
        }

        let feature_frame =
            r#"{"type":"feature","symbol":"AAPL_MSFT","z_score":-0.5,"timestamp":1672560060000}"#;
        match decode(feature_frame).unwrap() {
            FeedMessage::Feature(feature) => {
                assert_eq!(feature.symbol, "AAPL_MSFT");
                assert_eq!(feature.z_score, -0.5);
            }
            other => panic!("expected feature, got {:?}", other),
        }

        let batch_frame = r#"{"updates":[{"symbol":"AAPL","exchange":"NASDAQ","price":150.0,"bid":149.99,"ask":150.01}],"timestamp":"2023-01-01T10:00:00Z"}"#;
        match decode(batch_frame).unwrap() {
            FeedMessage::Batch(batch) => {
                assert_eq!(batch.updates[0].price, 150.0);
                assert_eq!(
                    batch.timestamp,
                    Utc.with_ymd_and_hms(2023, 1, 1, 10, 0, 0).unwrap()
                );
            }
            other => panic!("expected batch, got {:?}", other),
        }
    }

    #[test]
    fn nan_z_scores_cross_the_wire_as_null() {
        let timestamp = Utc.timestamp_millis_opt(1_672_560_060_000).single().unwrap();
        let message = FeatureMessage::new("AAPL_MSFT", f64::NAN, timestamp);

        let encoded = encode(&message).unwrap();
        assert!(encoded.contains("\"z_score\":null"));

        match decode(&encoded).unwrap() {
            FeedMessage::Feature(feature) => assert!(feature.z_score.is_nan()),
            other => panic!("expected feature, got {:?}", other),
        }
    }
}
