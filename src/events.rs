use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{ShipmentEvent, TopicMessage};

/// Wrapper fields derived from the indexer; the body's copies are discarded
const DERIVED_FIELDS: [&str; 2] = ["consensus_timestamp", "transaction_id"];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("message wrapper is malformed: {0}")]
    Wrapper(serde_json::Error),

    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("payload is not an event record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Events for one shipment, plus how many feed entries could not be read
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedEvents {
    pub events: Vec<ShipmentEvent>,
    pub dropped: usize,
}

/// Decode a base64 JSON payload into `T`
pub fn decode_payload<T: serde::de::DeserializeOwned>(payload: &str) -> Result<T, DecodeError> {
    let bytes = STANDARD.decode(payload.trim())?;
    let text = String::from_utf8(bytes)?;
    Ok(serde_json::from_str(&text)?)
}

/// Decode one raw feed entry. Any JSON object body is accepted as is.
pub fn decode_message(raw: &Value) -> Result<ShipmentEvent, DecodeError> {
    let message = TopicMessage::deserialize(raw).map_err(DecodeError::Wrapper)?;
    let mut body: Map<String, Value> = decode_payload(&message.message)?;
    for field in DERIVED_FIELDS {
        body.remove(field);
    }

    let transaction_id = message
        .payer_account_id
        .as_ref()
        .map(|payer| format!("{}@{}", payer, message.consensus_timestamp));

    Ok(ShipmentEvent {
        consensus_timestamp: message.consensus_timestamp,
        transaction_id,
        body,
    })
}

/// Decode the feed and keep the events addressed to `serial`, in feed order.
///
/// Unreadable entries are counted and skipped so one corrupt message cannot
/// hide the rest of the timeline.
pub fn decode_events(messages: &[Value], serial: u64) -> DecodedEvents {
    let mut decoded = DecodedEvents::default();

    for raw in messages {
        match decode_message(raw) {
            Ok(event) => {
                let matches = event.shipment_serial().is_some_and(|s| s.matches(serial));
                if matches {
                    decoded.events.push(event);
                }
            }
            Err(err) => {
                tracing::debug!(
                    consensus_timestamp = ?raw.get("consensus_timestamp"),
                    error = %err,
                    "dropping unreadable topic message"
                );
                decoded.dropped += 1;
            }
        }
    }

    decoded
}
