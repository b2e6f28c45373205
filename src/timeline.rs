use serde_json::Value;
use thiserror::Error;

use crate::events::{DecodedEvents, decode_payload};
use crate::models::Timeline;

pub const NOT_FOUND_HINT: &str = "Recently minted NFTs can take ~5-30s to appear. Wait a bit and retry. \
Also confirm your HEDERA_NFT_TOKEN_ID matches the minting token and network.";

#[derive(Debug, Error)]
pub enum TimelineError {
    /// Token instance still invisible after the propagation budget
    #[error("NFT not found on Mirror Node")]
    NotFound {
        token_id: String,
        serial: u64,
        mirror_url: String,
    },

    #[error("{0}")]
    Upstream(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

/// Decode the NFT's base64 JSON metadata, or `None` when absent or unreadable.
/// Any JSON document is returned as is, whatever shape it has.
pub fn decode_metadata(nft: &Value) -> Option<Value> {
    let raw = nft.get("metadata")?.as_str()?;
    if raw.is_empty() {
        return None;
    }

    match decode_payload::<Value>(raw) {
        Ok(metadata) => Some(metadata),
        Err(err) => {
            tracing::debug!(error = %err, "NFT metadata is not base64 JSON");
            None
        }
    }
}

pub fn assemble(token_id: &str, serial: u64, nft: Value, decoded: DecodedEvents) -> Timeline {
    Timeline {
        token_id: token_id.to_string(),
        serial,
        metadata: decode_metadata(&nft),
        nft,
        events: decoded.events,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde_json::json;

    #[test]
    fn metadata_is_decoded_from_base64_json() {
        let nft = json!({
            "serial_number": 7,
            "metadata": STANDARD.encode(r#"{"shipmentId":"SHP-7","description":"pallets","cid":null,"createdAt":"2024-01-01T00:00:00Z"}"#),
        });

        let metadata = decode_metadata(&nft).unwrap();
        assert_eq!(metadata["shipmentId"], "SHP-7");
        assert_eq!(metadata["description"], "pallets");
        assert_eq!(metadata["createdAt"], "2024-01-01T00:00:00Z");
    }

    #[test]
    fn missing_or_malformed_metadata_becomes_none() {
        assert!(decode_metadata(&json!({"serial_number": 7})).is_none());
        assert!(decode_metadata(&json!({"metadata": null})).is_none());
        assert!(decode_metadata(&json!({"metadata": ""})).is_none());
        assert!(decode_metadata(&json!({"metadata": "!!!"})).is_none());
        assert!(decode_metadata(&json!({"metadata": STANDARD.encode("not json")})).is_none());
    }

    #[test]
    fn metadata_of_any_shape_is_returned_verbatim() {
        let unrelated = json!({"metadata": STANDARD.encode(r#"{"unrelated":1}"#)});
        assert_eq!(decode_metadata(&unrelated), Some(json!({"unrelated": 1})));

        let foreign = json!({"metadata": STANDARD.encode(r#"{"shipmentId":42,"cid":7,"tags":["cold"]}"#)});
        let metadata = decode_metadata(&foreign).unwrap();
        assert_eq!(metadata["shipmentId"], 42);
        assert_eq!(metadata["tags"], json!(["cold"]));

        let scalar = json!({"metadata": STANDARD.encode("\"ipfs://bafy\"")});
        assert_eq!(decode_metadata(&scalar), Some(json!("ipfs://bafy")));
    }

    #[test]
    fn assembled_timeline_serializes_with_camel_case_keys() {
        let nft = json!({"metadata": STANDARD.encode(r#"{"shipmentId":"SHP-1"}"#)});
        let timeline = assemble("0.0.1001", 1, nft.clone(), DecodedEvents::default());

        let out = serde_json::to_value(&timeline).unwrap();
        assert_eq!(out["tokenId"], "0.0.1001");
        assert_eq!(out["serial"], 1);
        assert_eq!(out["metadata"]["shipmentId"], "SHP-1");
        assert_eq!(out["nft"], nft);
        assert_eq!(out["events"], json!([]));
    }

    #[test]
    fn null_metadata_is_serialized_as_null() {
        let timeline = assemble("0.0.1001", 2, json!({}), DecodedEvents::default());
        let out = serde_json::to_value(&timeline).unwrap();
        assert!(out["metadata"].is_null());
    }
}
