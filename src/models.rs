use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mirror Node topic messages page (partial, only fields we need)
///
/// Entries stay raw so one unreadable wrapper cannot fail the whole page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopicMessagesPage {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub messages: Vec<Value>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Single Mirror Node topic message wrapper
#[derive(Debug, Clone, Deserialize)]
pub struct TopicMessage {
    pub consensus_timestamp: String,
    pub message: String,                  // base64-encoded event body
    #[serde(default)]
    pub payer_account_id: Option<String>,
}

/// `shipmentSerial` as written by clients: a number or a numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SerialRef {
    Number(serde_json::Number),
    Text(String),
}

impl SerialRef {
    /// Numeric value, if the reference holds one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SerialRef::Number(n) => n.as_f64(),
            SerialRef::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Read a serial out of an arbitrary JSON value
    pub fn from_value(value: &Value) -> Option<Self> {
        SerialRef::deserialize(value).ok()
    }

    pub fn matches(&self, serial: u64) -> bool {
        self.as_f64() == Some(serial as f64)
    }
}

/// Decoded topic event: the indexer's ordering fields followed by the
/// event body exactly as it was submitted
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShipmentEvent {
    pub consensus_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

impl ShipmentEvent {
    pub fn event_type(&self) -> Option<&str> {
        self.body.get("eventType").and_then(Value::as_str)
    }

    pub fn shipment_serial(&self) -> Option<SerialRef> {
        self.body.get("shipmentSerial").and_then(SerialRef::from_value)
    }
}

/// NFT metadata written at mint time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentMetadata {
    pub shipment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reconstructed shipment view returned to callers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub token_id: String,
    pub serial: u64,
    pub metadata: Option<Value>,
    pub nft: Value,
    pub events: Vec<ShipmentEvent>,
}

/// Message submitted to the topic for a status update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMessage {
    pub event_type: String,
    pub shipment_serial: u64,
    pub cid: Option<String>,
    pub at: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MintResponse {
    pub token_id: String,
    pub serial: u64,
    pub transaction_id: String,
    pub metadata: ShipmentMetadata,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventResponse {
    pub topic_id: String,
    pub transaction_id: String,
    pub status: String,
    pub message: EventMessage,
}
