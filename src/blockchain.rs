use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Map;

use crate::config::Config;
use crate::models::{EventMessage, EventResponse, MintResponse, ShipmentMetadata};
use crate::shipment::{NewEvent, NewShipment};
use crate::submitter::{LedgerSubmitter, UnavailableSubmitter};

/// Mints shipment NFTs and appends status events to the shipment topic
pub struct ShipmentLedger {
    token_id: String,
    topic_id: String,
    submitter: Box<dyn LedgerSubmitter>,
}

impl ShipmentLedger {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self::with_submitter(
            config.nft_token_id.clone(),
            config.topic_id.clone(),
            default_submitter(config)?,
        ))
    }

    pub fn with_submitter(token_id: String, topic_id: String, submitter: Box<dyn LedgerSubmitter>) -> Self {
        Self { token_id, topic_id, submitter }
    }

    /// Metadata record and the exact bytes stored on the NFT
    pub fn prepare_mint_at(&self, shipment: &NewShipment, now: DateTime<Utc>) -> Result<(ShipmentMetadata, Vec<u8>)> {
        let metadata = ShipmentMetadata {
            shipment_id: shipment.shipment_id.clone(),
            description: Some(shipment.description.clone()),
            cid: shipment.cid.clone(),
            created_at: Some(iso_timestamp(now)),
            extra: Map::new(),
        };
        let bytes = serde_json::to_vec(&metadata).context("Failed to encode NFT metadata")?;
        Ok((metadata, bytes))
    }

    pub async fn mint_shipment(&self, shipment: &NewShipment) -> Result<MintResponse> {
        self.mint_shipment_at(shipment, Utc::now()).await
    }

    pub async fn mint_shipment_at(&self, shipment: &NewShipment, now: DateTime<Utc>) -> Result<MintResponse> {
        let (metadata, bytes) = self.prepare_mint_at(shipment, now)?;

        let receipt = self.submitter.mint_nft(&self.token_id, bytes).await?;
        let serial = receipt.serials
            .first()
            .copied()
            .ok_or_else(|| anyhow!("Mint receipt did not include a serial number"))?;

        tracing::info!(
            token_id = %self.token_id,
            serial,
            transaction_id = %receipt.transaction_id,
            shipment_id = %metadata.shipment_id,
            "minted shipment NFT"
        );

        Ok(MintResponse {
            token_id: self.token_id.clone(),
            serial,
            transaction_id: receipt.transaction_id,
            metadata,
        })
    }

    /// Topic message and the exact bytes submitted
    pub fn prepare_event_at(&self, event: &NewEvent, now: DateTime<Utc>) -> Result<(EventMessage, Vec<u8>)> {
        let message = EventMessage {
            event_type: event.event_type.clone(),
            shipment_serial: event.shipment_serial,
            cid: event.cid.clone(),
            at: iso_timestamp(now),
        };
        let bytes = serde_json::to_vec(&message).context("Failed to encode event message")?;
        Ok((message, bytes))
    }

    pub async fn submit_event(&self, event: &NewEvent) -> Result<EventResponse> {
        self.submit_event_at(event, Utc::now()).await
    }

    pub async fn submit_event_at(&self, event: &NewEvent, now: DateTime<Utc>) -> Result<EventResponse> {
        let (message, bytes) = self.prepare_event_at(event, now)?;

        let receipt = self.submitter.submit_message(&self.topic_id, bytes).await?;

        tracing::info!(
            topic_id = %self.topic_id,
            serial = message.shipment_serial,
            event_type = %message.event_type,
            transaction_id = %receipt.transaction_id,
            "submitted shipment event"
        );

        Ok(EventResponse {
            topic_id: self.topic_id.clone(),
            transaction_id: receipt.transaction_id,
            status: if receipt.status.is_empty() { "SUCCESS".to_string() } else { receipt.status },
            message,
        })
    }
}

/// Millisecond-precision UTC timestamp, e.g. `2024-01-01T00:00:00.000Z`
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(feature = "hedera")]
fn default_submitter(config: &Config) -> Result<Box<dyn LedgerSubmitter>> {
    match &config.operator {
        Some(operator) => Ok(Box::new(crate::submitter::HederaSubmitter::new(&config.network, operator)?)),
        None => Ok(Box::new(UnavailableSubmitter::new(
            "HEDERA_OPERATOR_ID and HEDERA_OPERATOR_KEY are not set",
        ))),
    }
}

#[cfg(not(feature = "hedera"))]
fn default_submitter(_config: &Config) -> Result<Box<dyn LedgerSubmitter>> {
    Ok(Box::new(UnavailableSubmitter::new(
        "built without the `hedera` feature",
    )))
}
