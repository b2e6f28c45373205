use serde::Deserialize;
use thiserror::Error;

use crate::models::SerialRef;

/// Caller mistakes, answered with 400
#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("shipmentId is required")]
    MissingShipmentId,

    #[error("eventType and shipmentSerial are required")]
    MissingEventFields,

    #[error("shipmentSerial must be a non-negative integer")]
    InvalidSerial,
}

/// Body of `POST /api/shipment/create`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    pub shipment_id: Option<String>,
    pub description: Option<String>,
    pub cid: Option<String>,
}

/// Validated mint request
#[derive(Debug, Clone, PartialEq)]
pub struct NewShipment {
    pub shipment_id: String,
    pub description: String,
    pub cid: Option<String>,
}

impl CreateShipmentRequest {
    pub fn validate(self) -> Result<NewShipment, InputError> {
        let shipment_id = non_blank(self.shipment_id).ok_or(InputError::MissingShipmentId)?;

        Ok(NewShipment {
            shipment_id,
            description: self.description.unwrap_or_default(),
            cid: non_blank(self.cid),
        })
    }
}

/// Body of `POST /api/shipment/event`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitEventRequest {
    pub event_type: Option<String>,
    pub shipment_serial: Option<SerialRef>,
    pub cid: Option<String>,
}

/// Validated status update. `event_type` is not limited to the conventional values.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_type: String,
    pub shipment_serial: u64,
    pub cid: Option<String>,
}

impl SubmitEventRequest {
    pub fn validate(self) -> Result<NewEvent, InputError> {
        let (Some(event_type), Some(serial)) = (non_blank(self.event_type), self.shipment_serial) else {
            return Err(InputError::MissingEventFields);
        };

        Ok(NewEvent {
            event_type,
            shipment_serial: parse_serial(&serial)?,
            cid: non_blank(self.cid),
        })
    }
}

/// Whole, non-negative serial from a number or numeric string
pub fn parse_serial(serial: &SerialRef) -> Result<u64, InputError> {
    let value = serial.as_f64().ok_or(InputError::InvalidSerial)?;
    if value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return Err(InputError::InvalidSerial);
    }
    Ok(value as u64)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
