// HTTP surface: timeline reads, ledger writes and attachment uploads
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

use crate::blockchain::ShipmentLedger;
use crate::fetcher::TimelineFetcher;
use crate::models::{EventResponse, MintResponse, Timeline};
use crate::shipment::{CreateShipmentRequest, InputError, SubmitEventRequest};
use crate::storage::{BlobStore, StorageError, Upload, UploadPolicy, upload_with_retry};
use crate::timeline::{NOT_FOUND_HINT, TimelineError};

pub const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const MAINTENANCE_CODE: &str = "WEB3_STORAGE_MAINTENANCE";

/// Shared, read-only handler context built once at startup
#[derive(Clone)]
pub struct AppState {
    pub timeline: Arc<TimelineFetcher>,
    pub ledger: Arc<ShipmentLedger>,
    pub storage: Arc<dyn BlobStore>,
    pub upload_policy: UploadPolicy,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Timeline(#[from] TimelineError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<InputError> for ApiError {
    fn from(e: InputError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Timeline(TimelineError::NotFound { token_id, serial, mirror_url }) => (
                StatusCode::NOT_FOUND,
                json!({
                    "error": "NFT not found on Mirror Node",
                    "details": {
                        "tokenId": token_id,
                        "serial": serial,
                        "mirrorUrl": mirror_url,
                        "hint": NOT_FOUND_HINT,
                    }
                }),
            ),
            ApiError::Timeline(TimelineError::Upstream(msg)) => {
                tracing::error!(error = %msg, "mirror node failure");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            ApiError::Timeline(TimelineError::Unexpected(e)) | ApiError::Internal(e) => {
                tracing::error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": format!("{:#}", e) }))
            }
            ApiError::Storage(StorageError::Maintenance(msg)) => {
                tracing::warn!(error = %msg, "storage network under maintenance");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    json!({
                        "error": "Web3.Storage is undergoing maintenance. Please try again later or proceed without attaching a file.",
                        "code": MAINTENANCE_CODE,
                    }),
                )
            }
            ApiError::Storage(StorageError::Failed(msg)) => {
                tracing::error!(error = %msg, "storage upload failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
            ApiError::Storage(StorageError::Misconfigured(msg)) => {
                tracing::error!(error = %msg, "storage upload is not configured");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };
        (status, Json(body)).into_response()
    }
}

///////////////////////////////////////////////////////////////////////////
// GET /api/shipment/:serial
///////////////////////////////////////////////////////////////////////////
async fn get_shipment(
    State(state): State<AppState>,
    Path(serial): Path<String>,
) -> Result<Json<Timeline>, ApiError> {
    let serial = serial
        .trim()
        .parse::<u64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid shipment serial: {}", serial)))?;

    let timeline = state.timeline.fetch(serial).await?;
    Ok(Json(timeline))
}

///////////////////////////////////////////////////////////////////////////
// POST /api/shipment/create
///////////////////////////////////////////////////////////////////////////
async fn create_shipment(
    State(state): State<AppState>,
    body: Result<Json<CreateShipmentRequest>, JsonRejection>,
) -> Result<Json<MintResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let shipment = request.validate()?;

    let minted = state.ledger.mint_shipment(&shipment).await?;
    Ok(Json(minted))
}

///////////////////////////////////////////////////////////////////////////
// POST /api/shipment/event
///////////////////////////////////////////////////////////////////////////
async fn submit_event(
    State(state): State<AppState>,
    body: Result<Json<SubmitEventRequest>, JsonRejection>,
) -> Result<Json<EventResponse>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let event = request.validate()?;

    let submitted = state.ledger.submit_event(&event).await?;
    Ok(Json(submitted))
}

///////////////////////////////////////////////////////////////////////////
// POST /api/storage/upload
///////////////////////////////////////////////////////////////////////////
async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let missing_file = || ApiError::BadRequest("file is required as multipart/form-data".to_string());
    let mut multipart = multipart.map_err(|_| missing_file())?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| ApiError::BadRequest(e.to_string()))? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some(Upload { name, content_type, bytes: bytes.to_vec() });
        break;
    }
    let upload = upload.ok_or_else(missing_file)?;

    let cid = upload_with_retry(state.storage.as_ref(), &upload, &state.upload_policy).await?;
    tracing::info!(name = %upload.name, size = upload.bytes.len(), %cid, "pinned attachment");

    Ok((StatusCode::OK, Json(json!({ "cid": cid }))).into_response())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/shipment/create", post(create_shipment))
        .route("/api/shipment/event", post(submit_event))
        .route("/api/shipment/:serial", get(get_shipment))
        .route(
            "/api/storage/upload",
            post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
