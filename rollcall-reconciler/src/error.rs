//! Error types for rollcall-reconciler
//!
//! Fatal ingestion errors and store errors map onto HTTP statuses here;
//! per-row skips and per-item batch failures never reach this layer.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::participation_store::StoreError;
use crate::services::reconciliation_service::ServiceError;
use crate::services::spreadsheet_ingestor::IngestError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Free-text search matched nothing (404, non-fatal notice)
    #[error("No participation matches \"{0}\"")]
    NoSearchMatch(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Roster rejected before or during parsing (413/415/422)
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// ParticipationStore call failed (502)
    #[error("Participation store error: {0}")]
    Store(#[from] StoreError),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// rollcall-common error
    #[error("Common error: {0}")]
    Common(#[from] rollcall_common::Error),
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::UnknownParticipation(id) => {
                ApiError::NotFound(format!("Participation not found: {}", id))
            }
            ServiceError::BatchInProgress => {
                ApiError::Conflict("A batch is already being confirmed".to_string())
            }
            ServiceError::Ingest(e) => ApiError::Ingest(e),
            ServiceError::Store(e) => ApiError::Store(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut guidance = None;
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::NoSearchMatch(query) => (
                StatusCode::NOT_FOUND,
                "NO_SEARCH_MATCH",
                format!("No participation matches \"{}\"", query),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::Ingest(ref err) => {
                guidance = Some(err.guidance());
                let status = match err {
                    IngestError::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    IngestError::UnrecognizedFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    _ => StatusCode::UNPROCESSABLE_ENTITY,
                };
                (status, err.code(), err.to_string())
            }
            ApiError::Store(ref err) => (StatusCode::BAD_GATEWAY, "STORE_ERROR", err.to_string()),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
            ApiError::Common(ref err) => {
                let status = match err {
                    rollcall_common::Error::NotFound(_) => StatusCode::NOT_FOUND,
                    rollcall_common::Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, "COMMON_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "guidance": guidance,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
