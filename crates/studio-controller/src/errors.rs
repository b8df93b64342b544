//! Studio Controller error types.
//!
//! All errors map to appropriate HTTP status codes via the `IntoResponse` impl.
//! Error messages returned to clients are intentionally generic for store
//! failures; the actual errors are logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Studio Controller error type.
///
/// Maps to HTTP status codes:
/// - Validation, Inconsistent: 400 Bad Request
/// - NotFound, UnknownSource: 404 Not Found
/// - DuplicateConnection: 409 Conflict
/// - Store: 500 Internal Server Error
///
/// Transient signaling conditions (a target that has gone away, a full
/// outbound queue) are never errors; the forwarder drops and logs them.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Inconsistent data: {0}")]
    Inconsistent(String),

    #[error("Duplicate connection: {0}")]
    DuplicateConnection(String),

    #[error("Store error: {0}")]
    Store(String),
}

impl StudioError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            StudioError::Validation(_) | StudioError::Inconsistent(_) => 400,
            StudioError::NotFound(_) | StudioError::UnknownSource(_) => 404,
            StudioError::DuplicateConnection(_) => 409,
            StudioError::Store(_) => 500,
        }
    }

    /// Returns the error code string rendered in the response body.
    ///
    /// `Inconsistent` is reported to clients as a validation failure.
    pub fn error_code(&self) -> &'static str {
        match self {
            StudioError::Validation(_) | StudioError::Inconsistent(_) => "VALIDATION_ERROR",
            StudioError::NotFound(_) => "NOT_FOUND",
            StudioError::UnknownSource(_) => "UNKNOWN_SOURCE",
            StudioError::DuplicateConnection(_) => "DUPLICATE_CONNECTION",
            StudioError::Store(_) => "STORE_ERROR",
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for StudioError {
    fn into_response(self) -> Response {
        let message = match &self {
            StudioError::Validation(reason) => reason.clone(),
            StudioError::NotFound(resource) => resource.clone(),
            StudioError::UnknownSource(source) => format!("Unknown source: {}", source),
            // Logged with its source and room where the matrix detects it
            StudioError::Inconsistent(detail) => detail.clone(),
            StudioError::DuplicateConnection(id) => format!("Connection {} already exists", id),
            StudioError::Store(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "studio.store", error = %err, "Store operation failed");
                "An internal storage error occurred".to_string()
            }
        };

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message,
            },
        };

        (status, Json(error_response)).into_response()
    }
}
