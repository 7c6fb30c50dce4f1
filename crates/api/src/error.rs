//! API Error Types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use storage::StorageError;
use thiserror::Error;
use tracing::{error, warn};

/// Errors surfaced at the HTTP boundary
#[derive(Debug, Error)]
pub enum ApiError {
    /// Body missing, not JSON, not an object, or missing/ill-typed fields
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The reading store failed to commit or read
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    #[error("Method not allowed")]
    MethodNotAllowed,
}

/// Error body returned to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    /// Client-facing message. Never carries internal details.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::MalformedRequest(_) => "Invalid data",
            ApiError::Storage(_) => "Internal server error",
            ApiError::MethodNotAllowed => "Method not allowed",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::MalformedRequest(reason) => {
                warn!("Rejected sensor payload: {}", reason);
                metrics::counter!("readings_rejected_total").increment(1);
            }
            ApiError::Storage(e) => {
                error!("Reading store failure: {}", e);
                metrics::counter!("storage_errors_total").increment(1);
            }
            ApiError::MethodNotAllowed => {}
        }

        let body = ErrorResponse {
            error: self.public_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
