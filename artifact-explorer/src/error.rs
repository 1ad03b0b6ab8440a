//! HTTP error mapping
//!
//! Every failed request answers `{"error": {"code", "message"}}`.

use artifact_common::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Error raised by the services
    #[error(transparent)]
    Common(#[from] Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Common(err) => match err {
                Error::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
                Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
                Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                Error::DataAccess(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
                Error::QueryExecution { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "QUERY_ERROR"),
                Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
                Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            },
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
