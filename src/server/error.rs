//! server::error
//!
//! Error responses for the HTTP surface.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use super::auth::AuthError;
use crate::engine::CommitError;
use crate::publisher::PublishError;

/// API-specific errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token was supplied
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The token was refused
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// An `action` other than create
    #[error("Unsupported action: {0}")]
    UnsupportedAction(String),

    /// Missing or unknown `q`
    #[error("Bad query: {0}")]
    BadQuery(String),

    /// Body is neither JSON nor form-encoded
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    /// Publishing failed
    #[error(transparent)]
    Publish(#[from] PublishError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingToken => ApiError::Unauthorized(err.to_string()),
            AuthError::Rejected(reason) => ApiError::Forbidden(reason),
        }
    }
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            ApiError::UnsupportedAction(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_ACTION"),
            ApiError::BadQuery(_) => (StatusCode::BAD_REQUEST, "BAD_QUERY"),
            ApiError::UnsupportedMediaType(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UNSUPPORTED_MEDIA_TYPE")
            }
            ApiError::Publish(PublishError::Validation(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_REQUEST")
            }
            ApiError::Publish(PublishError::Formatting(_)) => {
                (StatusCode::BAD_REQUEST, "FORMATTING_ERROR")
            }
            ApiError::Publish(PublishError::Commit(CommitError::Conflict { .. })) => {
                (StatusCode::CONFLICT, "CONFLICT")
            }
            ApiError::Publish(PublishError::Commit(_)) => (StatusCode::BAD_GATEWAY, "STORE_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() || status == StatusCode::CONFLICT {
            warn!(%status, error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            code: code.to_string(),
            details: None,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for API operations
pub type ApiResult<T> = Result<T, ApiError>;
