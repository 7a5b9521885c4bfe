//! Error types for the site cache service
//!
//! Provides unified error handling using thiserror.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::{error, warn};

use crate::models::ErrorResponse;

// == App Error Enum ==
/// Unified error type for the service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Malformed input (bad key, preview payload without username, bad patch)
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Missing or expired preview, or missing upstream document
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or rejected bearer token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller does not own the resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Failure reported by the document store or auth provider
    #[error("Upstream error: {0}")]
    Upstream(String),
}

// == JSON Body Rejections ==
/// Every malformed request body is a 400 with the usual error envelope,
/// including a missing content type and a body of the wrong JSON shape.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match &rejection {
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`".to_string()
            }
            JsonRejection::JsonSyntaxError(_) | JsonRejection::JsonDataError(_) => {
                rejection.body_text()
            }
            _ => "Failed to read request body".to_string(),
        };
        warn!(status = %rejection.status(), "Rejected request body");
        AppError::Validation(message)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Upstream(_) => {
                error!(error = %self, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the service.
pub type Result<T> = std::result::Result<T, AppError>;
