//! Error types for the service substrate
//!
//! Provides unified error handling using thiserror.

use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Fault Enum ==
/// Failure of a single cache backend call.
///
/// Never leaves the cache layer: `CacheStore` collapses every fault into a miss
/// (reads) or a no-op (writes).
#[derive(Error, Debug)]
pub enum CacheFault {
    /// Backend could not be reached
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    /// Round-trip exceeded the configured bound
    #[error("Cache operation timed out after {0:?}")]
    Timeout(Duration),

    /// Payload could not be serialized
    #[error("Cache payload encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// Stored bytes do not match the expected shape
    #[error("Cache payload decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Backend rejected the command
    #[error("Cache backend error: {0}")]
    Backend(String),
}

// == Service Error Enum ==
/// Pre-classified domain error handed back to callers of a domain service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Requested record does not exist
    #[error("{0}")]
    NotFound(String),

    /// Request data failed validation
    #[error("{0}")]
    BadRequest(String),

    /// Operation failed in a collaborator
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    /// Shorthand for `ServiceError::NotFound`.
    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }

    /// Shorthand for `ServiceError::BadRequest`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ServiceError::BadRequest(message.into())
    }

    /// Shorthand for `ServiceError::Internal`.
    pub fn internal(message: impl Into<String>) -> Self {
        ServiceError::Internal(message.into())
    }

    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for domain service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;
