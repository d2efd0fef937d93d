//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Backend Error Enum ==
/// Failures raised by a raw storage backend.
///
/// A missing key is never one of these: backends report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum BackendError {
    /// The storage medium failed
    #[error("Storage I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// A stored payload could not be decoded back into an entity
    #[error("Corrupt payload under '{key}': {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// An entry file does not start with a valid key header
    #[error("Malformed entry file {}", path.display())]
    Malformed { path: std::path::PathBuf },

    /// An entity could not be encoded for storage
    #[error("Failed to encode payload: {0}")]
    Encode(#[source] serde_json::Error),
}

// == Cache Error Enum ==
/// Unified error type for cache operations.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key is empty or carries a reserved prefix
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Value cannot be represented by the backend
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Deep copy met a value kind it cannot clone
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Raw storage failure, propagated as-is
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Key not found (HTTP surface only)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Malformed request data (HTTP surface only)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::InvalidKey(_)
            | CacheError::InvalidValue(_)
            | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::UnsupportedType(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(ErrorResponse::new(self.to_string()));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
