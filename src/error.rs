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

// == Cache Error Enum ==
/// Unified error type for namespaces, peers and the HTTP surfaces.
///
/// `Clone` is required: one coalesced load hands the same result, error
/// included, to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Lookup with an empty key
    #[error("key is required")]
    EmptyKey,

    /// The origin loader returned an error
    #[error("failed to load key '{key}': {reason}")]
    LoadFailed { key: String, reason: String },

    /// A remote peer answered with a non-success status or could not be reached
    #[error("peer {peer} fetch failed: {reason}")]
    PeerFetchFailed { peer: String, reason: String },

    /// No namespace registered under this name
    #[error("no such namespace: {0}")]
    NamespaceNotFound(String),

    /// Namespace built without a loader
    #[error("namespace '{0}' has no loader")]
    NilLoader(String),

    /// Malformed request
    #[error("bad request: {0}")]
    InvalidRequest(String),

    /// Rejected configuration value
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CacheError {
    /// Wraps a loader failure, keeping the whole context chain.
    pub fn load_failed(key: &str, err: &anyhow::Error) -> Self {
        CacheError::LoadFailed {
            key: key.to_string(),
            reason: format!("{:#}", err),
        }
    }

    /// HTTP status used when this error crosses the wire.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CacheError::EmptyKey | CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::NamespaceNotFound(_) => StatusCode::NOT_FOUND,
            CacheError::PeerFetchFailed { .. } => StatusCode::BAD_GATEWAY,
            CacheError::LoadFailed { .. }
            | CacheError::NilLoader(_)
            | CacheError::InvalidConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
