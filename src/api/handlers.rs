//! API Handlers
//!
//! HTTP request handlers for the peer endpoint and the end-user API.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::cache::ByteView;
use crate::error::{CacheError, Result};
use crate::group::{Namespace, NamespaceRegistry};
use crate::models::{ApiQuery, HealthResponse, NamespaceStatsResponse, StatsResponse};

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Namespaces served by this process
    pub registry: Arc<NamespaceRegistry>,
    /// Namespace used by `/api` when the query names none
    pub default_namespace: String,
}

impl AppState {
    pub fn new(registry: Arc<NamespaceRegistry>, default_namespace: impl Into<String>) -> Self {
        Self {
            registry,
            default_namespace: default_namespace.into(),
        }
    }

    /// Looks up a namespace, `NamespaceNotFound` if unknown.
    fn namespace(&self, name: &str) -> Result<Arc<Namespace>> {
        self.registry
            .get(name)
            .ok_or_else(|| CacheError::NamespaceNotFound(name.to_string()))
    }
}

/// Raw value bytes as an `application/octet-stream` body.
fn octet_stream(view: ByteView) -> Response {
    (
        [(header::CONTENT_TYPE, "application/octet-stream")],
        view.bytes(),
    )
        .into_response()
}

/// Handler for GET `<base_path>:namespace/:key`
///
/// Serves a lookup on behalf of another peer. Path segments arrive
/// percent-decoded.
pub async fn peer_get_handler(
    State(state): State<AppState>,
    Path((namespace, key)): Path<(String, String)>,
) -> Result<Response> {
    debug!(namespace = %namespace, key = %key, "peer request");
    let namespace = state.namespace(&namespace)?;
    namespace.record_server_request();

    let view = namespace.get(&key).await?;
    Ok(octet_stream(view))
}

/// Handler for GET `<base_path>:namespace/`, a peer request whose key
/// segment is empty. Answers like a lookup of the empty key.
pub async fn peer_empty_key_handler(
    State(state): State<AppState>,
    Path(namespace): Path<String>,
) -> Result<Response> {
    peer_get_handler(State(state), Path((namespace, String::new()))).await
}

/// Fallback for peer paths that are not `<namespace>/<key>`.
pub async fn bad_request_handler() -> CacheError {
    CacheError::InvalidRequest("expected <namespace>/<key>".to_string())
}

/// Handler for GET /api?key=<k>[&namespace=<n>]
pub async fn api_get_handler(
    State(state): State<AppState>,
    Query(query): Query<ApiQuery>,
) -> Result<Response> {
    let name = query
        .namespace
        .as_deref()
        .unwrap_or(&state.default_namespace);
    let namespace = state.namespace(name)?;

    let view = namespace.get(query.key()).await?;
    Ok(octet_stream(view))
}

/// Handler for GET /stats
///
/// Returns statistics of every registered namespace.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let namespaces = state
        .registry
        .names()
        .iter()
        .filter_map(|name| state.registry.get(name))
        .map(|namespace| NamespaceStatsResponse::from_namespace(&namespace))
        .collect();

    Json(StatsResponse { namespaces })
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
