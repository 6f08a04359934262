//! API Routes
//!
//! Configures the Axum routers for the peer endpoint and the end-user API.

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    api_get_handler, bad_request_handler, health_handler, peer_empty_key_handler,
    peer_get_handler, stats_handler, AppState,
};

/// Creates the router other peers fetch from.
///
/// # Endpoints
/// - `GET <base_path>:namespace/:key` - Raw value bytes
/// - `GET <base_path>:namespace/` - Empty key, `400 key is required`
///
/// Any other path is answered with `400 Bad Request`. `base_path` must start
/// and end with `/`.
pub fn create_peer_router(state: AppState, base_path: &str) -> Router {
    Router::new()
        .route(&format!("{}:namespace/:key", base_path), get(peer_get_handler))
        .route(&format!("{}:namespace/", base_path), get(peer_empty_key_handler))
        .fallback(bad_request_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Creates the end-user router.
///
/// # Endpoints
/// - `GET /api?key=<k>[&namespace=<n>]` - Raw value bytes
/// - `GET /stats` - Statistics of every namespace
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests for debugging
pub fn create_api_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api", get(api_get_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
