//! API Module
//!
//! HTTP handlers and routing for both surfaces of a cache node.
//!
//! # Endpoints
//! - `GET <base_path>:namespace/:key` - Peer protocol, raw value bytes
//! - `GET /api?key=<k>` - End-user lookup
//! - `GET /stats` - Namespace statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::{create_api_router, create_peer_router};
