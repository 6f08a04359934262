//! Response DTOs for the HTTP surfaces
//!
//! Defines the JSON bodies returned by the API and by failed requests.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::group::{Namespace, NamespaceStatsSnapshot};

/// Statistics of one namespace (element of `GET /stats`)
#[derive(Debug, Clone, Serialize)]
pub struct NamespaceStatsResponse {
    /// Namespace name
    pub namespace: String,
    /// Lookup counters
    pub lookups: NamespaceStatsSnapshot,
    /// Local store counters
    pub store: CacheStats,
    /// Local store hit rate
    pub hit_rate: f64,
}

impl NamespaceStatsResponse {
    pub fn from_namespace(namespace: &Namespace) -> Self {
        let store = namespace.cache_stats();
        Self {
            namespace: namespace.name().to_string(),
            lookups: namespace.stats(),
            hit_rate: store.hit_rate(),
            store,
        }
    }
}

/// Response body for `GET /stats`
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// One entry per namespace, sorted by name
    pub namespaces: Vec<NamespaceStatsResponse>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Human readable description of the failure
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
