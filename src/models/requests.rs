//! Request DTOs for the HTTP surfaces
//!
//! Defines the query parameters accepted by the end-user API.

use serde::Deserialize;

/// Query string of `GET /api`
///
/// # Fields
/// - `key`: The key to look up
/// - `namespace`: Namespace to read from (defaults to the server's namespace)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiQuery {
    /// Key to look up
    #[serde(default)]
    pub key: Option<String>,
    /// Namespace to read from
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ApiQuery {
    /// The requested key, empty when absent.
    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_query_deserialize() {
        let query: ApiQuery = serde_json::from_str(r#"{"key": "Tom"}"#).unwrap();
        assert_eq!(query.key(), "Tom");
        assert!(query.namespace.is_none());
    }

    #[test]
    fn test_api_query_missing_key() {
        let query = ApiQuery::default();
        assert_eq!(query.key(), "");
    }
}
