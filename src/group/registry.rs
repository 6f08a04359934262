//! Namespace Registry
//!
//! Owned name → namespace table shared by bootstrap code and the endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{info, warn};

use crate::error::Result;
use crate::group::{Loader, Namespace, NamespaceBuilder};

// == Namespace Registry ==
/// Namespaces by name. Entries are never removed.
#[derive(Debug, Default)]
pub struct NamespaceRegistry {
    /// Namespaces by name
    namespaces: RwLock<HashMap<String, Arc<Namespace>>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // == New Namespace ==
    /// Creates and registers a namespace.
    pub fn new_namespace(
        &self,
        name: &str,
        capacity_bytes: usize,
        loader: impl Loader + 'static,
    ) -> Arc<Namespace> {
        self.insert(Namespace::new(name, capacity_bytes, loader))
    }

    /// Builds and registers a namespace, failing when the builder has no loader.
    pub fn register(&self, builder: NamespaceBuilder) -> Result<Arc<Namespace>> {
        Ok(self.insert(builder.build()?))
    }

    /// Registers an already built namespace, replacing any namespace of the
    /// same name.
    pub fn insert(&self, namespace: Namespace) -> Arc<Namespace> {
        let namespace = Arc::new(namespace);
        let name = namespace.name().to_string();
        let previous = self
            .namespaces
            .write()
            .insert(name.clone(), namespace.clone());

        if previous.is_some() {
            warn!(namespace = %name, "namespace replaced");
        } else {
            info!(namespace = %name, "namespace registered");
        }
        namespace
    }

    // == Get ==
    pub fn get(&self, name: &str) -> Option<Arc<Namespace>> {
        self.namespaces.read().get(name).cloned()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.namespaces.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.namespaces.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.read().is_empty()
    }
}
