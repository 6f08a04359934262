//! Group Module
//!
//! Cache namespaces ("groups"): the read-through lookup path, origin loaders
//! and the registry mapping names to namespaces.

mod loader;
mod namespace;
mod registry;
mod stats;

pub use loader::{loader_fn, Loader, LoaderFn};
pub use namespace::{Namespace, NamespaceBuilder};
pub use registry::NamespaceRegistry;
pub use stats::{NamespaceStats, NamespaceStatsSnapshot};
