//! Static catalog port.

use std::sync::Arc;

use competence_types::catalog::CatalogCategory;

/// Source of the shared, read-only skill catalog.
///
/// The returned slice is shared between sessions; hydration copies what it
/// needs and never mutates it.
pub trait CatalogProvider: Send + Sync {
    /// Ordered categories with their built-in skills.
    fn categories(&self) -> Arc<[CatalogCategory]>;
}

impl CatalogProvider for Arc<[CatalogCategory]> {
    fn categories(&self) -> Arc<[CatalogCategory]> {
        Arc::clone(self)
    }
}
