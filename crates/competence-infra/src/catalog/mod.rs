//! Static skill catalog.

pub mod static_catalog;

pub use static_catalog::StaticCatalog;
