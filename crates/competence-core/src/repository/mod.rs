//! Storage port definitions.
//!
//! These traits define the storage interface that the infrastructure layer
//! (competence-infra) implements. The core crate never depends on any
//! specific storage technology.

pub mod cache;
pub mod character;
