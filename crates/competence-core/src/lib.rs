//! Allocation engine and port definitions for the competence sheet.
//!
//! This crate holds the allocation state machine, the custom skill
//! registry and admin editor, the bonus aggregator, and the persistence
//! sync engine. It also defines the "ports" (repository, cache, catalog,
//! identity, bonus source and scheduler traits) that competence-infra
//! implements. It never depends on any storage or transport crate.

pub mod admin;
pub mod allocation;
pub mod bonus;
pub mod catalog;
pub mod identity;
pub mod repository;
pub mod session;
pub mod sync;
