//! Shared domain types for the competence allocation engine.
//!
//! This crate contains the types exchanged between every layer: the static
//! catalog and its hydrated view, custom skills and meta overrides, the
//! persisted competence profile, bonus sources and breakdowns, engine
//! configuration, sync events, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod bonus;
pub mod catalog;
pub mod character;
pub mod config;
pub mod error;
pub mod name;
pub mod profile;
pub mod skill;
pub mod sync;
