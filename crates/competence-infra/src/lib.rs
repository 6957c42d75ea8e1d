//! Infrastructure layer for the competence engine.
//!
//! Implements the ports defined in `competence-core`: file and in-memory
//! local caches, SQLite and HTTP character repositories, the static skill
//! catalog, JSON-backed equipment/companion sources, plus config loading
//! and data directory resolution.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod equipment;
pub mod filesystem;
pub mod http;
pub mod identity;
pub mod sqlite;
