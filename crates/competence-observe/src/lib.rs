//! Observability setup shared by the competence binaries.

pub mod tracing_setup;
