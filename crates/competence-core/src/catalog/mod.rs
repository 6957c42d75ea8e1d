//! Skill catalog access and the per-character custom skill registry.

pub mod provider;
pub mod registry;

pub use provider::CatalogProvider;
pub use registry::CustomSkillRegistry;
