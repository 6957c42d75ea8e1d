//! Built-in skill catalog and its optional TOML override.
//!
//! A `catalog.toml` in the data directory replaces the built-in catalog:
//!
//! ```toml
//! [[categories]]
//! id = "combat"
//! label = "Combat"
//! icon = "⚔️"
//!
//! [[categories.skills]]
//! name = "Force"
//! cap = 40
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;

use competence_core::catalog::CatalogProvider;
use competence_types::catalog::{CatalogCategory, CatalogSkill};
use competence_types::error::CatalogError;
use competence_types::name::normalize_skill_name;

/// Read-only catalog shared by every session.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    categories: Arc<[CatalogCategory]>,
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default)]
    categories: Vec<CatalogCategory>,
}

const BUILTIN: &[(&str, &str, &str, &[(&str, &str)])] = &[
    (
        "combat",
        "Combat",
        "⚔️",
        &[("Force", "💪"), ("Mêlée", "🗡️"), ("Tir", "🏹"), ("Esquive", "💨"), ("Parade", "🛡️")],
    ),
    (
        "survie",
        "Survie",
        "🌲",
        &[("Endurance", "❤️"), ("Pistage", "🐾"), ("Herboristerie", "🌿"), ("Orientation", "🧭")],
    ),
    (
        "social",
        "Social",
        "🗣️",
        &[("Persuasion", "🤝"), ("Intimidation", "😠"), ("Tromperie", "🎭"), ("Perspicacité", "👁️")],
    ),
    (
        "savoir",
        "Savoir",
        "📚",
        &[("Histoire", "📜"), ("Arcanes", "✨"), ("Médecine", "⚕️"), ("Nature", "🍃")],
    ),
    (
        "artisanat",
        "Artisanat",
        "🔨",
        &[("Forge", "⚒️"), ("Couture", "🧵"), ("Alchimie", "⚗️"), ("Cuisine", "🍲")],
    ),
];

impl StaticCatalog {
    /// The catalog compiled into the binary.
    pub fn builtin() -> Self {
        let categories: Vec<CatalogCategory> = BUILTIN
            .iter()
            .map(|(id, label, icon, skills)| CatalogCategory {
                id: (*id).to_string(),
                label: (*label).to_string(),
                icon: (*icon).to_string(),
                skills: skills
                    .iter()
                    .map(|(name, icon)| CatalogSkill {
                        name: (*name).to_string(),
                        icon: (*icon).to_string(),
                        cap: None,
                    })
                    .collect(),
            })
            .collect();
        Self {
            categories: categories.into(),
        }
    }

    /// Build a catalog from categories, rejecting duplicate category ids and
    /// duplicate (normalized) skill names within a category.
    pub fn from_categories(categories: Vec<CatalogCategory>) -> Result<Self, CatalogError> {
        let mut ids = HashSet::new();
        for category in &categories {
            if !ids.insert(category.id.as_str()) {
                return Err(CatalogError::DuplicateCategory(category.id.clone()));
            }
            let mut names = HashSet::new();
            for skill in &category.skills {
                if !names.insert(normalize_skill_name(&skill.name)) {
                    return Err(CatalogError::DuplicateSkill {
                        category: category.id.clone(),
                        name: skill.name.clone(),
                    });
                }
            }
        }
        Ok(Self {
            categories: categories.into(),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile =
            toml::from_str(content).map_err(|e| CatalogError::Parse(e.to_string()))?;
        Self::from_categories(file.categories)
    }

    /// Load `{data_dir}/catalog.toml` when present, else the built-in
    /// catalog. A present but invalid file is an error.
    pub async fn load_or_builtin(data_dir: &Path) -> Result<Self, CatalogError> {
        let path = data_dir.join("catalog.toml");
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => {
                let catalog = Self::from_toml_str(&content)?;
                tracing::info!(
                    path = %path.display(),
                    categories = catalog.categories.len(),
                    "catalog loaded"
                );
                Ok(catalog)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::builtin()),
            Err(err) => Err(CatalogError::Io(format!("{}: {err}", path.display()))),
        }
    }
}

impl CatalogProvider for StaticCatalog {
    fn categories(&self) -> Arc<[CatalogCategory]> {
        Arc::clone(&self.categories)
    }
}
