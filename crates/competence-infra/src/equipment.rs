//! JSON-file bonus sources.
//!
//! The inventory and companion subsystems are external; these adapters read
//! their exported state from JSON files:
//!
//! - item catalog: `[{"name": "...", "modifiers": [{"stat", "value", "type"}]}]`
//! - equipment: `{"equippedSlots": [...] | {...}, "activeConsumableEffects": [...]}`
//! - companion: `[{"name": "Force", "points": 2, "source": "Nokorah"}]`

use std::path::{Path, PathBuf};

use competence_core::bonus::{CompanionBonusSource, EquipmentSource, ModifierResolver};
use competence_types::bonus::{CompanionBonus, EquipmentSnapshot, ItemDefinition, ItemRef};
use competence_types::character::CharacterId;
use competence_types::error::RepositoryError;
use competence_types::name::same_skill_name;

// ---------------------------------------------------------------------------
// Item catalog
// ---------------------------------------------------------------------------

/// Item definitions addressed by position or (normalized) name.
#[derive(Debug, Clone, Default)]
pub struct JsonItemCatalog {
    items: Vec<ItemDefinition>,
}

impl JsonItemCatalog {
    pub fn new(items: Vec<ItemDefinition>) -> Self {
        Self { items }
    }

    pub fn from_json_str(content: &str) -> Result<Self, RepositoryError> {
        serde_json::from_str(content)
            .map(Self::new)
            .map_err(|e| RepositoryError::Serialization(format!("invalid item catalog: {e}")))
    }

    pub fn load(path: &Path) -> Result<Self, RepositoryError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RepositoryError::Io(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl ModifierResolver for JsonItemCatalog {
    fn resolve(&self, item: &ItemRef) -> Option<ItemDefinition> {
        match item {
            ItemRef::Index(index) => self.items.get(*index).cloned(),
            ItemRef::Name(name) => self
                .items
                .iter()
                .find(|def| same_skill_name(&def.name, name))
                .cloned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Equipment
// ---------------------------------------------------------------------------

/// Equipment snapshot read from a JSON file on every call.
///
/// A missing or unreadable file means "no equipment"; malformed entries are
/// skipped.
#[derive(Debug, Clone)]
pub struct FileEquipmentSource {
    path: PathBuf,
}

impl FileEquipmentSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl EquipmentSource for FileEquipmentSource {
    fn snapshot(&self, character: &CharacterId) -> Option<EquipmentSnapshot> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) => {
                tracing::debug!(%character, path = %self.path.display(), error = %err, "no equipment file");
                return None;
            }
        };
        let value: serde_json::Value = match serde_json::from_str(&content) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "malformed equipment file ignored");
                return None;
            }
        };
        let snapshot = EquipmentSnapshot::from_value(&value);
        (!snapshot.is_empty()).then_some(snapshot)
    }
}

// ---------------------------------------------------------------------------
// Companion
// ---------------------------------------------------------------------------

/// Companion bonus list read from a JSON file. A missing file means no
/// bonuses.
#[derive(Debug, Clone)]
pub struct FileCompanionSource {
    path: PathBuf,
}

impl FileCompanionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CompanionBonusSource for FileCompanionSource {
    async fn fetch_bonuses(&self, character: &CharacterId) -> Result<Vec<CompanionBonus>, RepositoryError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(RepositoryError::Io(format!("{}: {err}", self.path.display()))),
        };
        let bonuses: Vec<CompanionBonus> = serde_json::from_str(&content)
            .map_err(|e| RepositoryError::Serialization(format!("invalid companion file: {e}")))?;
        tracing::debug!(%character, count = bonuses.len(), "companion bonuses read");
        Ok(bonuses)
    }
}
