//! Static skill catalog and its hydrated, per-character view.
//!
//! The catalog (`CatalogCategory` / `CatalogSkill`) is shared and read-only.
//! Hydration merges a character's custom skills and meta overrides into it,
//! producing `Category` / `Skill` values that are owned by the session.

use serde::{Deserialize, Serialize};

use crate::name::normalize_skill_name;

/// Cap applied when neither the catalog, a custom skill, nor a meta override
/// provides one.
pub const DEFAULT_SKILL_CAP: u32 = 40;

// ---------------------------------------------------------------------------
// Static catalog
// ---------------------------------------------------------------------------

/// A skill as declared by the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogSkill {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub cap: Option<u32>,
}

/// A category as declared by the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogCategory {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub skills: Vec<CatalogSkill>,
}

// ---------------------------------------------------------------------------
// Hydrated view
// ---------------------------------------------------------------------------

/// Where a skill comes from, which decides how it is deleted.
///
/// Built-in skills are soft-deleted with a tombstone so their historical
/// state keys survive; custom skills are removed outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkillOrigin {
    BuiltIn { tombstoned: bool },
    Custom,
}

/// A skill after hydration: catalog or custom definition with overrides
/// applied and the committed base value attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub name: String,
    pub icon: String,
    /// Effective cap (always positive).
    pub cap: u32,
    /// Committed base value.
    pub base_value: u32,
    pub origin: SkillOrigin,
}

impl Skill {
    pub fn is_custom(&self) -> bool {
        matches!(self.origin, SkillOrigin::Custom)
    }

    pub fn is_tombstoned(&self) -> bool {
        matches!(self.origin, SkillOrigin::BuiltIn { tombstoned: true })
    }

    /// Whether the skill should be shown and accept allocation.
    pub fn is_visible(&self) -> bool {
        !self.is_tombstoned()
    }
}

/// A category after hydration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub label: String,
    pub icon: String,
    pub skills: Vec<Skill>,
}

impl Category {
    /// Find a skill by name (diacritic- and case-insensitive), tombstoned
    /// skills included.
    pub fn find_skill(&self, name: &str) -> Option<&Skill> {
        let key = normalize_skill_name(name);
        self.skills
            .iter()
            .find(|s| normalize_skill_name(&s.name) == key)
    }

    /// Skills that are not tombstoned, in catalog order followed by custom
    /// skills in insertion order.
    pub fn visible_skills(&self) -> impl Iterator<Item = &Skill> {
        self.skills.iter().filter(|s| s.is_visible())
    }
}
