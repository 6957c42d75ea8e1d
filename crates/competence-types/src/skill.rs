//! Admin-managed skill definitions: custom skills, meta overrides, and the
//! draft/request shapes accepted by the admin editor.

use serde::{Deserialize, Serialize};

/// A skill added by an administrator on top of the static catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSkill {
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub cap: Option<u32>,
}

/// Per-skill override layer, keyed by normalized skill name.
///
/// Re-applied on every hydration; the static catalog itself is never
/// mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cap: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl SkillMeta {
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }

    /// True when the entry carries no override and can be dropped.
    pub fn is_empty(&self) -> bool {
        self.icon.is_none() && self.cap.is_none() && !self.is_deleted()
    }
}

/// Request to add a custom skill to a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSkill {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
    /// Signed so that invalid input can be reported instead of wrapping.
    #[serde(default)]
    pub cap: Option<i64>,
}

/// Admin edit draft for an existing skill, as submitted by the inline editor.
///
/// Numeric fields are signed so that a negative base or a non-positive cap
/// can be rejected with a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDraft {
    pub name: String,
    pub base_value: i64,
    pub cap: i64,
    #[serde(default)]
    pub icon: Option<String>,
}

/// Result of a successful admin edit.
///
/// `notice` carries feedback for partially-applied edits (e.g. a rejected
/// rename of a built-in skill while the other fields were applied).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditOutcome {
    /// Final name of the skill after the edit.
    pub name: String,
    pub renamed: bool,
    pub notice: Option<String>,
}
