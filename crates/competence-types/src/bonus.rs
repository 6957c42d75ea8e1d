//! Bonus sources and the per-skill bonus breakdown.
//!
//! Two independent sources feed skill bonuses: item modifiers (equipped
//! items and active consumables, resolved against an item catalog) and the
//! companion ("nokorah") bonus list. Neither is persisted by the engine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item modifiers
// ---------------------------------------------------------------------------

/// How a modifier applies. Only flat modifiers contribute skill points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKind {
    #[default]
    Flat,
    Percent,
    #[serde(other)]
    Other,
}

/// A stat modifier carried by an item definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub stat: String,
    pub value: i64,
    #[serde(rename = "type", default)]
    pub kind: ModifierKind,
}

/// An item definition from the item catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemDefinition {
    pub name: String,
    #[serde(default)]
    pub modifiers: Vec<Modifier>,
}

/// Reference to an item catalog entry, by position or by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemRef {
    Index(usize),
    Name(String),
}

impl ItemRef {
    /// Parse a loosely-shaped reference: a number, a string, or an object
    /// carrying `index`, `itemIndex`, `name`, or `itemName`.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_u64().map(|i| Self::Index(i as usize)),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(Self::Name(s.clone())),
            serde_json::Value::Object(map) => ["index", "itemIndex"]
                .iter()
                .find_map(|k| map.get(*k).and_then(|v| v.as_u64()))
                .map(|i| Self::Index(i as usize))
                .or_else(|| {
                    ["name", "itemName"]
                        .iter()
                        .find_map(|k| map.get(*k).and_then(|v| v.as_str()))
                        .filter(|s| !s.trim().is_empty())
                        .map(|s| Self::Name(s.to_string()))
                }),
            _ => None,
        }
    }
}

/// Equipment/inventory snapshot consumed as a modifier source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentSnapshot {
    #[serde(default)]
    pub equipped_slots: Vec<ItemRef>,
    #[serde(default)]
    pub active_consumable_effects: Vec<ItemRef>,
}

impl EquipmentSnapshot {
    /// Build a snapshot from an untrusted JSON document.
    ///
    /// `equippedSlots` may be an array or a slot-name → item map; empty
    /// slots and malformed entries are skipped. Anything that is not an
    /// object yields an empty snapshot.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let Some(map) = value.as_object() else {
            return Self::default();
        };

        let refs = |key: &str| -> Vec<ItemRef> {
            match map.get(key) {
                Some(serde_json::Value::Array(items)) => {
                    items.iter().filter_map(ItemRef::from_value).collect()
                }
                Some(serde_json::Value::Object(slots)) => {
                    slots.values().filter_map(ItemRef::from_value).collect()
                }
                _ => Vec::new(),
            }
        };

        Self {
            equipped_slots: refs("equippedSlots"),
            active_consumable_effects: refs("activeConsumableEffects"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.equipped_slots.is_empty() && self.active_consumable_effects.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Companion bonuses
// ---------------------------------------------------------------------------

/// A bonus granted by the companion creature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanionBonus {
    pub name: String,
    pub points: i64,
    #[serde(default)]
    pub source: String,
}

// ---------------------------------------------------------------------------
// Breakdown
// ---------------------------------------------------------------------------

/// One labelled contribution to a skill bonus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BonusDetail {
    pub label: String,
    pub value: i64,
}

/// Aggregated bonus for one skill, split by source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillBonusBreakdown {
    pub total: i64,
    pub items: i64,
    #[serde(rename = "nokorah")]
    pub companion: i64,
    pub item_details: Vec<BonusDetail>,
    #[serde(rename = "nokorahDetails")]
    pub companion_details: Vec<BonusDetail>,
}

/// Skill name → bonus breakdown.
pub type BonusBreakdown = BTreeMap<String, SkillBonusBreakdown>;
