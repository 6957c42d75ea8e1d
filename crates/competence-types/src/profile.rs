//! Persisted competence block stored under `profile_data.competences`.
//!
//! All maps are keyed by category id first. Per-skill maps for allocations
//! and base values use the raw skill name; `meta_by_category` uses the
//! normalized skill name.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::skill::{CustomSkill, SkillMeta};

/// Current schema version of the persisted block.
pub const PROFILE_VERSION: u32 = 1;

/// Key of the competence block inside `profile_data`.
pub const PROFILE_KEY: &str = "competences";

/// Per-category, per-skill point map.
pub type SkillPoints = BTreeMap<String, BTreeMap<String, u32>>;

/// Full competence state of one character, as persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompetenceProfile {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub points_by_category: BTreeMap<String, u32>,
    #[serde(default)]
    pub allocations_by_category: SkillPoints,
    #[serde(default)]
    pub base_values_by_category: SkillPoints,
    #[serde(default)]
    pub locks_by_category: BTreeMap<String, bool>,
    #[serde(default)]
    pub custom_skills_by_category: BTreeMap<String, Vec<CustomSkill>>,
    #[serde(default)]
    pub meta_by_category: BTreeMap<String, BTreeMap<String, SkillMeta>>,
}

fn default_version() -> u32 {
    PROFILE_VERSION
}

/// What a character's `profile_data` holds under the competence key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredBlock {
    /// No block, or an explicit `null`.
    Absent,
    /// A block was found. Entries that did not match the persisted shape
    /// were skipped and counted in `dropped`.
    Present {
        profile: CompetenceProfile,
        dropped: usize,
    },
}

impl StoredBlock {
    /// True when the block was found but parts of it could not be read.
    pub fn is_damaged(&self) -> bool {
        matches!(self, StoredBlock::Present { dropped, .. } if *dropped > 0)
    }
}

impl CompetenceProfile {
    /// Extract the competence block from a character's `profile_data`.
    ///
    /// Parsing is per entry: a bad value only costs that entry, so one
    /// corrupt allocation never hides the rest of the block.
    pub fn from_profile_data(profile_data: &serde_json::Value) -> StoredBlock {
        let block = match profile_data.get(PROFILE_KEY) {
            None | Some(serde_json::Value::Null) => return StoredBlock::Absent,
            Some(block) => block,
        };
        let mut dropped = 0;
        let Some(fields) = block.as_object() else {
            return StoredBlock::Present {
                profile: Self::default(),
                dropped: 1,
            };
        };

        let version = match fields.get("version") {
            None => PROFILE_VERSION,
            Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|_| {
                dropped += 1;
                PROFILE_VERSION
            }),
        };
        let profile = Self {
            version,
            points_by_category: lenient_map(fields.get("pointsByCategory"), &mut dropped),
            allocations_by_category: lenient_nested(fields.get("allocationsByCategory"), &mut dropped),
            base_values_by_category: lenient_nested(fields.get("baseValuesByCategory"), &mut dropped),
            locks_by_category: lenient_map(fields.get("locksByCategory"), &mut dropped),
            custom_skills_by_category: lenient_lists(fields.get("customSkillsByCategory"), &mut dropped),
            meta_by_category: lenient_nested(fields.get("metaByCategory"), &mut dropped),
        };
        StoredBlock::Present { profile, dropped }
    }

    /// Return a copy of `profile_data` with the competence block replaced by
    /// `self`. Other keys are preserved; a non-object document is replaced by
    /// an object.
    pub fn merge_into(
        &self,
        profile_data: &serde_json::Value,
    ) -> Result<serde_json::Value, serde_json::Error> {
        let mut map = match profile_data {
            serde_json::Value::Object(map) => map.clone(),
            _ => serde_json::Map::new(),
        };
        map.insert(PROFILE_KEY.to_string(), serde_json::to_value(self)?);
        Ok(serde_json::Value::Object(map))
    }
}

fn entries<'a>(
    value: Option<&'a serde_json::Value>,
    dropped: &mut usize,
) -> Option<&'a serde_json::Map<String, serde_json::Value>> {
    match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Object(map)) => Some(map),
        Some(_) => {
            *dropped += 1;
            None
        }
    }
}

fn lenient_map<T: DeserializeOwned>(
    value: Option<&serde_json::Value>,
    dropped: &mut usize,
) -> BTreeMap<String, T> {
    let Some(map) = entries(value, dropped) else {
        return BTreeMap::new();
    };
    let mut out = BTreeMap::new();
    for (key, entry) in map {
        match serde_json::from_value(entry.clone()) {
            Ok(parsed) => {
                out.insert(key.clone(), parsed);
            }
            Err(_) => *dropped += 1,
        }
    }
    out
}

fn lenient_nested<T: DeserializeOwned>(
    value: Option<&serde_json::Value>,
    dropped: &mut usize,
) -> BTreeMap<String, BTreeMap<String, T>> {
    let Some(map) = entries(value, dropped) else {
        return BTreeMap::new();
    };
    map.iter()
        .map(|(category, inner)| (category.clone(), lenient_map(Some(inner), dropped)))
        .collect()
}

fn lenient_lists<T: DeserializeOwned>(
    value: Option<&serde_json::Value>,
    dropped: &mut usize,
) -> BTreeMap<String, Vec<T>> {
    let Some(map) = entries(value, dropped) else {
        return BTreeMap::new();
    };
    let mut out = BTreeMap::new();
    for (category, list) in map {
        let Some(items) = list.as_array() else {
            *dropped += 1;
            continue;
        };
        let mut parsed = Vec::with_capacity(items.len());
        for item in items {
            match serde_json::from_value(item.clone()) {
                Ok(skill) => parsed.push(skill),
                Err(_) => *dropped += 1,
            }
        }
        out.insert(category.clone(), parsed);
    }
    out
}
