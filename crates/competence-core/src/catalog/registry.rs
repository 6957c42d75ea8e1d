//! Custom skills and meta overrides layered over the static catalog.
//!
//! The registry owns the two admin-managed layers of a character's sheet:
//! skills added on top of the catalog, and per-skill overrides (icon, cap,
//! tombstone) keyed by normalized name. `hydrate` merges both into a fresh
//! copy of the catalog every time it is called.

use std::collections::BTreeMap;

use competence_types::catalog::{CatalogCategory, CatalogSkill, Category, Skill, SkillOrigin};
use competence_types::name::normalize_skill_name;
use competence_types::profile::CompetenceProfile;
use competence_types::skill::{CustomSkill, SkillMeta};

/// A skill located in the catalog or the registry, with its canonical name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillRef {
    BuiltIn(String),
    Custom(String),
}

impl SkillRef {
    pub fn name(&self) -> &str {
        match self {
            Self::BuiltIn(name) | Self::Custom(name) => name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomSkillRegistry {
    custom: BTreeMap<String, Vec<CustomSkill>>,
    meta: BTreeMap<String, BTreeMap<String, SkillMeta>>,
    default_cap: u32,
}

impl CustomSkillRegistry {
    pub fn new(default_cap: u32) -> Self {
        Self {
            custom: BTreeMap::new(),
            meta: BTreeMap::new(),
            default_cap: default_cap.max(1),
        }
    }

    /// Restore the registry from a persisted profile.
    ///
    /// Meta keys are re-normalized so that entries written under a raw name
    /// still apply.
    pub fn from_profile(profile: &CompetenceProfile, default_cap: u32) -> Self {
        let meta = profile
            .meta_by_category
            .iter()
            .map(|(category, entries)| {
                let entries = entries
                    .iter()
                    .map(|(name, meta)| (normalize_skill_name(name), meta.clone()))
                    .collect();
                (category.clone(), entries)
            })
            .collect();

        Self {
            custom: profile.custom_skills_by_category.clone(),
            meta,
            default_cap: default_cap.max(1),
        }
    }

    /// Write the registry part of the state into `profile`.
    pub fn write_into(&self, profile: &mut CompetenceProfile) {
        profile.custom_skills_by_category = self.custom.clone();
        profile.meta_by_category = self.meta.clone();
    }

    // -----------------------------------------------------------------------
    // Hydration
    // -----------------------------------------------------------------------

    /// Merge custom skills and overrides into a copy of the catalog.
    ///
    /// Built-in skills come first in catalog order, then custom skills in
    /// insertion order. Tombstoned built-ins are kept (flagged) so their
    /// state keys stay addressable. `base_of(category, skill)` supplies the
    /// committed base value of each skill.
    pub fn hydrate(
        &self,
        catalog: &[CatalogCategory],
        base_of: impl Fn(&str, &str) -> u32,
    ) -> Vec<Category> {
        catalog
            .iter()
            .map(|category| {
                let mut skills: Vec<Skill> = category
                    .skills
                    .iter()
                    .map(|skill| {
                        let meta = self.meta_for(&category.id, &skill.name);
                        Skill {
                            name: skill.name.clone(),
                            icon: meta
                                .and_then(|m| m.icon.clone())
                                .unwrap_or_else(|| skill.icon.clone()),
                            cap: self.resolve_cap(meta, skill.cap),
                            base_value: base_of(&category.id, &skill.name),
                            origin: SkillOrigin::BuiltIn {
                                tombstoned: meta.is_some_and(SkillMeta::is_deleted),
                            },
                        }
                    })
                    .collect();

                for custom in self.custom_skills(&category.id) {
                    let meta = self.meta_for(&category.id, &custom.name);
                    skills.push(Skill {
                        name: custom.name.clone(),
                        icon: meta
                            .and_then(|m| m.icon.clone())
                            .unwrap_or_else(|| custom.icon.clone()),
                        cap: self.resolve_cap(meta, custom.cap),
                        base_value: base_of(&category.id, &custom.name),
                        origin: SkillOrigin::Custom,
                    });
                }

                Category {
                    id: category.id.clone(),
                    label: category.label.clone(),
                    icon: category.icon.clone(),
                    skills,
                }
            })
            .collect()
    }

    /// Effective cap of a skill: meta override, then the custom or catalog
    /// definition, then the default. Always positive.
    pub fn skill_cap(&self, catalog: &[CatalogCategory], category: &str, skill: &str) -> u32 {
        let meta = self.meta_for(category, skill);
        let declared = match self.locate(catalog, category, skill) {
            Some(SkillRef::Custom(name)) => self.find_custom(category, &name).and_then(|c| c.cap),
            Some(SkillRef::BuiltIn(name)) => catalog_skill(catalog, category, &name).and_then(|s| s.cap),
            None => None,
        };
        self.resolve_cap(meta, declared)
    }

    fn resolve_cap(&self, meta: Option<&SkillMeta>, declared: Option<u32>) -> u32 {
        meta.and_then(|m| m.cap)
            .filter(|cap| *cap > 0)
            .or(declared.filter(|cap| *cap > 0))
            .unwrap_or(self.default_cap)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// Find a skill by name (normalized comparison) among the category's
    /// built-in and custom skills.
    pub fn locate(&self, catalog: &[CatalogCategory], category: &str, skill: &str) -> Option<SkillRef> {
        if let Some(builtin) = catalog_skill(catalog, category, skill) {
            return Some(SkillRef::BuiltIn(builtin.name.clone()));
        }
        self.find_custom(category, skill)
            .map(|custom| SkillRef::Custom(custom.name.clone()))
    }

    /// Whether `name` collides with any skill of the category (tombstoned
    /// built-ins included), ignoring the skill named `except`.
    pub fn name_taken(
        &self,
        catalog: &[CatalogCategory],
        category: &str,
        name: &str,
        except: Option<&str>,
    ) -> bool {
        let key = normalize_skill_name(name);
        let skip = except.map(normalize_skill_name);
        let builtin = catalog
            .iter()
            .filter(|c| c.id == category)
            .flat_map(|c| c.skills.iter().map(|s| s.name.as_str()));
        let custom = self.custom_skills(category).iter().map(|s| s.name.as_str());

        builtin.chain(custom).any(|existing| {
            let existing = normalize_skill_name(existing);
            existing == key && skip.as_ref() != Some(&existing)
        })
    }

    pub fn custom_skills(&self, category: &str) -> &[CustomSkill] {
        self.custom.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_custom(&self, category: &str, name: &str) -> Option<&CustomSkill> {
        let key = normalize_skill_name(name);
        self.custom_skills(category)
            .iter()
            .find(|s| normalize_skill_name(&s.name) == key)
    }

    pub fn meta_for(&self, category: &str, skill: &str) -> Option<&SkillMeta> {
        self.meta
            .get(category)
            .and_then(|entries| entries.get(&normalize_skill_name(skill)))
    }

    // -----------------------------------------------------------------------
    // Mutation
    // -----------------------------------------------------------------------

    /// Append a custom skill. Collision checks are the caller's job.
    pub fn add_custom(&mut self, category: &str, skill: CustomSkill) {
        self.custom.entry(category.to_string()).or_default().push(skill);
    }

    /// Mutable access to a custom skill definition.
    pub fn custom_mut(&mut self, category: &str, name: &str) -> Option<&mut CustomSkill> {
        let key = normalize_skill_name(name);
        self.custom
            .get_mut(category)?
            .iter_mut()
            .find(|s| normalize_skill_name(&s.name) == key)
    }

    /// Rename a custom skill and move its meta entry. Returns false when the
    /// skill does not exist.
    pub fn rename_custom(&mut self, category: &str, old: &str, new: &str) -> bool {
        let Some(skill) = self.custom_mut(category, old) else {
            return false;
        };
        skill.name = new.to_string();

        if let Some(entries) = self.meta.get_mut(category) {
            if let Some(meta) = entries.remove(&normalize_skill_name(old)) {
                entries.insert(normalize_skill_name(new), meta);
            }
        }
        true
    }

    /// Remove a custom skill and its meta entry. Returns the removed
    /// definition.
    pub fn remove_custom(&mut self, category: &str, name: &str) -> Option<CustomSkill> {
        let key = normalize_skill_name(name);
        let skills = self.custom.get_mut(category)?;
        let index = skills
            .iter()
            .position(|s| normalize_skill_name(&s.name) == key)?;
        let removed = skills.remove(index);

        if let Some(entries) = self.meta.get_mut(category) {
            entries.remove(&key);
        }
        Some(removed)
    }

    /// Mutable access to a skill's meta entry, creating it when absent.
    pub fn meta_mut(&mut self, category: &str, skill: &str) -> &mut SkillMeta {
        self.meta
            .entry(category.to_string())
            .or_default()
            .entry(normalize_skill_name(skill))
            .or_default()
    }

    /// Drop a meta entry that no longer overrides anything.
    pub fn prune_meta(&mut self, category: &str, skill: &str) {
        if let Some(entries) = self.meta.get_mut(category) {
            let key = normalize_skill_name(skill);
            if entries.get(&key).is_some_and(SkillMeta::is_empty) {
                entries.remove(&key);
            }
        }
    }
}

fn catalog_skill<'a>(
    catalog: &'a [CatalogCategory],
    category: &str,
    skill: &str,
) -> Option<&'a CatalogSkill> {
    let key = normalize_skill_name(skill);
    catalog
        .iter()
        .find(|c| c.id == category)?
        .skills
        .iter()
        .find(|s| normalize_skill_name(&s.name) == key)
}
