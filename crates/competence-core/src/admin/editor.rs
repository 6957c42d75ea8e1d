//! Structural edits: add, rename/recap/re-icon, delete and restore skills,
//! plus budget top-up and category reset.
//!
//! Every operation validates its whole input before touching state, so a
//! rejected edit leaves the registry and the allocation store exactly as
//! they were. Authorization is checked by the session before an editor is
//! handed out.

use competence_types::catalog::{CatalogCategory, SkillOrigin};
use competence_types::config::AllocationConfig;
use competence_types::error::AdminEditError;
use competence_types::name::same_skill_name;
use competence_types::skill::{CustomSkill, EditOutcome, NewSkill, SkillDraft};

use crate::allocation::AllocationStore;
use crate::catalog::registry::{CustomSkillRegistry, SkillRef};

/// Borrowed view over the mutable layers of one character's sheet.
pub struct AdminEditor<'a> {
    catalog: &'a [CatalogCategory],
    registry: &'a mut CustomSkillRegistry,
    store: &'a mut AllocationStore,
    config: &'a AllocationConfig,
}

impl<'a> AdminEditor<'a> {
    pub fn new(
        catalog: &'a [CatalogCategory],
        registry: &'a mut CustomSkillRegistry,
        store: &'a mut AllocationStore,
        config: &'a AllocationConfig,
    ) -> Self {
        Self {
            catalog,
            registry,
            store,
            config,
        }
    }

    /// Add a custom skill to a category.
    ///
    /// Rejects empty names, non-positive caps, and names that collide (after
    /// normalization) with any skill of the category. Seeds a zero base
    /// value and an empty allocation entry.
    pub fn add_custom_skill(
        &mut self,
        category: &str,
        request: NewSkill,
    ) -> Result<CustomSkill, AdminEditError> {
        self.require_category(category)?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AdminEditError::EmptyName);
        }
        let cap = match request.cap {
            Some(cap) if cap <= 0 => return Err(AdminEditError::InvalidCap(cap)),
            Some(cap) => Some(u32::try_from(cap).unwrap_or(u32::MAX)),
            None => None,
        };
        if self.registry.name_taken(self.catalog, category, &name, None) {
            return Err(AdminEditError::NameCollision {
                category: category.to_string(),
                name,
            });
        }

        let skill = CustomSkill {
            name: name.clone(),
            icon: request.icon.unwrap_or_default(),
            cap,
        };
        self.registry.add_custom(category, skill.clone());
        self.store.ensure_skill_entry(category, &name);

        tracing::info!(category, skill = %name, "custom skill added");
        Ok(skill)
    }

    /// Apply an inline-editor draft to an existing skill.
    ///
    /// Built-in skills keep their name (a rename attempt is reported in the
    /// outcome notice) but still take the other fields. Custom skills may be
    /// renamed when the new name is free; their allocation, base value and
    /// meta entries follow the rename. The base value is clamped to the cap.
    pub fn apply_skill_admin_edits(
        &mut self,
        category: &str,
        skill: &str,
        draft: SkillDraft,
    ) -> Result<EditOutcome, AdminEditError> {
        self.require_category(category)?;

        let requested_name = draft.name.trim().to_string();
        if requested_name.is_empty() {
            return Err(AdminEditError::EmptyName);
        }
        if draft.base_value < 0 {
            return Err(AdminEditError::NegativeBase(draft.base_value));
        }
        if draft.cap <= 0 {
            return Err(AdminEditError::InvalidCap(draft.cap));
        }
        let cap = u32::try_from(draft.cap).unwrap_or(u32::MAX);
        let base = u32::try_from(draft.base_value).unwrap_or(u32::MAX).min(cap);

        let target = self
            .registry
            .locate(self.catalog, category, skill)
            .ok_or_else(|| AdminEditError::UnknownSkill {
                category: category.to_string(),
                skill: skill.to_string(),
            })?;
        let current = target.name().to_string();
        let wants_rename = requested_name != current;

        let mut outcome = EditOutcome {
            name: current.clone(),
            renamed: false,
            notice: None,
        };

        match target {
            SkillRef::BuiltIn(_) => {
                if wants_rename {
                    outcome.notice = Some(format!(
                        "built-in skill '{current}' cannot be renamed; other changes were applied"
                    ));
                }
                let meta = self.registry.meta_mut(category, &current);
                meta.cap = Some(cap);
                if let Some(icon) = draft.icon {
                    meta.icon = Some(icon);
                }
            }
            SkillRef::Custom(_) => {
                if wants_rename {
                    if !same_skill_name(&requested_name, &current)
                        && self
                            .registry
                            .name_taken(self.catalog, category, &requested_name, Some(&current))
                    {
                        return Err(AdminEditError::NameCollision {
                            category: category.to_string(),
                            name: requested_name,
                        });
                    }
                    self.registry
                        .rename_custom(category, &current, &requested_name);
                    self.store.rename_skill(category, &current, &requested_name);
                    outcome.name = requested_name;
                    outcome.renamed = true;
                }
                if let Some(definition) = self.registry.custom_mut(category, &outcome.name) {
                    definition.cap = Some(cap);
                    if let Some(icon) = draft.icon {
                        definition.icon = icon;
                    }
                }
                // A custom definition now carries the cap itself
                if self
                    .registry
                    .meta_for(category, &outcome.name)
                    .is_some_and(|m| m.cap.is_some())
                {
                    self.registry.meta_mut(category, &outcome.name).cap = None;
                    self.registry.prune_meta(category, &outcome.name);
                }
            }
        }

        let effective_cap = self.registry.skill_cap(self.catalog, category, &outcome.name);
        self.store
            .set_base_value(category, &outcome.name, base, effective_cap);

        tracing::info!(
            category,
            skill = %outcome.name,
            renamed = outcome.renamed,
            cap = effective_cap,
            base,
            "skill edited"
        );
        Ok(outcome)
    }

    /// Delete a skill from the inline editor.
    ///
    /// Built-in skills are tombstoned; custom skills are removed from the
    /// registry. In both cases the skill's pending and committed points are
    /// refunded to the category budget. Returns the refunded amount.
    pub fn delete_skill(&mut self, category: &str, skill: &str) -> Result<u32, AdminEditError> {
        self.require_category(category)?;

        let target = self
            .registry
            .locate(self.catalog, category, skill)
            .ok_or_else(|| AdminEditError::UnknownSkill {
                category: category.to_string(),
                skill: skill.to_string(),
            })?;

        let origin = match &target {
            SkillRef::BuiltIn(name) => {
                self.registry.meta_mut(category, name).deleted = Some(true);
                SkillOrigin::BuiltIn { tombstoned: true }
            }
            SkillRef::Custom(name) => {
                self.registry.remove_custom(category, name);
                SkillOrigin::Custom
            }
        };
        let refund = self.store.clear_skill(category, target.name());

        tracing::info!(category, skill = %target.name(), ?origin, refund, "skill deleted");
        Ok(refund)
    }

    /// Lift the tombstone of a built-in skill.
    pub fn restore_skill(&mut self, category: &str, skill: &str) -> Result<(), AdminEditError> {
        self.require_category(category)?;

        let name = match self.registry.locate(self.catalog, category, skill) {
            Some(SkillRef::BuiltIn(name))
                if self
                    .registry
                    .meta_for(category, &name)
                    .is_some_and(|m| m.is_deleted()) =>
            {
                name
            }
            Some(other) => return Err(AdminEditError::NotDeleted(other.name().to_string())),
            None => {
                return Err(AdminEditError::UnknownSkill {
                    category: category.to_string(),
                    skill: skill.to_string(),
                });
            }
        };

        self.registry.meta_mut(category, &name).deleted = None;
        self.registry.prune_meta(category, &name);
        tracing::info!(category, skill = %name, "skill restored");
        Ok(())
    }

    /// Return every allocated point of the category to its budget and clear
    /// the lock. Returns the restored budget.
    pub fn reset_category(&mut self, category: &str) -> Result<u32, AdminEditError> {
        self.require_category(category)?;
        Ok(self.store.reset(category))
    }

    /// Set the category budget, clamped to `[0, max_budget]`. Returns the
    /// stored value.
    pub fn set_category_budget(&mut self, category: &str, value: i64) -> Result<u32, AdminEditError> {
        self.require_category(category)?;
        let stored = self.store.set_budget(category, value, self.config.max_budget);
        tracing::info!(category, requested = value, stored, "category budget set");
        Ok(stored)
    }

    fn require_category(&self, category: &str) -> Result<(), AdminEditError> {
        if self.catalog.iter().any(|c| c.id == category) {
            Ok(())
        } else {
            Err(AdminEditError::UnknownCategory(category.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use competence_types::catalog::CatalogSkill;
    use competence_types::profile::CompetenceProfile;

    struct Fixture {
        catalog: Vec<CatalogCategory>,
        registry: CustomSkillRegistry,
        store: AllocationStore,
        config: AllocationConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let catalog = vec![CatalogCategory {
                id: "artisanat".to_string(),
                label: "Artisanat".to_string(),
                icon: String::new(),
                skills: vec![CatalogSkill {
                    name: "Forge".to_string(),
                    icon: "⚒️".to_string(),
                    cap: Some(30),
                }],
            }];
            let config = AllocationConfig::default();
            let store = AllocationStore::seeded(&catalog, &config);
            Self {
                catalog,
                registry: CustomSkillRegistry::new(config.default_cap),
                store,
                config,
            }
        }

        fn editor(&mut self) -> AdminEditor<'_> {
            AdminEditor::new(&self.catalog, &mut self.registry, &mut self.store, &self.config)
        }

        fn snapshot(&self) -> CompetenceProfile {
            let mut profile = CompetenceProfile::default();
            self.store.write_into(&mut profile);
            self.registry.write_into(&mut profile);
            profile
        }
    }

    fn new_skill(name: &str) -> NewSkill {
        NewSkill {
            name: name.to_string(),
            icon: Some("🔧".to_string()),
            cap: Some(20),
        }
    }

    fn draft(name: &str, base: i64, cap: i64) -> SkillDraft {
        SkillDraft {
            name: name.to_string(),
            base_value: base,
            cap,
            icon: None,
        }
    }

    #[test]
    fn test_add_custom_skill_seeds_state() {
        let mut fx = Fixture::new();
        let skill = fx.editor().add_custom_skill("artisanat", new_skill(" Brico ")).unwrap();
        assert_eq!(skill.name, "Brico");
        assert_eq!(skill.cap, Some(20));

        let profile = fx.snapshot();
        assert_eq!(profile.allocations_by_category["artisanat"]["Brico"], 0);
        assert_eq!(profile.base_values_by_category["artisanat"]["Brico"], 0);
        assert_eq!(profile.custom_skills_by_category["artisanat"].len(), 1);
    }

    #[test]
    fn test_add_custom_skill_rejects_collisions_without_mutation() {
        let mut fx = Fixture::new();
        fx.editor().add_custom_skill("artisanat", new_skill("Brico")).unwrap();
        let before = fx.snapshot();

        let err = fx.editor().add_custom_skill("artisanat", new_skill("FORGE")).unwrap_err();
        assert!(matches!(err, AdminEditError::NameCollision { .. }));
        let err = fx.editor().add_custom_skill("artisanat", new_skill("brîco")).unwrap_err();
        assert!(matches!(err, AdminEditError::NameCollision { .. }));

        assert_eq!(fx.snapshot(), before);
    }

    #[test]
    fn test_add_custom_skill_validation() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.editor().add_custom_skill("artisanat", new_skill("  ")).unwrap_err(),
            AdminEditError::EmptyName
        );
        let mut bad_cap = new_skill("Lasso");
        bad_cap.cap = Some(0);
        assert_eq!(
            fx.editor().add_custom_skill("artisanat", bad_cap).unwrap_err(),
            AdminEditError::InvalidCap(0)
        );
        assert_eq!(
            fx.editor().add_custom_skill("magie", new_skill("Lasso")).unwrap_err(),
            AdminEditError::UnknownCategory("magie".to_string())
        );
    }

    #[test]
    fn test_rename_custom_skill_migrates_keys() {
        let mut fx = Fixture::new();
        fx.editor().add_custom_skill("artisanat", new_skill("Brico")).unwrap();
        fx.store.adjust("artisanat", "Brico", 4, 20);
        fx.store.confirm("artisanat", |_| 20);
        fx.store.adjust("artisanat", "Brico", 2, 20);

        let outcome = fx
            .editor()
            .apply_skill_admin_edits("artisanat", "Brico", draft("Bricolage", 4, 20))
            .unwrap();
        assert!(outcome.renamed);
        assert_eq!(outcome.name, "Bricolage");

        let profile = fx.snapshot();
        let allocations = &profile.allocations_by_category["artisanat"];
        let bases = &profile.base_values_by_category["artisanat"];
        assert_eq!(allocations.get("Bricolage"), Some(&2));
        assert_eq!(bases.get("Bricolage"), Some(&4));
        assert!(!allocations.contains_key("Brico"));
        assert!(!bases.contains_key("Brico"));
        assert_eq!(profile.custom_skills_by_category["artisanat"][0].name, "Bricolage");
    }

    #[test]
    fn test_rename_custom_skill_collision_is_rejected() {
        let mut fx = Fixture::new();
        fx.editor().add_custom_skill("artisanat", new_skill("Brico")).unwrap();
        let before = fx.snapshot();

        let err = fx
            .editor()
            .apply_skill_admin_edits("artisanat", "Brico", draft("forge", 3, 10))
            .unwrap_err();
        assert!(matches!(err, AdminEditError::NameCollision { .. }));
        assert_eq!(fx.snapshot(), before);
    }

    #[test]
    fn test_case_only_rename_of_custom_skill() {
        let mut fx = Fixture::new();
        fx.editor().add_custom_skill("artisanat", new_skill("brico")).unwrap();
        let outcome = fx
            .editor()
            .apply_skill_admin_edits("artisanat", "brico", draft("Brico", 0, 20))
            .unwrap();
        assert!(outcome.renamed);
        assert_eq!(fx.registry.custom_skills("artisanat")[0].name, "Brico");
    }

    #[test]
    fn test_builtin_rename_rejected_but_fields_apply() {
        let mut fx = Fixture::new();
        let mut edit = draft("Forgeron", 12, 15);
        edit.icon = Some("🔥".to_string());

        let outcome = fx
            .editor()
            .apply_skill_admin_edits("artisanat", "Forge", edit)
            .unwrap();
        assert!(!outcome.renamed);
        assert_eq!(outcome.name, "Forge");
        assert!(outcome.notice.is_some());

        let categories = fx.registry.hydrate(&fx.catalog, |c, s| fx.store.base_value(c, s));
        let forge = categories[0].find_skill("Forge").unwrap();
        assert_eq!(forge.cap, 15);
        assert_eq!(forge.icon, "🔥");
        assert_eq!(forge.base_value, 12);
        assert!(categories[0].find_skill("Forgeron").is_none());
    }

    #[test]
    fn test_edit_clamps_base_to_cap() {
        let mut fx = Fixture::new();
        fx.editor()
            .apply_skill_admin_edits("artisanat", "Forge", draft("Forge", 50, 25))
            .unwrap();
        assert_eq!(fx.store.base_value("artisanat", "Forge"), 25);
    }

    #[test]
    fn test_edit_validation_errors() {
        let mut fx = Fixture::new();
        let before = fx.snapshot();
        assert_eq!(
            fx.editor()
                .apply_skill_admin_edits("artisanat", "Forge", draft("", 1, 10))
                .unwrap_err(),
            AdminEditError::EmptyName
        );
        assert_eq!(
            fx.editor()
                .apply_skill_admin_edits("artisanat", "Forge", draft("Forge", -1, 10))
                .unwrap_err(),
            AdminEditError::NegativeBase(-1)
        );
        assert_eq!(
            fx.editor()
                .apply_skill_admin_edits("artisanat", "Forge", draft("Forge", 1, 0))
                .unwrap_err(),
            AdminEditError::InvalidCap(0)
        );
        assert!(matches!(
            fx.editor()
                .apply_skill_admin_edits("artisanat", "Tissage", draft("Tissage", 1, 10))
                .unwrap_err(),
            AdminEditError::UnknownSkill { .. }
        ));
        assert_eq!(fx.snapshot(), before);
    }

    #[test]
    fn test_delete_builtin_tombstones_and_refunds() {
        let mut fx = Fixture::new();
        fx.store.adjust("artisanat", "Forge", 5, 30);
        let budget_before = fx.store.budget("artisanat") + 5;

        let refund = fx.editor().delete_skill("artisanat", "forge").unwrap();
        assert_eq!(refund, 5);
        assert_eq!(fx.store.budget("artisanat"), budget_before);

        let categories = fx.registry.hydrate(&fx.catalog, |_, _| 0);
        assert!(categories[0].find_skill("Forge").unwrap().is_tombstoned());
        assert_eq!(categories[0].visible_skills().count(), 0);

        fx.editor().restore_skill("artisanat", "Forge").unwrap();
        let categories = fx.registry.hydrate(&fx.catalog, |_, _| 0);
        assert!(!categories[0].find_skill("Forge").unwrap().is_tombstoned());
        assert!(fx.snapshot().meta_by_category["artisanat"].is_empty());
    }

    #[test]
    fn test_delete_custom_removes_everything() {
        let mut fx = Fixture::new();
        fx.editor().add_custom_skill("artisanat", new_skill("Brico")).unwrap();
        fx.store.adjust("artisanat", "Brico", 3, 20);

        assert_eq!(fx.editor().delete_skill("artisanat", "Brico").unwrap(), 3);
        let profile = fx.snapshot();
        assert!(profile.custom_skills_by_category["artisanat"].is_empty());
        assert!(!profile.allocations_by_category["artisanat"].contains_key("Brico"));
        assert!(!profile.base_values_by_category["artisanat"].contains_key("Brico"));

        // The name is free again
        fx.editor().add_custom_skill("artisanat", new_skill("Brico")).unwrap();
    }

    #[test]
    fn test_restore_requires_tombstone() {
        let mut fx = Fixture::new();
        assert_eq!(
            fx.editor().restore_skill("artisanat", "Forge").unwrap_err(),
            AdminEditError::NotDeleted("Forge".to_string())
        );
    }

    #[test]
    fn test_budget_and_reset() {
        let mut fx = Fixture::new();
        assert_eq!(fx.editor().set_category_budget("artisanat", 120).unwrap(), 99);
        fx.store.adjust("artisanat", "Forge", 9, 30);
        assert_eq!(fx.editor().reset_category("artisanat").unwrap(), 99);
        assert!(fx.editor().reset_category("magie").is_err());
    }
}
