//! Category budgets, pending allocations, committed base values and locks.
//!
//! `AllocationStore` is plain data with synchronous operations. It knows
//! nothing about caps or skill definitions: callers pass the effective cap
//! of the skill they touch. Budget/cap violations are clamped, never
//! reported; every operation returns whether state changed.
//!
//! Conservation: `adjust` only moves points between the category budget and
//! pending allocations, so `budget + Σpending` is invariant under it.
//! `confirm` moves pending into committed base and refunds whatever the cap
//! cannot hold. `reset` returns everything to the budget.

use std::collections::BTreeMap;

use competence_types::catalog::CatalogCategory;
use competence_types::config::AllocationConfig;
use competence_types::profile::{CompetenceProfile, SkillPoints};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationStore {
    budgets: BTreeMap<String, u32>,
    pending: SkillPoints,
    base: SkillPoints,
    locks: BTreeMap<String, bool>,
}

impl AllocationStore {
    /// Restore the store from a persisted profile.
    pub fn from_profile(profile: &CompetenceProfile) -> Self {
        Self {
            budgets: profile.points_by_category.clone(),
            pending: profile.allocations_by_category.clone(),
            base: profile.base_values_by_category.clone(),
            locks: profile.locks_by_category.clone(),
        }
    }

    /// Fresh state for a character without persisted data: every catalog
    /// category gets its default budget, no allocation, no lock.
    pub fn seeded(catalog: &[CatalogCategory], config: &AllocationConfig) -> Self {
        let mut store = Self::default();
        for category in catalog {
            store.ensure_category(&category.id, config.default_points_for(&category.id));
        }
        store
    }

    /// Write the allocation part of the state into `profile`.
    pub fn write_into(&self, profile: &mut CompetenceProfile) {
        profile.points_by_category = self.budgets.clone();
        profile.allocations_by_category = self.pending.clone();
        profile.base_values_by_category = self.base.clone();
        profile.locks_by_category = self.locks.clone();
    }

    /// Make sure a category has a budget entry, seeding `default_budget`
    /// when it is missing (e.g. a category added to the catalog after the
    /// character was created). Returns true when an entry was created.
    pub fn ensure_category(&mut self, category: &str, default_budget: u32) -> bool {
        if self.budgets.contains_key(category) {
            return false;
        }
        self.budgets.insert(category.to_string(), default_budget);
        self.pending.entry(category.to_string()).or_default();
        self.base.entry(category.to_string()).or_default();
        self.locks.entry(category.to_string()).or_insert(false);
        true
    }

    /// Seed zeroed pending/base entries for a newly added skill.
    pub fn ensure_skill_entry(&mut self, category: &str, skill: &str) {
        self.pending
            .entry(category.to_string())
            .or_default()
            .entry(skill.to_string())
            .or_insert(0);
        self.base
            .entry(category.to_string())
            .or_default()
            .entry(skill.to_string())
            .or_insert(0);
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn budget(&self, category: &str) -> u32 {
        self.budgets.get(category).copied().unwrap_or(0)
    }

    pub fn pending(&self, category: &str, skill: &str) -> u32 {
        lookup(&self.pending, category, skill)
    }

    pub fn base_value(&self, category: &str, skill: &str) -> u32 {
        lookup(&self.base, category, skill)
    }

    /// Committed base plus pending points.
    pub fn skill_total(&self, category: &str, skill: &str) -> u32 {
        self.base_value(category, skill)
            .saturating_add(self.pending(category, skill))
    }

    pub fn is_locked(&self, category: &str) -> bool {
        self.locks.get(category).copied().unwrap_or(false)
    }

    pub fn pending_total(&self, category: &str) -> u32 {
        sum(&self.pending, category)
    }

    pub fn committed_total(&self, category: &str) -> u32 {
        sum(&self.base, category)
    }

    /// Category ids with a budget entry.
    pub fn category_ids(&self) -> impl Iterator<Item = &str> {
        self.budgets.keys().map(String::as_str)
    }

    // -----------------------------------------------------------------------
    // Player operations
    // -----------------------------------------------------------------------

    /// Move points between the category budget and a skill's pending
    /// allocation.
    ///
    /// A positive `delta` spends `min(delta, budget, cap - (base + pending))`;
    /// a negative one refunds `min(|delta|, pending)`. Returns false (and
    /// changes nothing) when the category is locked or the clamped amount is
    /// zero.
    pub fn adjust(&mut self, category: &str, skill: &str, delta: i64, cap: u32) -> bool {
        if delta == 0 || self.is_locked(category) {
            return false;
        }

        let budget = self.budget(category);
        let pending = self.pending(category, skill);

        if delta > 0 {
            let requested = u32::try_from(delta).unwrap_or(u32::MAX);
            let room = cap.saturating_sub(self.skill_total(category, skill));
            let amount = requested.min(budget).min(room);
            if amount == 0 {
                return false;
            }
            self.set_budget_raw(category, budget - amount);
            self.set_pending(category, skill, pending + amount);
        } else {
            let requested = u32::try_from(delta.unsigned_abs()).unwrap_or(u32::MAX);
            let amount = requested.min(pending);
            if amount == 0 {
                return false;
            }
            self.set_pending(category, skill, pending - amount);
            self.set_budget_raw(category, budget.saturating_add(amount));
        }

        tracing::debug!(category, skill, delta, "allocation adjusted");
        true
    }

    /// Fold every pending allocation of the category into its committed
    /// base value and clear pending.
    ///
    /// `cap_of` returns the effective cap of a skill. Points the cap cannot
    /// hold go back to the budget. The category locks when the resulting
    /// budget is zero. Returns false when the category is already locked.
    pub fn confirm(&mut self, category: &str, cap_of: impl Fn(&str) -> u32) -> bool {
        if self.is_locked(category) {
            return false;
        }

        let pending = self.pending.remove(category).unwrap_or_default();
        self.pending.insert(category.to_string(), BTreeMap::new());

        let mut refund = 0u32;
        for (skill, points) in pending {
            if points == 0 {
                continue;
            }
            let base = self.base_value(category, &skill);
            let cap = cap_of(&skill);
            let wanted = base.saturating_add(points);
            let committed = wanted.min(cap.max(base));
            refund = refund.saturating_add(wanted - committed);
            self.set_base(category, &skill, committed);
        }

        let budget = self.budget(category).saturating_add(refund);
        self.set_budget_raw(category, budget);
        if budget == 0 {
            self.locks.insert(category.to_string(), true);
        }

        tracing::debug!(category, budget, locked = budget == 0, "category confirmed");
        true
    }

    // -----------------------------------------------------------------------
    // Admin operations
    // -----------------------------------------------------------------------

    /// Return every pending and committed point of the category to its
    /// budget and clear the lock. Returns the restored budget.
    pub fn reset(&mut self, category: &str) -> u32 {
        let restored = self
            .budget(category)
            .saturating_add(self.pending_total(category))
            .saturating_add(self.committed_total(category));

        self.pending.insert(category.to_string(), BTreeMap::new());
        self.base.insert(category.to_string(), BTreeMap::new());
        self.locks.insert(category.to_string(), false);
        self.set_budget_raw(category, restored);

        tracing::debug!(category, budget = restored, "category reset");
        restored
    }

    /// Set the category budget, clamped to `[0, max]`. Returns the value
    /// actually stored.
    pub fn set_budget(&mut self, category: &str, value: i64, max: u32) -> u32 {
        let clamped = value.clamp(0, i64::from(max)) as u32;
        self.set_budget_raw(category, clamped);
        clamped
    }

    /// Overwrite a skill's committed base value, clamped to `cap`. Pending
    /// points that would push the skill over its cap are refunded to the
    /// budget.
    pub fn set_base_value(&mut self, category: &str, skill: &str, value: u32, cap: u32) {
        let base = value.min(cap);
        self.set_base(category, skill, base);
        self.trim_pending(category, skill, cap);
    }

    /// Refund pending points that exceed the cap. Returns the refund.
    pub fn trim_pending(&mut self, category: &str, skill: &str, cap: u32) -> u32 {
        let pending = self.pending(category, skill);
        let room = cap.saturating_sub(self.base_value(category, skill));
        if pending <= room {
            return 0;
        }
        let excess = pending - room;
        self.set_pending(category, skill, room);
        let budget = self.budget(category).saturating_add(excess);
        self.set_budget_raw(category, budget);
        excess
    }

    /// Remove a skill's pending and committed points, refunding them to the
    /// budget. Returns the refunded amount.
    pub fn clear_skill(&mut self, category: &str, skill: &str) -> u32 {
        let pending = self
            .pending
            .get_mut(category)
            .and_then(|m| m.remove(skill))
            .unwrap_or(0);
        let base = self
            .base
            .get_mut(category)
            .and_then(|m| m.remove(skill))
            .unwrap_or(0);
        let refund = pending.saturating_add(base);
        if refund > 0 {
            let budget = self.budget(category).saturating_add(refund);
            self.set_budget_raw(category, budget);
        }
        refund
    }

    /// Move a skill's pending and committed entries from `old` to `new`,
    /// leaving nothing under the old key.
    pub fn rename_skill(&mut self, category: &str, old: &str, new: &str) {
        for map in [&mut self.pending, &mut self.base] {
            if let Some(skills) = map.get_mut(category) {
                if let Some(points) = skills.remove(old) {
                    let slot = skills.entry(new.to_string()).or_insert(0);
                    *slot = slot.saturating_add(points);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn set_budget_raw(&mut self, category: &str, value: u32) {
        self.budgets.insert(category.to_string(), value);
    }

    fn set_pending(&mut self, category: &str, skill: &str, value: u32) {
        self.pending
            .entry(category.to_string())
            .or_default()
            .insert(skill.to_string(), value);
    }

    fn set_base(&mut self, category: &str, skill: &str, value: u32) {
        self.base
            .entry(category.to_string())
            .or_default()
            .insert(skill.to_string(), value);
    }
}

fn lookup(map: &SkillPoints, category: &str, skill: &str) -> u32 {
    map.get(category)
        .and_then(|skills| skills.get(skill))
        .copied()
        .unwrap_or(0)
}

fn sum(map: &SkillPoints, category: &str) -> u32 {
    map.get(category)
        .map(|skills| skills.values().fold(0u32, |acc, v| acc.saturating_add(*v)))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: u32 = 40;

    fn store_with_budget(budget: u32) -> AllocationStore {
        let mut store = AllocationStore::default();
        store.ensure_category("combat", budget);
        store
    }

    fn conserved(store: &AllocationStore) -> u32 {
        store.budget("combat") + store.pending_total("combat")
    }

    #[test]
    fn test_scenario_spend_and_clamp_to_budget() {
        let mut store = store_with_budget(25);

        assert!(store.adjust("combat", "Force", 10, CAP));
        assert_eq!(store.pending("combat", "Force"), 10);
        assert_eq!(store.budget("combat"), 15);

        // min(20, 15, 30) = 15
        assert!(store.adjust("combat", "Force", 20, CAP));
        assert_eq!(store.pending("combat", "Force"), 25);
        assert_eq!(store.budget("combat"), 0);
    }

    #[test]
    fn test_scenario_confirm_locks_when_budget_exhausted() {
        let mut store = store_with_budget(25);
        store.adjust("combat", "Force", 10, CAP);
        store.adjust("combat", "Force", 20, CAP);

        assert!(store.confirm("combat", |_| CAP));
        assert_eq!(store.base_value("combat", "Force"), 25);
        assert_eq!(store.pending("combat", "Force"), 0);
        assert!(store.is_locked("combat"));
    }

    #[test]
    fn test_locked_category_rejects_allocation_until_reset() {
        let mut store = store_with_budget(5);
        store.adjust("combat", "Tir", 5, CAP);
        store.confirm("combat", |_| CAP);
        assert!(store.is_locked("combat"));

        assert!(!store.adjust("combat", "Tir", -1, CAP));
        assert!(!store.adjust("combat", "Esquive", 1, CAP));
        assert!(!store.confirm("combat", |_| CAP));

        assert_eq!(store.reset("combat"), 5);
        assert!(!store.is_locked("combat"));
        assert!(store.adjust("combat", "Esquive", 1, CAP));
    }

    #[test]
    fn test_confirm_keeps_unlocked_with_remaining_budget() {
        let mut store = store_with_budget(10);
        store.adjust("combat", "Tir", 4, CAP);
        store.confirm("combat", |_| CAP);
        assert!(!store.is_locked("combat"));
        assert_eq!(store.budget("combat"), 6);
        assert_eq!(store.base_value("combat", "Tir"), 4);
    }

    #[test]
    fn test_cap_limits_spend() {
        let mut store = store_with_budget(30);
        assert!(store.adjust("combat", "Tir", 50, 12));
        assert_eq!(store.pending("combat", "Tir"), 12);
        assert_eq!(store.budget("combat"), 18);

        // Maxed skill: silent no-op
        assert!(!store.adjust("combat", "Tir", 1, 12));
        assert_eq!(store.budget("combat"), 18);
    }

    #[test]
    fn test_cap_counts_committed_base() {
        let mut store = store_with_budget(30);
        store.adjust("combat", "Tir", 8, 10);
        store.confirm("combat", |_| 10);
        assert!(store.adjust("combat", "Tir", 5, 10));
        assert_eq!(store.skill_total("combat", "Tir"), 10);
    }

    #[test]
    fn test_zero_budget_is_noop() {
        let mut store = store_with_budget(0);
        assert!(!store.adjust("combat", "Tir", 3, CAP));
        assert_eq!(store.pending("combat", "Tir"), 0);
    }

    #[test]
    fn test_refund_limited_to_pending() {
        let mut store = store_with_budget(10);
        store.adjust("combat", "Tir", 3, CAP);
        assert!(store.adjust("combat", "Tir", -7, CAP));
        assert_eq!(store.pending("combat", "Tir"), 0);
        assert_eq!(store.budget("combat"), 10);
        assert!(!store.adjust("combat", "Tir", -1, CAP));
    }

    #[test]
    fn test_refund_never_touches_committed_base() {
        let mut store = store_with_budget(10);
        store.adjust("combat", "Tir", 3, CAP);
        store.confirm("combat", |_| CAP);
        assert!(!store.adjust("combat", "Tir", -3, CAP));
        assert_eq!(store.base_value("combat", "Tir"), 3);
    }

    #[test]
    fn test_budget_conservation_over_sequence() {
        let mut store = store_with_budget(17);
        let before = conserved(&store);
        let steps: [(&str, i64, u32); 9] = [
            ("Tir", 5, CAP),
            ("Force", 9, 6),
            ("Tir", -2, CAP),
            ("Esquive", 100, CAP),
            ("Force", -100, 6),
            ("Tir", i64::MAX, CAP),
            ("Esquive", i64::MIN, CAP),
            ("Parade", 0, CAP),
            ("Force", 3, 2),
        ];
        for (skill, delta, cap) in steps {
            store.adjust("combat", skill, delta, cap);
            assert_eq!(conserved(&store), before);
            assert!(store.skill_total("combat", skill) <= cap);
        }
    }

    #[test]
    fn test_confirm_refunds_points_over_cap() {
        let mut store = store_with_budget(20);
        store.adjust("combat", "Tir", 10, CAP);
        // Cap lowered after allocation
        store.confirm("combat", |_| 6);
        assert_eq!(store.base_value("combat", "Tir"), 6);
        assert_eq!(store.budget("combat"), 14);
    }

    #[test]
    fn test_reset_restores_everything() {
        let mut store = store_with_budget(20);
        store.adjust("combat", "Tir", 7, CAP);
        store.confirm("combat", |_| CAP);
        store.adjust("combat", "Force", 4, CAP);
        assert_eq!(store.reset("combat"), 20);
        assert_eq!(store.pending_total("combat"), 0);
        assert_eq!(store.committed_total("combat"), 0);
    }

    #[test]
    fn test_set_budget_clamps() {
        let mut store = store_with_budget(0);
        assert_eq!(store.set_budget("combat", 150, 99), 99);
        assert_eq!(store.set_budget("combat", -4, 99), 0);
        assert_eq!(store.set_budget("combat", 42, 99), 42);
        assert_eq!(store.budget("combat"), 42);
    }

    #[test]
    fn test_set_base_value_trims_pending() {
        let mut store = store_with_budget(20);
        store.adjust("combat", "Tir", 10, CAP);
        store.set_base_value("combat", "Tir", 35, CAP);
        assert_eq!(store.base_value("combat", "Tir"), 35);
        assert_eq!(store.pending("combat", "Tir"), 5);
        assert_eq!(store.budget("combat"), 15);

        store.set_base_value("combat", "Tir", 90, 30);
        assert_eq!(store.base_value("combat", "Tir"), 30);
        assert_eq!(store.pending("combat", "Tir"), 0);
        assert_eq!(store.budget("combat"), 20);
    }

    #[test]
    fn test_clear_skill_refunds() {
        let mut store = store_with_budget(20);
        store.adjust("combat", "Tir", 6, CAP);
        store.confirm("combat", |_| CAP);
        store.adjust("combat", "Tir", 2, CAP);
        assert_eq!(store.clear_skill("combat", "Tir"), 8);
        assert_eq!(store.budget("combat"), 20);
        assert_eq!(store.skill_total("combat", "Tir"), 0);
    }

    #[test]
    fn test_rename_skill_leaves_no_residue() {
        let mut store = store_with_budget(20);
        store.adjust("combat", "Brico", 3, CAP);
        store.confirm("combat", |_| CAP);
        store.adjust("combat", "Brico", 2, CAP);

        store.rename_skill("combat", "Brico", "Bricolage");

        assert_eq!(store.base_value("combat", "Bricolage"), 3);
        assert_eq!(store.pending("combat", "Bricolage"), 2);
        let mut profile = CompetenceProfile::default();
        store.write_into(&mut profile);
        assert!(!profile.allocations_by_category["combat"].contains_key("Brico"));
        assert!(!profile.base_values_by_category["combat"].contains_key("Brico"));
    }

    #[test]
    fn test_profile_round_trip() {
        let mut store = store_with_budget(25);
        store.ensure_category("social", 20);
        store.adjust("combat", "Tir", 25, CAP);
        store.confirm("combat", |_| CAP);
        store.adjust("social", "Persuasion", 4, CAP);

        let mut profile = CompetenceProfile::default();
        store.write_into(&mut profile);
        let json = serde_json::to_value(&profile).unwrap();
        let restored: CompetenceProfile = serde_json::from_value(json).unwrap();

        assert_eq!(AllocationStore::from_profile(&restored), store);
    }

    #[test]
    fn test_seeded_uses_default_table() {
        let catalog = vec![
            CatalogCategory {
                id: "combat".to_string(),
                label: "Combat".to_string(),
                icon: String::new(),
                skills: vec![],
            },
            CatalogCategory {
                id: "magie".to_string(),
                label: "Magie".to_string(),
                icon: String::new(),
                skills: vec![],
            },
        ];
        let store = AllocationStore::seeded(&catalog, &AllocationConfig::default());
        assert_eq!(store.budget("combat"), 25);
        assert_eq!(store.budget("magie"), 20);
        assert!(!store.is_locked("combat"));
    }
}
