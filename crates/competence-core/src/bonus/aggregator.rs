//! Per-skill bonus aggregation.
//!
//! Stat names from item modifiers and companion bonuses are matched against
//! skill names through a normalized lookup that also knows aliases (one key
//! feeding several skills). The breakdown is derived on demand and never
//! persisted.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use competence_types::bonus::{
    BonusBreakdown, BonusDetail, CompanionBonus, EquipmentSnapshot, ModifierKind,
    SkillBonusBreakdown,
};
use competence_types::catalog::Category;
use competence_types::name::normalize_skill_name;

use super::source::ModifierResolver;

/// Label used for companion bonuses that do not name their source.
pub const DEFAULT_COMPANION_LABEL: &str = "Nokorah";

/// Fallback label for item contributions whose definition has no name.
const DEFAULT_ITEM_LABEL: &str = "Objet";

/// Normalized stat name → skill names lookup.
#[derive(Debug, Clone, Default)]
pub struct BonusAggregator {
    lookup: HashMap<String, BTreeSet<String>>,
}

impl BonusAggregator {
    /// Build the lookup from hydrated categories and an alias table.
    ///
    /// Every visible skill maps from its own normalized name. Each alias
    /// maps to the visible skills matching its targets; targets that match
    /// no skill are ignored.
    pub fn new(categories: &[Category], aliases: &BTreeMap<String, Vec<String>>) -> Self {
        let mut lookup: HashMap<String, BTreeSet<String>> = HashMap::new();
        let mut by_name: HashMap<String, BTreeSet<String>> = HashMap::new();

        for skill in categories.iter().flat_map(|c| c.visible_skills()) {
            let key = normalize_skill_name(&skill.name);
            by_name.entry(key.clone()).or_default().insert(skill.name.clone());
            lookup.entry(key).or_default().insert(skill.name.clone());
        }

        for (alias, targets) in aliases {
            let names: BTreeSet<String> = targets
                .iter()
                .filter_map(|target| by_name.get(&normalize_skill_name(target)))
                .flatten()
                .cloned()
                .collect();
            if !names.is_empty() {
                lookup
                    .entry(normalize_skill_name(alias))
                    .or_default()
                    .extend(names);
            }
        }

        Self { lookup }
    }

    /// Skill names a stat contributes to (possibly none).
    pub fn resolve(&self, stat: &str) -> impl Iterator<Item = &str> {
        self.lookup
            .get(&normalize_skill_name(stat))
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Aggregate item and companion bonuses per skill.
    ///
    /// Only flat modifiers count. Entries sharing a source label are summed
    /// into one detail line. Sums saturate at the `i64` bounds. A missing snapshot or unresolvable item simply
    /// contributes nothing.
    pub fn breakdown<M: ModifierResolver + ?Sized>(
        &self,
        equipment: Option<&EquipmentSnapshot>,
        resolver: &M,
        companion: &[CompanionBonus],
    ) -> BonusBreakdown {
        let mut out = BonusBreakdown::new();

        if let Some(snapshot) = equipment {
            let refs = snapshot
                .equipped_slots
                .iter()
                .chain(snapshot.active_consumable_effects.iter());
            for item_ref in refs {
                let Some(item) = resolver.resolve(item_ref) else {
                    tracing::trace!(?item_ref, "item did not resolve");
                    continue;
                };
                let label = if item.name.trim().is_empty() {
                    DEFAULT_ITEM_LABEL
                } else {
                    item.name.as_str()
                };
                for modifier in &item.modifiers {
                    if modifier.kind != ModifierKind::Flat || modifier.value == 0 {
                        continue;
                    }
                    for skill in self.resolve(&modifier.stat) {
                        let entry = out.entry(skill.to_string()).or_default();
                        entry.items = entry.items.saturating_add(modifier.value);
                        entry.total = entry.total.saturating_add(modifier.value);
                        merge_detail(&mut entry.item_details, label, modifier.value);
                    }
                }
            }
        }

        for bonus in companion {
            if bonus.points == 0 {
                continue;
            }
            let label = if bonus.source.trim().is_empty() {
                DEFAULT_COMPANION_LABEL
            } else {
                bonus.source.as_str()
            };
            for skill in self.resolve(&bonus.name) {
                let entry: &mut SkillBonusBreakdown = out.entry(skill.to_string()).or_default();
                entry.companion = entry.companion.saturating_add(bonus.points);
                entry.total = entry.total.saturating_add(bonus.points);
                merge_detail(&mut entry.companion_details, label, bonus.points);
            }
        }

        out
    }
}

fn merge_detail(details: &mut Vec<BonusDetail>, label: &str, value: i64) {
    match details.iter_mut().find(|d| d.label == label) {
        Some(detail) => detail.value = detail.value.saturating_add(value),
        None => details.push(BonusDetail {
            label: label.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use competence_types::bonus::{ItemDefinition, ItemRef, Modifier};
    use competence_types::catalog::{Skill, SkillOrigin};

    struct ItemTable(Vec<ItemDefinition>);

    impl ModifierResolver for ItemTable {
        fn resolve(&self, item: &ItemRef) -> Option<ItemDefinition> {
            match item {
                ItemRef::Index(i) => self.0.get(*i).cloned(),
                ItemRef::Name(name) => self.0.iter().find(|d| &d.name == name).cloned(),
            }
        }
    }

    fn skill(name: &str, tombstoned: bool) -> Skill {
        Skill {
            name: name.to_string(),
            icon: String::new(),
            cap: 40,
            base_value: 0,
            origin: SkillOrigin::BuiltIn { tombstoned },
        }
    }

    fn categories() -> Vec<Category> {
        vec![Category {
            id: "combat".to_string(),
            label: "Combat".to_string(),
            icon: String::new(),
            skills: vec![
                skill("Force", false),
                skill("Esquive", false),
                skill("Parade", false),
                skill("Tir", true),
            ],
        }]
    }

    fn flat(stat: &str, value: i64) -> Modifier {
        Modifier {
            stat: stat.to_string(),
            value,
            kind: ModifierKind::Flat,
        }
    }

    fn aliases() -> BTreeMap<String, Vec<String>> {
        BTreeMap::from([(
            "Agilité".to_string(),
            vec!["Esquive".to_string(), "Parade".to_string(), "Acrobatie".to_string()],
        )])
    }

    #[test]
    fn test_items_and_companion_combine() {
        let items = ItemTable(vec![ItemDefinition {
            name: "Gantelets".to_string(),
            modifiers: vec![flat("Force", 3)],
        }]);
        let snapshot = EquipmentSnapshot {
            equipped_slots: vec![ItemRef::Index(0)],
            active_consumable_effects: vec![],
        };
        let companion = vec![CompanionBonus {
            name: "Force".to_string(),
            points: 2,
            source: String::new(),
        }];

        let aggregator = BonusAggregator::new(&categories(), &BTreeMap::new());
        let breakdown = aggregator.breakdown(Some(&snapshot), &items, &companion);

        let force = &breakdown["Force"];
        assert_eq!(force.items, 3);
        assert_eq!(force.companion, 2);
        assert_eq!(force.total, 5);
        assert_eq!(force.item_details, vec![BonusDetail { label: "Gantelets".to_string(), value: 3 }]);
        assert_eq!(force.companion_details[0].label, DEFAULT_COMPANION_LABEL);
    }

    #[test]
    fn test_percent_modifiers_are_excluded() {
        let items = ItemTable(vec![ItemDefinition {
            name: "Anneau".to_string(),
            modifiers: vec![
                Modifier {
                    stat: "Force".to_string(),
                    value: 10,
                    kind: ModifierKind::Percent,
                },
                flat("force", 1),
            ],
        }]);
        let snapshot = EquipmentSnapshot {
            equipped_slots: vec![ItemRef::Name("Anneau".to_string())],
            active_consumable_effects: vec![],
        };
        let breakdown = BonusAggregator::new(&categories(), &BTreeMap::new())
            .breakdown(Some(&snapshot), &items, &[]);
        assert_eq!(breakdown["Force"].total, 1);
    }

    #[test]
    fn test_alias_feeds_multiple_skills() {
        let items = ItemTable(vec![ItemDefinition {
            name: "Bottes".to_string(),
            modifiers: vec![flat("agilite", 2)],
        }]);
        let snapshot = EquipmentSnapshot {
            equipped_slots: vec![ItemRef::Index(0)],
            active_consumable_effects: vec![],
        };
        let breakdown = BonusAggregator::new(&categories(), &aliases())
            .breakdown(Some(&snapshot), &items, &[]);
        assert_eq!(breakdown["Esquive"].items, 2);
        assert_eq!(breakdown["Parade"].items, 2);
        assert!(!breakdown.contains_key("Acrobatie"));
    }

    #[test]
    fn test_same_label_entries_are_summed() {
        let items = ItemTable(vec![ItemDefinition {
            name: "Potion de force".to_string(),
            modifiers: vec![flat("Force", 1)],
        }]);
        let snapshot = EquipmentSnapshot {
            equipped_slots: vec![],
            active_consumable_effects: vec![ItemRef::Index(0), ItemRef::Index(0)],
        };
        let companion = vec![
            CompanionBonus {
                name: "Force".to_string(),
                points: 1,
                source: "Lien".to_string(),
            },
            CompanionBonus {
                name: "FORCE".to_string(),
                points: 2,
                source: "Lien".to_string(),
            },
        ];
        let breakdown = BonusAggregator::new(&categories(), &BTreeMap::new())
            .breakdown(Some(&snapshot), &items, &companion);
        let force = &breakdown["Force"];
        assert_eq!(force.item_details.len(), 1);
        assert_eq!(force.item_details[0].value, 2);
        assert_eq!(force.companion_details, vec![BonusDetail { label: "Lien".to_string(), value: 3 }]);
        assert_eq!(force.total, 5);
    }

    #[test]
    fn test_missing_snapshot_and_unknown_stats_yield_nothing() {
        let items = ItemTable(vec![]);
        let snapshot = EquipmentSnapshot {
            equipped_slots: vec![ItemRef::Index(7), ItemRef::Name("Fantôme".to_string())],
            active_consumable_effects: vec![],
        };
        let companion = vec![CompanionBonus {
            name: "Charisme".to_string(),
            points: 4,
            source: String::new(),
        }];
        let aggregator = BonusAggregator::new(&categories(), &BTreeMap::new());
        assert!(aggregator.breakdown(None, &items, &[]).is_empty());
        assert!(aggregator.breakdown(Some(&snapshot), &items, &companion).is_empty());
    }

    #[test]
    fn test_tombstoned_skills_get_no_bonus() {
        let companion = vec![CompanionBonus {
            name: "Tir".to_string(),
            points: 4,
            source: String::new(),
        }];
        let breakdown = BonusAggregator::new(&categories(), &BTreeMap::new())
            .breakdown(None, &ItemTable(vec![]), &companion);
        assert!(breakdown.is_empty());
    }

    #[test]
    fn test_huge_values_saturate() {
        let items = ItemTable(vec![ItemDefinition {
            name: "Relique".to_string(),
            modifiers: vec![flat("Force", i64::MAX)],
        }]);
        let snapshot = EquipmentSnapshot {
            equipped_slots: vec![ItemRef::Index(0), ItemRef::Index(0)],
            active_consumable_effects: vec![],
        };
        let companion = vec![
            CompanionBonus {
                name: "Force".to_string(),
                points: i64::MAX,
                source: "Lien".to_string(),
            },
            CompanionBonus {
                name: "Esquive".to_string(),
                points: i64::MIN,
                source: "Malédiction".to_string(),
            },
            CompanionBonus {
                name: "Esquive".to_string(),
                points: -1,
                source: "Malédiction".to_string(),
            },
        ];

        let breakdown = BonusAggregator::new(&categories(), &BTreeMap::new())
            .breakdown(Some(&snapshot), &items, &companion);
        let force = &breakdown["Force"];
        assert_eq!(force.items, i64::MAX);
        assert_eq!(force.item_details[0].value, i64::MAX);
        assert_eq!(force.total, i64::MAX);
        let esquive = &breakdown["Esquive"];
        assert_eq!(esquive.companion, i64::MIN);
        assert_eq!(esquive.companion_details[0].value, i64::MIN);
    }
}
