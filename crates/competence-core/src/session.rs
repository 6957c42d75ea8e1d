//! One allocation session per active character.
//!
//! The session owns the character's allocation store, custom skill registry
//! and hydrated categories, and drives `PersistenceSync` after every
//! mutation. Switching characters means closing one session (which awaits a
//! final flush) and opening the next.

use std::sync::Arc;

use competence_types::bonus::{BonusBreakdown, CompanionBonus};
use competence_types::catalog::{CatalogCategory, Category};
use competence_types::character::CharacterId;
use competence_types::config::EngineConfig;
use competence_types::error::{AdminEditError, RepositoryError};
use competence_types::profile::{CompetenceProfile, PROFILE_VERSION, StoredBlock};
use competence_types::skill::{CustomSkill, EditOutcome, NewSkill, SkillDraft};
use competence_types::sync::{FlushOutcome, SyncEvent, SyncStatus};
use tokio::sync::broadcast;

use crate::admin::AdminEditor;
use crate::allocation::AllocationStore;
use crate::bonus::{BonusAggregator, EquipmentSource, ModifierResolver};
use crate::catalog::{CatalogProvider, CustomSkillRegistry};
use crate::identity::IdentityProvider;
use crate::repository::cache::LocalCache;
use crate::repository::character::CharacterRepository;
use crate::sync::{PersistenceSync, Scheduler};

/// Where the session's initial state came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapSource {
    /// The competence block stored on the character record.
    Remote,
    /// The local cache, either because the remote record had no block or
    /// because the cache holds edits the server never accepted. Queued for
    /// upload.
    Cache,
    /// Default budgets; persisted once.
    Defaults,
}

/// Live competence sheet of one character.
pub struct AllocationSession<C, R, S> {
    character_id: CharacterId,
    is_admin: bool,
    config: EngineConfig,
    catalog: Arc<[CatalogCategory]>,
    registry: CustomSkillRegistry,
    store: AllocationStore,
    categories: Vec<Category>,
    source: BootstrapSource,
    sync: PersistenceSync<C, R, S>,
}

impl<C, R, S> AllocationSession<C, R, S>
where
    C: LocalCache,
    R: CharacterRepository,
    S: Scheduler,
{
    // -----------------------------------------------------------------------
    // Bootstrap
    // -----------------------------------------------------------------------

    /// Open the session for the identity's active character.
    ///
    /// A cache entry flagged unsynced wins, since it holds edits newer than
    /// anything the server has. Otherwise state is taken from the remote
    /// competence block when present, else from the local cache, else
    /// seeded from the default budgets. A remote block that is only partly
    /// readable is used as far as it parses and is never written back
    /// until the next edit. Without an active character the session is
    /// local-only and keyed `CharacterId::LOCAL_ONLY`.
    pub async fn open<I, P>(
        identity: &I,
        catalog: &P,
        cache: Arc<C>,
        remote: Option<Arc<R>>,
        scheduler: Arc<S>,
        config: EngineConfig,
    ) -> Result<Self, RepositoryError>
    where
        I: IdentityProvider,
        P: CatalogProvider + ?Sized,
    {
        let catalog = catalog.categories();
        let is_admin = identity.is_admin();

        let (character_id, remote, document) = match identity.active_character().await? {
            Some(character) => (character.id, remote, character.profile_data),
            None => {
                tracing::info!("no active character; running local-only");
                (CharacterId::local_only(), None, serde_json::Value::Null)
            }
        };

        let stored = CompetenceProfile::from_profile_data(&document);
        let damaged = stored.is_damaged();
        if let StoredBlock::Present { dropped, .. } = &stored {
            if *dropped > 0 {
                tracing::warn!(%character_id, dropped = *dropped, "unreadable competence entries skipped");
            }
        }
        let cached = || match cache.load(&character_id) {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(%character_id, error = %err, "failed to read local cache");
                None
            }
        };
        let unsynced = remote.is_some()
            && cache.is_unsynced(&character_id).unwrap_or_else(|err| {
                tracing::warn!(%character_id, error = %err, "failed to read unsynced flag");
                false
            });

        let replay = if unsynced { cached() } else { None };
        let (profile, source) = match (replay, stored) {
            (Some(profile), _) => {
                tracing::info!(%character_id, "replaying local edits the server has not accepted");
                (Some(profile), BootstrapSource::Cache)
            }
            (None, StoredBlock::Present { profile, .. }) => (Some(profile), BootstrapSource::Remote),
            (None, StoredBlock::Absent) => match cached() {
                Some(profile) => (Some(profile), BootstrapSource::Cache),
                None => (None, BootstrapSource::Defaults),
            },
        };

        let default_cap = config.allocation.effective_default_cap();
        let (registry, mut store) = match &profile {
            Some(profile) => (
                CustomSkillRegistry::from_profile(profile, default_cap),
                AllocationStore::from_profile(profile),
            ),
            None => (
                CustomSkillRegistry::new(default_cap),
                AllocationStore::seeded(&catalog, &config.allocation),
            ),
        };

        let mut added = false;
        for category in catalog.iter() {
            added |= store.ensure_category(
                &category.id,
                config.allocation.default_points_for(&category.id),
            );
        }

        let sync = PersistenceSync::new(
            character_id.clone(),
            cache,
            remote,
            scheduler,
            config.sync.clone(),
            document,
        );

        let mut session = Self {
            character_id,
            is_admin,
            config,
            catalog,
            registry,
            store,
            categories: Vec::new(),
            source,
            sync,
        };
        session.rehydrate();

        let snapshot = session.profile();
        if source == BootstrapSource::Remote && (damaged || !added) {
            session.sync.prime(&snapshot);
        } else {
            session.sync.record(&snapshot);
        }

        tracing::info!(
            character_id = %session.character_id,
            source = ?source,
            admin = is_admin,
            "allocation session opened"
        );
        Ok(session)
    }

    // -----------------------------------------------------------------------
    // Player operations
    // -----------------------------------------------------------------------

    /// Move points between a category budget and a skill. Returns whether
    /// anything changed; unknown, deleted or maxed skills and locked or
    /// empty categories are silent no-ops.
    pub fn adjust_skill_points(&mut self, category: &str, skill: &str, delta: i64) -> bool {
        let Some(name) = self.visible_skill_name(category, skill) else {
            return false;
        };
        let cap = self.registry.skill_cap(&self.catalog, category, &name);
        if !self.store.adjust(category, &name, delta, cap) {
            return false;
        }
        self.commit();
        true
    }

    /// Commit the category's pending points and flush immediately.
    pub fn confirm_category(&mut self, category: &str) -> bool {
        if self.category(category).is_none() {
            return false;
        }
        let (catalog, registry) = (&self.catalog, &self.registry);
        let confirmed = self
            .store
            .confirm(category, |skill| registry.skill_cap(catalog, category, skill));
        if confirmed {
            self.commit();
            self.sync.flush_now();
        }
        confirmed
    }

    // -----------------------------------------------------------------------
    // Admin operations
    // -----------------------------------------------------------------------

    pub fn add_custom_skill(
        &mut self,
        category: &str,
        request: NewSkill,
    ) -> Result<CustomSkill, AdminEditError> {
        let skill = self.editor()?.add_custom_skill(category, request)?;
        self.commit();
        Ok(skill)
    }

    pub fn apply_skill_admin_edits(
        &mut self,
        category: &str,
        skill: &str,
        draft: SkillDraft,
    ) -> Result<EditOutcome, AdminEditError> {
        let outcome = self.editor()?.apply_skill_admin_edits(category, skill, draft)?;
        self.commit();
        Ok(outcome)
    }

    /// Returns the points refunded to the category budget.
    pub fn delete_skill(&mut self, category: &str, skill: &str) -> Result<u32, AdminEditError> {
        let refund = self.editor()?.delete_skill(category, skill)?;
        self.commit();
        Ok(refund)
    }

    pub fn restore_skill(&mut self, category: &str, skill: &str) -> Result<(), AdminEditError> {
        self.editor()?.restore_skill(category, skill)?;
        self.commit();
        Ok(())
    }

    /// Returns the restored budget.
    pub fn reset_category(&mut self, category: &str) -> Result<u32, AdminEditError> {
        let budget = self.editor()?.reset_category(category)?;
        self.commit();
        Ok(budget)
    }

    /// Returns the stored (clamped) budget.
    pub fn set_category_budget(&mut self, category: &str, value: i64) -> Result<u32, AdminEditError> {
        let budget = self.editor()?.set_category_budget(category, value)?;
        self.commit();
        Ok(budget)
    }

    fn editor(&mut self) -> Result<AdminEditor<'_>, AdminEditError> {
        if !self.is_admin {
            return Err(AdminEditError::NotAuthorized);
        }
        Ok(AdminEditor::new(
            &self.catalog,
            &mut self.registry,
            &mut self.store,
            &self.config.allocation,
        ))
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn character_id(&self) -> &CharacterId {
        &self.character_id
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn bootstrap_source(&self) -> BootstrapSource {
        self.source
    }

    /// Hydrated categories, tombstoned skills included (flagged).
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn budget(&self, category: &str) -> u32 {
        self.store.budget(category)
    }

    pub fn pending(&self, category: &str, skill: &str) -> u32 {
        self.store.pending(category, &self.canonical_name(category, skill))
    }

    pub fn base_value(&self, category: &str, skill: &str) -> u32 {
        self.store.base_value(category, &self.canonical_name(category, skill))
    }

    /// Committed base plus pending points.
    pub fn skill_total(&self, category: &str, skill: &str) -> u32 {
        self.store.skill_total(category, &self.canonical_name(category, skill))
    }

    pub fn pending_total(&self, category: &str) -> u32 {
        self.store.pending_total(category)
    }

    pub fn is_locked(&self, category: &str) -> bool {
        self.store.is_locked(category)
    }

    /// Effective cap; always positive.
    pub fn skill_cap(&self, category: &str, skill: &str) -> u32 {
        self.registry.skill_cap(&self.catalog, category, skill)
    }

    /// The full persisted snapshot.
    pub fn profile(&self) -> CompetenceProfile {
        let mut profile = CompetenceProfile {
            version: PROFILE_VERSION,
            ..CompetenceProfile::default()
        };
        self.store.write_into(&mut profile);
        self.registry.write_into(&mut profile);
        profile
    }

    /// Per-skill bonus totals from equipment, consumables and companion.
    /// Derived on demand; never persisted.
    pub fn bonus_breakdown_by_skill<E, M>(
        &self,
        equipment: &E,
        resolver: &M,
        companion: &[CompanionBonus],
    ) -> BonusBreakdown
    where
        E: EquipmentSource + ?Sized,
        M: ModifierResolver + ?Sized,
    {
        let snapshot = equipment.snapshot(&self.character_id);
        BonusAggregator::new(&self.categories, &self.config.bonus.aliases).breakdown(
            snapshot.as_ref(),
            resolver,
            companion,
        )
    }

    // -----------------------------------------------------------------------
    // Sync controls
    // -----------------------------------------------------------------------

    pub fn status(&self) -> SyncStatus {
        self.sync.status()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.sync.subscribe()
    }

    pub async fn flush(&self) -> FlushOutcome {
        self.sync.flush().await
    }

    /// Page is going away: start a flush and do not wait for it.
    pub fn unload(&self) {
        self.sync.flush_now();
    }

    pub async fn on_online(&self) -> FlushOutcome {
        self.sync.on_online().await
    }

    /// End the session (character switch): awaits one final flush attempt.
    pub async fn close(self) -> FlushOutcome {
        let outcome = self.sync.close().await;
        tracing::info!(character_id = %self.character_id, ?outcome, "allocation session closed");
        outcome
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn rehydrate(&mut self) {
        let store = &self.store;
        self.categories = self
            .registry
            .hydrate(&self.catalog, |category, skill| store.base_value(category, skill));
    }

    fn commit(&mut self) {
        self.rehydrate();
        self.sync.record(&self.profile());
    }

    fn visible_skill_name(&self, category: &str, skill: &str) -> Option<String> {
        self.category(category)?
            .find_skill(skill)
            .filter(|s| s.is_visible())
            .map(|s| s.name.clone())
    }

    fn canonical_name(&self, category: &str, skill: &str) -> String {
        self.category(category)
            .and_then(|c| c.find_skill(skill))
            .map_or_else(|| skill.to_string(), |s| s.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::TokioScheduler;
    use competence_types::bonus::{EquipmentSnapshot, ItemDefinition, ItemRef, Modifier, ModifierKind};
    use competence_types::catalog::CatalogSkill;
    use competence_types::character::Character;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    // -- mocks ---------------------------------------------------------------

    struct FakeIdentity {
        character: Option<Character>,
        admin: bool,
    }

    impl IdentityProvider for FakeIdentity {
        async fn active_character(&self) -> Result<Option<Character>, RepositoryError> {
            Ok(self.character.clone())
        }

        fn is_admin(&self) -> bool {
            self.admin
        }
    }

    #[derive(Default)]
    struct MemCache {
        entries: Mutex<HashMap<CharacterId, CompetenceProfile>>,
        unsynced: Mutex<HashSet<CharacterId>>,
    }

    impl LocalCache for MemCache {
        fn load(&self, id: &CharacterId) -> Result<Option<CompetenceProfile>, RepositoryError> {
            Ok(self.entries.lock().unwrap().get(id).cloned())
        }

        fn store(&self, id: &CharacterId, profile: &CompetenceProfile) -> Result<(), RepositoryError> {
            self.entries.lock().unwrap().insert(id.clone(), profile.clone());
            Ok(())
        }

        fn remove(&self, id: &CharacterId) -> Result<(), RepositoryError> {
            self.entries.lock().unwrap().remove(id);
            self.unsynced.lock().unwrap().remove(id);
            Ok(())
        }

        fn set_unsynced(&self, id: &CharacterId, unsynced: bool) -> Result<(), RepositoryError> {
            let mut set = self.unsynced.lock().unwrap();
            if unsynced {
                set.insert(id.clone());
            } else {
                set.remove(id);
            }
            Ok(())
        }

        fn is_unsynced(&self, id: &CharacterId) -> Result<bool, RepositoryError> {
            Ok(self.unsynced.lock().unwrap().contains(id))
        }
    }

    #[derive(Default)]
    struct FakeRemote {
        writes: Mutex<Vec<serde_json::Value>>,
        offline: AtomicBool,
    }

    impl FakeRemote {
        fn writes(&self) -> usize {
            self.writes.lock().unwrap().len()
        }

        fn last_write(&self) -> serde_json::Value {
            self.writes.lock().unwrap().last().cloned().unwrap()
        }

        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }
    }

    impl CharacterRepository for FakeRemote {
        async fn fetch_character(&self, _id: &CharacterId) -> Result<Option<Character>, RepositoryError> {
            Ok(None)
        }

        async fn update_character(
            &self,
            _id: &CharacterId,
            profile_data: serde_json::Value,
        ) -> Result<(), RepositoryError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(RepositoryError::Transport("offline".to_string()));
            }
            self.writes.lock().unwrap().push(profile_data);
            Ok(())
        }
    }

    struct NoEquipment;

    impl EquipmentSource for NoEquipment {
        fn snapshot(&self, _character: &CharacterId) -> Option<EquipmentSnapshot> {
            None
        }
    }

    struct Gauntlets;

    impl EquipmentSource for Gauntlets {
        fn snapshot(&self, _character: &CharacterId) -> Option<EquipmentSnapshot> {
            Some(EquipmentSnapshot {
                equipped_slots: vec![ItemRef::Index(0)],
                active_consumable_effects: vec![],
            })
        }
    }

    impl ModifierResolver for Gauntlets {
        fn resolve(&self, _item: &ItemRef) -> Option<ItemDefinition> {
            Some(ItemDefinition {
                name: "Gantelets".to_string(),
                modifiers: vec![Modifier {
                    stat: "Force".to_string(),
                    value: 3,
                    kind: ModifierKind::Flat,
                }],
            })
        }
    }

    type TestSession = AllocationSession<MemCache, FakeRemote, TokioScheduler>;

    struct Harness {
        cache: Arc<MemCache>,
        remote: Arc<FakeRemote>,
    }

    fn catalog() -> Arc<[CatalogCategory]> {
        let skill = |name: &str| CatalogSkill {
            name: name.to_string(),
            icon: String::new(),
            cap: None,
        };
        Arc::from(vec![
            CatalogCategory {
                id: "combat".to_string(),
                label: "Combat".to_string(),
                icon: String::new(),
                skills: vec![skill("Force"), skill("Esquive")],
            },
            CatalogCategory {
                id: "artisanat".to_string(),
                label: "Artisanat".to_string(),
                icon: String::new(),
                skills: vec![skill("Forge")],
            },
        ])
    }

    fn hero(profile_data: serde_json::Value) -> Character {
        Character {
            id: CharacterId::new("hero"),
            name: "Hero".to_string(),
            profile_data,
            updated_at: None,
        }
    }

    impl Harness {
        fn new() -> Self {
            Self {
                cache: Arc::new(MemCache::default()),
                remote: Arc::new(FakeRemote::default()),
            }
        }

        async fn open(&self, character: Option<Character>, admin: bool) -> TestSession {
            let identity = FakeIdentity { character, admin };
            AllocationSession::open(
                &identity,
                &catalog(),
                Arc::clone(&self.cache),
                Some(Arc::clone(&self.remote)),
                Arc::new(TokioScheduler),
                EngineConfig::default(),
            )
            .await
            .unwrap()
        }
    }

    // -- tests ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn test_allocation_clamps_to_budget() {
        let h = Harness::new();
        let mut session = h.open(Some(hero(json!({}))), false).await;
        assert_eq!(session.budget("combat"), 25);

        assert!(session.adjust_skill_points("combat", "Force", 10));
        assert_eq!(session.pending("combat", "Force"), 10);
        assert_eq!(session.budget("combat"), 15);

        assert!(session.adjust_skill_points("combat", "force", 20));
        assert_eq!(session.pending("combat", "Force"), 25);
        assert_eq!(session.budget("combat"), 0);

        assert!(!session.adjust_skill_points("combat", "Esquive", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_commits_locks_and_flushes_immediately() {
        let h = Harness::new();
        let mut session = h.open(Some(hero(json!({}))), false).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        let writes_before = h.remote.writes();

        session.adjust_skill_points("combat", "Force", 25);
        assert!(session.confirm_category("combat"));
        assert_eq!(session.base_value("combat", "Force"), 25);
        assert_eq!(session.pending("combat", "Force"), 0);
        assert!(session.is_locked("combat"));
        assert!(!session.adjust_skill_points("combat", "Force", -1));

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(h.remote.writes(), writes_before + 1);
        assert!(!session.status().dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defaults_are_persisted_once() {
        let h = Harness::new();
        let session = h.open(Some(hero(json!({"theme": "dark"}))), false).await;
        assert_eq!(session.bootstrap_source(), BootstrapSource::Defaults);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.remote.writes(), 1);
        let body = h.remote.writes.lock().unwrap()[0].clone();
        assert_eq!(body["theme"], json!("dark"));
        assert_eq!(body["competences"]["pointsByCategory"]["artisanat"], json!(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_block_wins_and_is_not_rewritten() {
        let h = Harness::new();
        let mut cached = CompetenceProfile::default();
        cached.points_by_category.insert("combat".to_string(), 3);
        h.cache.store(&CharacterId::new("hero"), &cached).unwrap();

        let data = json!({"competences": {
            "version": 1,
            "pointsByCategory": {"combat": 7, "artisanat": 2}
        }});
        let session = h.open(Some(hero(data)), false).await;
        assert_eq!(session.bootstrap_source(), BootstrapSource::Remote);
        assert_eq!(session.budget("combat"), 7);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.remote.writes(), 0);
        assert_eq!(
            h.cache.load(&CharacterId::new("hero")).unwrap().unwrap().points_by_category["combat"],
            7
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_is_used_when_remote_has_no_block() {
        let h = Harness::new();
        let mut cached = CompetenceProfile::default();
        cached.points_by_category.insert("combat".to_string(), 4);
        h.cache.store(&CharacterId::new("hero"), &cached).unwrap();

        let session = h.open(Some(hero(json!({}))), false).await;
        assert_eq!(session.bootstrap_source(), BootstrapSource::Cache);
        assert_eq!(session.budget("combat"), 4);
        // missing category seeded from defaults
        assert_eq!(session.budget("artisanat"), 15);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.remote.writes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_round_trips_through_cache() {
        let h = Harness::new();
        let mut session = h.open(None, true).await;
        session.adjust_skill_points("combat", "Force", 6);
        session
            .add_custom_skill(
                "artisanat",
                NewSkill {
                    name: "Brico".to_string(),
                    icon: None,
                    cap: Some(10),
                },
            )
            .unwrap();
        let before = session.profile();
        assert_eq!(session.close().await, FlushOutcome::LocalOnly);

        let reopened = h.open(None, true).await;
        assert_eq!(reopened.bootstrap_source(), BootstrapSource::Cache);
        assert_eq!(reopened.profile(), before);
        assert_eq!(reopened.pending("combat", "Force"), 6);
        assert!(reopened.category("artisanat").unwrap().find_skill("brico").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_only_never_touches_remote() {
        let h = Harness::new();
        let mut session = h.open(None, false).await;
        assert_eq!(session.character_id().as_str(), CharacterId::LOCAL_ONLY);
        assert!(session.status().local_only);

        session.adjust_skill_points("combat", "Force", 2);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.remote.writes(), 0);
        assert!(h.cache.load(&CharacterId::local_only()).unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_admin_operations_require_rights() {
        let h = Harness::new();
        let mut session = h.open(Some(hero(json!({}))), false).await;
        let before = session.profile();

        assert_eq!(
            session.set_category_budget("combat", 50),
            Err(AdminEditError::NotAuthorized)
        );
        assert_eq!(session.reset_category("combat"), Err(AdminEditError::NotAuthorized));
        assert_eq!(
            session.delete_skill("combat", "Force"),
            Err(AdminEditError::NotAuthorized)
        );
        assert_eq!(session.profile(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_renamed_custom_skill_leaves_no_residue() {
        let h = Harness::new();
        let mut session = h.open(Some(hero(json!({}))), true).await;
        session
            .add_custom_skill(
                "artisanat",
                NewSkill {
                    name: "Brico".to_string(),
                    icon: None,
                    cap: None,
                },
            )
            .unwrap();
        session.adjust_skill_points("artisanat", "Brico", 3);

        let outcome = session
            .apply_skill_admin_edits(
                "artisanat",
                "Brico",
                SkillDraft {
                    name: "Bricolage".to_string(),
                    base_value: 2,
                    cap: 40,
                    icon: None,
                },
            )
            .unwrap();
        assert!(outcome.renamed);

        let profile = session.profile();
        assert_eq!(profile.allocations_by_category["artisanat"].get("Bricolage"), Some(&3));
        assert_eq!(profile.base_values_by_category["artisanat"].get("Bricolage"), Some(&2));
        assert!(!profile.allocations_by_category["artisanat"].contains_key("Brico"));
        assert!(!profile.base_values_by_category["artisanat"].contains_key("Brico"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deleted_skill_refunds_and_rejects_allocation() {
        let h = Harness::new();
        let mut session = h.open(Some(hero(json!({}))), true).await;
        session.adjust_skill_points("combat", "Esquive", 5);

        assert_eq!(session.delete_skill("combat", "Esquive"), Ok(5));
        assert_eq!(session.budget("combat"), 25);
        assert!(!session.adjust_skill_points("combat", "Esquive", 1));
        assert!(session.category("combat").unwrap().find_skill("Esquive").unwrap().is_tombstoned());

        session.restore_skill("combat", "esquive").unwrap();
        assert!(session.adjust_skill_points("combat", "Esquive", 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_every_point() {
        let h = Harness::new();
        let mut session = h.open(Some(hero(json!({}))), true).await;
        session.adjust_skill_points("combat", "Force", 25);
        session.confirm_category("combat");
        assert!(session.is_locked("combat"));

        assert_eq!(session.reset_category("combat"), Ok(25));
        assert!(!session.is_locked("combat"));
        assert_eq!(session.base_value("combat", "Force"), 0);
        assert_eq!(session.set_category_budget("combat", 120), Ok(99));
    }

    #[tokio::test(start_paused = true)]
    async fn test_bonus_breakdown_uses_hydrated_skills() {
        let h = Harness::new();
        let session = h.open(Some(hero(json!({}))), false).await;
        let companion = vec![CompanionBonus {
            name: "Force".to_string(),
            points: 2,
            source: String::new(),
        }];

        let breakdown = session.bonus_breakdown_by_skill(&Gauntlets, &Gauntlets, &companion);
        assert_eq!(breakdown["Force"].items, 3);
        assert_eq!(breakdown["Force"].companion, 2);
        assert_eq!(breakdown["Force"].total, 5);

        let breakdown = session.bonus_breakdown_by_skill(&NoEquipment, &Gauntlets, &[]);
        assert!(breakdown.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_left_unsynced_survive_reopen() {
        let h = Harness::new();
        h.remote.set_offline(true);
        let mut session = h.open(Some(hero(json!({"theme": "dark"}))), false).await;
        assert!(session.adjust_skill_points("combat", "Force", 10));
        assert!(session.close().await.is_failure());
        assert!(h.cache.is_unsynced(&CharacterId::new("hero")).unwrap());

        // the server still holds an older block
        h.remote.set_offline(false);
        let stale = json!({"theme": "dark", "competences": {
            "version": 1,
            "pointsByCategory": {"combat": 25, "artisanat": 15}
        }});
        let session = h.open(Some(hero(stale)), false).await;
        assert_eq!(session.bootstrap_source(), BootstrapSource::Cache);
        assert_eq!(session.pending("combat", "Force"), 10);
        assert_eq!(session.budget("combat"), 15);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.remote.writes(), 1);
        let body = h.remote.last_write();
        assert_eq!(body["theme"], json!("dark"));
        assert_eq!(body["competences"]["allocationsByCategory"]["combat"]["Force"], json!(10));
        assert!(!h.cache.is_unsynced(&CharacterId::new("hero")).unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_synced_cache_does_not_override_remote() {
        let h = Harness::new();
        let mut session = h.open(Some(hero(json!({}))), false).await;
        session.adjust_skill_points("combat", "Force", 4);
        assert_eq!(session.close().await, FlushOutcome::Synced);
        assert!(!h.cache.is_unsynced(&CharacterId::new("hero")).unwrap());

        let newer = json!({"competences": {"pointsByCategory": {"combat": 9, "artisanat": 15}}});
        let session = h.open(Some(hero(newer)), false).await;
        assert_eq!(session.bootstrap_source(), BootstrapSource::Remote);
        assert_eq!(session.budget("combat"), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_damaged_remote_block_is_kept_and_not_rewritten() {
        let h = Harness::new();
        let data = json!({"competences": {
            "version": 1,
            "pointsByCategory": {"combat": 3, "artisanat": 15},
            "baseValuesByCategory": {"combat": {"Force": 22}},
            "allocationsByCategory": {"combat": {"Force": -1}}
        }});
        let session = h.open(Some(hero(data)), false).await;
        assert_eq!(session.bootstrap_source(), BootstrapSource::Remote);
        assert_eq!(session.base_value("combat", "Force"), 22);
        assert_eq!(session.pending("combat", "Force"), 0);
        assert_eq!(session.budget("combat"), 3);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.remote.writes(), 0);
        assert!(!session.status().dirty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_remote_block_is_not_replaced_by_defaults() {
        let h = Harness::new();
        let session = h.open(Some(hero(json!({"competences": "garbage"}))), false).await;
        assert_eq!(session.bootstrap_source(), BootstrapSource::Remote);
        assert_eq!(session.budget("combat"), 25);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(h.remote.writes(), 0);
    }
}
