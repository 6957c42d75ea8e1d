//! In-memory local cache for tests and throwaway local-only runs.

use dashmap::{DashMap, DashSet};

use competence_core::repository::cache::LocalCache;
use competence_types::character::CharacterId;
use competence_types::error::RepositoryError;
use competence_types::profile::CompetenceProfile;

#[derive(Debug, Default)]
pub struct MemoryLocalCache {
    entries: DashMap<CharacterId, CompetenceProfile>,
    unsynced: DashSet<CharacterId>,
}

impl MemoryLocalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl LocalCache for MemoryLocalCache {
    fn load(&self, id: &CharacterId) -> Result<Option<CompetenceProfile>, RepositoryError> {
        Ok(self.entries.get(id).map(|entry| entry.value().clone()))
    }

    fn store(&self, id: &CharacterId, profile: &CompetenceProfile) -> Result<(), RepositoryError> {
        self.entries.insert(id.clone(), profile.clone());
        Ok(())
    }

    fn remove(&self, id: &CharacterId) -> Result<(), RepositoryError> {
        self.entries.remove(id);
        self.unsynced.remove(id);
        Ok(())
    }

    fn set_unsynced(&self, id: &CharacterId, unsynced: bool) -> Result<(), RepositoryError> {
        if unsynced {
            self.unsynced.insert(id.clone());
        } else {
            self.unsynced.remove(id);
        }
        Ok(())
    }

    fn is_unsynced(&self, id: &CharacterId) -> Result<bool, RepositoryError> {
        Ok(self.unsynced.contains(id))
    }
}
