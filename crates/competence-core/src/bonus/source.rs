//! Bonus source ports and the per-character companion bonus cache.

use dashmap::DashMap;

use competence_types::bonus::{CompanionBonus, EquipmentSnapshot, ItemDefinition, ItemRef};
use competence_types::character::CharacterId;
use competence_types::error::RepositoryError;

/// Resolves an item reference against the item catalog.
pub trait ModifierResolver: Send + Sync {
    /// The item definition for `item`, or `None` when it does not resolve.
    fn resolve(&self, item: &ItemRef) -> Option<ItemDefinition>;
}

/// Provides the current equipment/inventory snapshot of a character.
pub trait EquipmentSource: Send + Sync {
    /// `None` when the inventory subsystem has nothing (or nothing usable)
    /// for this character.
    fn snapshot(&self, character: &CharacterId) -> Option<EquipmentSnapshot>;
}

/// Provides the companion's bonus list for a character.
pub trait CompanionBonusSource: Send + Sync {
    fn fetch_bonuses(
        &self,
        character: &CharacterId,
    ) -> impl std::future::Future<Output = Result<Vec<CompanionBonus>, RepositoryError>> + Send;
}

/// Companion bonuses cached per character.
///
/// Reads never wait on the source: `bonuses` returns whatever was cached
/// (possibly nothing). `refresh` repopulates an entry and is meant to be
/// called on load and whenever the companion subsystem signals a change.
pub struct CompanionBonusCache<S: CompanionBonusSource> {
    source: S,
    entries: DashMap<CharacterId, Vec<CompanionBonus>>,
}

impl<S: CompanionBonusSource> CompanionBonusCache<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            entries: DashMap::new(),
        }
    }

    /// Cached bonuses for a character; empty when never refreshed.
    pub fn bonuses(&self, character: &CharacterId) -> Vec<CompanionBonus> {
        self.entries
            .get(character)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Re-fetch a character's bonuses. On failure the previous entry is
    /// kept and the error is logged.
    pub async fn refresh(&self, character: &CharacterId) -> usize {
        match self.source.fetch_bonuses(character).await {
            Ok(bonuses) => {
                let count = bonuses.len();
                self.entries.insert(character.clone(), bonuses);
                tracing::debug!(%character, count, "companion bonuses refreshed");
                count
            }
            Err(err) => {
                tracing::warn!(%character, error = %err, "failed to refresh companion bonuses");
                self.entries.get(character).map(|e| e.len()).unwrap_or(0)
            }
        }
    }

    /// Drop a character's entry (generic change notification).
    pub fn invalidate(&self, character: &CharacterId) {
        self.entries.remove(character);
    }
}
