//! Local cache trait.
//!
//! The local cache is the source of truth for reads. Writes to it are
//! synchronous so a mutation is durable locally before any network I/O is
//! scheduled.

use competence_types::character::CharacterId;
use competence_types::error::RepositoryError;
use competence_types::profile::CompetenceProfile;

/// Character-scoped snapshot storage.
///
/// Keyed by character id, so two characters never share an entry.
pub trait LocalCache: Send + Sync + 'static {
    /// Load the cached snapshot for a character, if any.
    fn load(&self, id: &CharacterId) -> Result<Option<CompetenceProfile>, RepositoryError>;

    /// Replace the cached snapshot for a character.
    fn store(&self, id: &CharacterId, profile: &CompetenceProfile) -> Result<(), RepositoryError>;

    /// Drop the cached snapshot and its unsynced flag. No-op when absent.
    fn remove(&self, id: &CharacterId) -> Result<(), RepositoryError>;

    /// Flag whether the cached snapshot holds edits the remote store has
    /// not accepted yet. Survives restarts, so the next session can replay
    /// them instead of taking the older remote block.
    fn set_unsynced(&self, id: &CharacterId, unsynced: bool) -> Result<(), RepositoryError>;

    fn is_unsynced(&self, id: &CharacterId) -> Result<bool, RepositoryError>;
}
