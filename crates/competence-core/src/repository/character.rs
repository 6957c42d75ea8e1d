//! Character repository trait definition.

use competence_types::character::{Character, CharacterId};
use competence_types::error::RepositoryError;

/// Remote store holding character records.
///
/// The engine reads a character once at bootstrap and afterwards only
/// writes: every write carries the full `profile_data` document.
/// Implementations live in competence-infra (SQLite and HTTP).
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait CharacterRepository: Send + Sync + 'static {
    /// Fetch a character by id. Returns `None` when it does not exist.
    fn fetch_character(
        &self,
        id: &CharacterId,
    ) -> impl std::future::Future<Output = Result<Option<Character>, RepositoryError>> + Send;

    /// Replace the character's `profile_data` document.
    fn update_character(
        &self,
        id: &CharacterId,
        profile_data: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
