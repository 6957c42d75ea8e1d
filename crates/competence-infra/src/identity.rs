//! Identity adapter for single-user local runs.

use competence_core::identity::IdentityProvider;
use competence_core::repository::character::CharacterRepository;
use competence_types::character::{Character, CharacterId};
use competence_types::error::RepositoryError;

/// The active character and admin flag as chosen on the command line.
#[derive(Debug, Clone, Default)]
pub struct LocalIdentity {
    character: Option<Character>,
    admin: bool,
}

impl LocalIdentity {
    pub fn new(character: Option<Character>, admin: bool) -> Self {
        Self { character, admin }
    }

    /// Look up `id` in the repository. An unknown id or rejected
    /// credentials are errors; no id means local-only.
    ///
    /// When the store cannot be reached the character is still selected,
    /// with its `profile_data` left null: the session then works from the
    /// local cache and the document is fetched before the first upload.
    pub async fn resolve<R: CharacterRepository>(
        repo: &R,
        id: Option<&CharacterId>,
        admin: bool,
    ) -> Result<Self, RepositoryError> {
        let Some(id) = id else {
            return Ok(Self::new(None, admin));
        };
        let character = match repo.fetch_character(id).await {
            Ok(Some(character)) => character,
            Ok(None) => return Err(RepositoryError::NotFound),
            Err(err @ (RepositoryError::NotFound | RepositoryError::Unauthorized)) => return Err(err),
            Err(err) => {
                tracing::warn!(character_id = %id, error = %err, "character store unreachable; working from local cache");
                Character {
                    id: id.clone(),
                    name: String::new(),
                    profile_data: serde_json::Value::Null,
                    updated_at: None,
                }
            }
        };
        Ok(Self::new(Some(character), admin))
    }
}

impl IdentityProvider for LocalIdentity {
    async fn active_character(&self) -> Result<Option<Character>, RepositoryError> {
        Ok(self.character.clone())
    }

    fn is_admin(&self) -> bool {
        self.admin
    }
}
