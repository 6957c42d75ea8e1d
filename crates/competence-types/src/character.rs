use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;

/// Identifier of a character record on the remote store.
///
/// Opaque to the engine: remote stores hand out their own identifiers, so
/// this wraps a string rather than a UUID. Locally created characters get a
/// UUID v7 rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CharacterId(pub String);

impl CharacterId {
    /// Cache key used when no character is active (local-only mode).
    pub const LOCAL_ONLY: &'static str = "local";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a new identifier (UUID v7, time-sortable).
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// The identifier used to key the local cache in local-only mode.
    pub fn local_only() -> Self {
        Self(Self::LOCAL_ONLY.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A character record as held by the identity/session subsystem.
///
/// `profile_data` is a free-form JSON document; the engine only owns its
/// `competences` key and leaves every other key untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub profile_data: serde_json::Value,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Character {
    /// Create a fresh character with an empty profile.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: CharacterId::generate(),
            name: name.into(),
            profile_data: serde_json::Value::Object(serde_json::Map::new()),
            updated_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_id_display_and_serde() {
        let id = CharacterId::new("char-42");
        assert_eq!(id.to_string(), "char-42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"char-42\"");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(CharacterId::generate(), CharacterId::generate());
    }

    #[test]
    fn test_character_deserialize_without_profile() {
        let c: Character = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(c.id.as_str(), "abc");
        assert!(c.profile_data.is_null());
        assert!(c.name.is_empty());
    }
}
