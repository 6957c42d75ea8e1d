//! SQLite character repository.
//!
//! Implements `CharacterRepository` from `competence-core`. `profile_data`
//! is stored as JSON text and parsed on read.

use chrono::{DateTime, Utc};
use sqlx::Row;

use competence_core::repository::character::CharacterRepository;
use competence_types::character::{Character, CharacterId};
use competence_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `CharacterRepository`.
pub struct SqliteCharacterRepository {
    pool: DatabasePool,
}

impl SqliteCharacterRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert a new character record.
    pub async fn create_character(&self, character: &Character) -> Result<(), RepositoryError> {
        let now = format_datetime(&character.updated_at.unwrap_or_else(Utc::now));
        let profile_data = serde_json::to_string(&character.profile_data)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO characters (id, name, profile_data, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(character.id.as_str())
        .bind(&character.name)
        .bind(&profile_data)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("character '{}' already exists", character.id))
            }
            other => RepositoryError::Query(other.to_string()),
        })?;

        tracing::debug!(character_id = %character.id, name = %character.name, "character created");
        Ok(())
    }

    /// All characters, most recently updated first.
    pub async fn list_characters(&self) -> Result<Vec<Character>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, name, profile_data, updated_at FROM characters ORDER BY updated_at DESC, name",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| {
                CharacterRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_character()
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct CharacterRow {
    id: String,
    name: String,
    profile_data: String,
    updated_at: String,
}

impl CharacterRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            profile_data: row.try_get("profile_data")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_character(self) -> Result<Character, RepositoryError> {
        let profile_data: serde_json::Value = serde_json::from_str(&self.profile_data)
            .map_err(|e| RepositoryError::Query(format!("invalid profile_data: {e}")))?;
        Ok(Character {
            id: CharacterId::new(self.id),
            name: self.name,
            profile_data,
            updated_at: Some(parse_datetime(&self.updated_at)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// CharacterRepository implementation
// ---------------------------------------------------------------------------

impl CharacterRepository for SqliteCharacterRepository {
    async fn fetch_character(&self, id: &CharacterId) -> Result<Option<Character>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, profile_data, updated_at FROM characters WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let row = CharacterRow::from_row(&row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(row.into_character()?))
            }
            None => Ok(None),
        }
    }

    async fn update_character(
        &self,
        id: &CharacterId,
        profile_data: serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());
        let json = serde_json::to_string(&profile_data)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        let result = sqlx::query("UPDATE characters SET profile_data = ?, updated_at = ? WHERE id = ?")
            .bind(&json)
            .bind(&now)
            .bind(id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        tracing::debug!(character_id = %id, "profile_data updated");
        Ok(())
    }
}
