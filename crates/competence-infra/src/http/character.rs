//! `CharacterRepository` over a REST character API.
//!
//! - `GET   {base_url}/characters/{id}` returns the character record.
//! - `PATCH {base_url}/characters/{id}` with `{"profile_data": ...}` replaces
//!   the profile document.

use std::time::Duration;

use reqwest::StatusCode;

use competence_core::repository::character::CharacterRepository;
use competence_types::character::{Character, CharacterId};
use competence_types::error::RepositoryError;

/// Remote character store reached over HTTP.
pub struct HttpCharacterRepository {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCharacterRepository {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RepositoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RepositoryError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn character_url(&self, id: &CharacterId) -> String {
        format!("{}/characters/{}", self.base_url, id)
    }
}

/// Map a non-success status to a repository error.
fn status_error(status: StatusCode, body: &str) -> RepositoryError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RepositoryError::Unauthorized,
        StatusCode::NOT_FOUND => RepositoryError::NotFound,
        StatusCode::CONFLICT => RepositoryError::Conflict(body.to_string()),
        _ => RepositoryError::Transport(format!("HTTP {status}: {body}")),
    }
}

fn transport_error(err: reqwest::Error) -> RepositoryError {
    RepositoryError::Transport(err.to_string())
}

impl CharacterRepository for HttpCharacterRepository {
    async fn fetch_character(&self, id: &CharacterId) -> Result<Option<Character>, RepositoryError> {
        let response = self
            .client
            .get(self.character_url(id))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<Character>()
            .await
            .map(Some)
            .map_err(|e| RepositoryError::Serialization(format!("invalid character payload: {e}")))
    }

    async fn update_character(
        &self,
        id: &CharacterId,
        profile_data: serde_json::Value,
    ) -> Result<(), RepositoryError> {
        let response = self
            .client
            .patch(self.character_url(id))
            .json(&serde_json::json!({ "profile_data": profile_data }))
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(character_id = %id, %status, "remote rejected update");
            return Err(status_error(status, &body));
        }
        Ok(())
    }
}
