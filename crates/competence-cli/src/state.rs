//! Application state wiring the infra adapters together.
//!
//! AppState holds the concrete adapters used by every command. The session
//! is generic over cache/repository/scheduler traits; AppState pins them to
//! the concrete infra implementations.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use competence_core::repository::character::CharacterRepository;
use competence_core::session::AllocationSession;
use competence_core::sync::TokioScheduler;
use competence_infra::cache::FileLocalCache;
use competence_infra::catalog::StaticCatalog;
use competence_infra::config::load_engine_config;
use competence_infra::filesystem::{
    cache_dir, read_active_character, resolve_data_dir, write_active_character,
};
use competence_infra::http::HttpCharacterRepository;
use competence_infra::identity::LocalIdentity;
use competence_infra::sqlite::pool::database_url;
use competence_infra::sqlite::{DatabasePool, SqliteCharacterRepository};
use competence_types::character::{Character, CharacterId};
use competence_types::config::EngineConfig;
use competence_types::error::RepositoryError;

/// Session type pinned to the infra adapters.
pub type Session = AllocationSession<FileLocalCache, CharacterStore, TokioScheduler>;

/// Character store selected by configuration: the local SQLite database,
/// or a remote HTTP API when `remote.base_url` is set.
pub enum CharacterStore {
    Sqlite(SqliteCharacterRepository),
    Http(HttpCharacterRepository),
}

impl CharacterRepository for CharacterStore {
    async fn fetch_character(&self, id: &CharacterId) -> Result<Option<Character>, RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.fetch_character(id).await,
            Self::Http(repo) => repo.fetch_character(id).await,
        }
    }

    async fn update_character(
        &self,
        id: &CharacterId,
        profile_data: serde_json::Value,
    ) -> Result<(), RepositoryError> {
        match self {
            Self::Sqlite(repo) => repo.update_character(id, profile_data).await,
            Self::Http(repo) => repo.update_character(id, profile_data).await,
        }
    }
}

/// Paths of the JSON files exported by the inventory and companion
/// subsystems.
#[derive(Debug, Clone)]
pub struct BonusFiles {
    pub equipment: PathBuf,
    pub items: PathBuf,
    pub companion: PathBuf,
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub data_dir: PathBuf,
    pub config: EngineConfig,
    pub repository: Arc<CharacterStore>,
    pub cache: Arc<FileLocalCache>,
    pub catalog: StaticCatalog,
    scheduler: Arc<TokioScheduler>,
}

impl AppState {
    /// Initialize the application state in the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        Self::init_at(resolve_data_dir()).await
    }

    pub async fn init_at(data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_engine_config(&data_dir).await;
        let catalog = StaticCatalog::load_or_builtin(&data_dir).await?;

        let repository = match &config.remote.base_url {
            Some(base_url) => {
                tracing::debug!(%base_url, "using remote character store");
                let timeout = Duration::from_secs(config.remote.timeout_secs);
                CharacterStore::Http(HttpCharacterRepository::new(base_url, timeout)?)
            }
            None => {
                let pool = DatabasePool::new(&database_url(&data_dir)).await?;
                CharacterStore::Sqlite(SqliteCharacterRepository::new(pool))
            }
        };

        Ok(Self {
            cache: Arc::new(FileLocalCache::new(cache_dir(&data_dir))),
            repository: Arc::new(repository),
            scheduler: Arc::new(TokioScheduler),
            catalog,
            config,
            data_dir,
        })
    }

    /// The character selected with `--character`, else the one remembered
    /// by the last `init`.
    pub fn active_character(&self, flag: Option<&str>) -> Option<CharacterId> {
        flag.map(CharacterId::new)
            .or_else(|| read_active_character(&self.data_dir))
    }

    /// Create a character in the local store and make it the active one.
    pub async fn create_character(&self, name: &str) -> anyhow::Result<Character> {
        let CharacterStore::Sqlite(repo) = self.repository.as_ref() else {
            anyhow::bail!(
                "characters cannot be created through the remote API; pass --character instead"
            );
        };
        let character = Character::new(name.trim());
        repo.create_character(&character).await?;
        write_active_character(&self.data_dir, &character.id)?;
        tracing::info!(character_id = %character.id, name = %character.name, "character created");
        Ok(character)
    }

    /// Open the allocation session for `character`, or a local-only
    /// session when none is given.
    pub async fn open_session(
        &self,
        character: Option<&CharacterId>,
        admin: bool,
    ) -> anyhow::Result<Session> {
        let identity = LocalIdentity::resolve(self.repository.as_ref(), character, admin)
            .await
            .map_err(|err| match (err, character) {
                (RepositoryError::NotFound, Some(id)) => {
                    anyhow::anyhow!("character '{id}' not found")
                }
                (err, _) => err.into(),
            })?;

        let session = AllocationSession::open(
            &identity,
            &self.catalog,
            Arc::clone(&self.cache),
            Some(Arc::clone(&self.repository)),
            Arc::clone(&self.scheduler),
            self.config.clone(),
        )
        .await?;
        Ok(session)
    }

    /// Bonus source files, defaulting to `{data_dir}/{equipment,items,companion}.json`.
    pub fn bonus_files(
        &self,
        equipment: Option<PathBuf>,
        items: Option<PathBuf>,
        companion: Option<PathBuf>,
    ) -> BonusFiles {
        let default = |name: &str| self.data_dir.join(name);
        BonusFiles {
            equipment: equipment.unwrap_or_else(|| default("equipment.json")),
            items: items.unwrap_or_else(|| default("items.json")),
            companion: companion.unwrap_or_else(|| default("companion.json")),
        }
    }
}
