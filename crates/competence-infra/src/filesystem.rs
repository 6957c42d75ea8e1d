//! Data directory layout.
//!
//! ```text
//! {data_dir}/
//!   config.toml          engine configuration (optional)
//!   catalog.toml         skill catalog override (optional)
//!   competences.db       SQLite character store
//!   active_character     id of the character selected by `init`
//!   cache/{id}.json      local snapshots, one per character
//! ```

use std::path::{Path, PathBuf};

use competence_types::character::CharacterId;

const DATA_DIR_ENV: &str = "COMPETENCE_DATA_DIR";
const ACTIVE_CHARACTER_FILE: &str = "active_character";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `COMPETENCE_DATA_DIR` environment variable
/// 2. `~/.competences`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".competences");
    }

    // Last resort: current directory
    PathBuf::from(".competences")
}

/// Directory holding the per-character cache files.
pub fn cache_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("cache")
}

/// Id stored by the last `init`, if any.
pub fn read_active_character(data_dir: &Path) -> Option<CharacterId> {
    let content = std::fs::read_to_string(data_dir.join(ACTIVE_CHARACTER_FILE)).ok()?;
    let id = content.trim();
    (!id.is_empty()).then(|| CharacterId::new(id))
}

pub fn write_active_character(data_dir: &Path, id: &CharacterId) -> std::io::Result<()> {
    std::fs::create_dir_all(data_dir)?;
    std::fs::write(data_dir.join(ACTIVE_CHARACTER_FILE), id.as_str())
}
