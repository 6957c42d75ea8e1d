//! JSON-file local cache: one file per character under `{data_dir}/cache/`.
//!
//! Writes go to a sibling temp file which is then renamed over the target,
//! so a crash mid-write never leaves a torn snapshot behind. Snapshots with
//! edits the server has not accepted carry an empty `{id}.unsynced` marker
//! next to them.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use competence_core::repository::cache::LocalCache;
use competence_types::character::CharacterId;
use competence_types::error::RepositoryError;
use competence_types::profile::CompetenceProfile;

/// File-backed snapshot cache.
#[derive(Debug, Clone)]
pub struct FileLocalCache {
    dir: PathBuf,
}

impl FileLocalCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Cache file of a character.
    pub fn path_for(&self, id: &CharacterId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(id)))
    }

    fn marker_for(&self, id: &CharacterId) -> PathBuf {
        self.dir.join(format!("{}.unsynced", file_stem(id)))
    }
}

/// Percent-encode every byte outside `[A-Za-z0-9_-]`. `%` itself is
/// encoded, so distinct ids always get distinct file names.
fn file_stem(id: &CharacterId) -> String {
    let mut stem = String::with_capacity(id.as_str().len());
    for byte in id.as_str().bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{byte:02X}"));
        }
    }
    stem
}

fn remove_if_present(path: &Path) -> Result<(), RepositoryError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_error(err)),
    }
}

fn io_error(err: std::io::Error) -> RepositoryError {
    RepositoryError::Io(err.to_string())
}

impl LocalCache for FileLocalCache {
    fn load(&self, id: &CharacterId) -> Result<Option<CompetenceProfile>, RepositoryError> {
        let content = match std::fs::read_to_string(self.path_for(id)) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(io_error(err)),
        };
        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| RepositoryError::Serialization(format!("invalid cache file: {e}")))
    }

    fn store(&self, id: &CharacterId, profile: &CompetenceProfile) -> Result<(), RepositoryError> {
        let json = serde_json::to_string_pretty(profile)
            .map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        std::fs::create_dir_all(&self.dir).map_err(io_error)?;
        let path = self.path_for(id);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(io_error)?;
        std::fs::rename(&tmp, &path).map_err(io_error)?;

        tracing::trace!(character_id = %id, path = %path.display(), "cache written");
        Ok(())
    }

    fn remove(&self, id: &CharacterId) -> Result<(), RepositoryError> {
        remove_if_present(&self.marker_for(id))?;
        remove_if_present(&self.path_for(id))
    }

    fn set_unsynced(&self, id: &CharacterId, unsynced: bool) -> Result<(), RepositoryError> {
        let marker = self.marker_for(id);
        if !unsynced {
            return remove_if_present(&marker);
        }
        std::fs::create_dir_all(&self.dir).map_err(io_error)?;
        std::fs::write(&marker, b"").map_err(io_error)
    }

    fn is_unsynced(&self, id: &CharacterId) -> Result<bool, RepositoryError> {
        match std::fs::metadata(self.marker_for(id)) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(io_error(err)),
        }
    }
}
