use thiserror::Error;

/// Errors from repository and cache operations (used by the port traits in
/// competence-core).
#[derive(Debug, Clone, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(String),
}

/// Validation and consistency errors raised by admin edits.
///
/// The `Display` text is the feedback message shown to the administrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdminEditError {
    #[error("administrator rights are required")]
    NotAuthorized,

    #[error("unknown category '{0}'")]
    UnknownCategory(String),

    #[error("unknown skill '{skill}' in category '{category}'")]
    UnknownSkill { category: String, skill: String },

    #[error("skill name cannot be empty")]
    EmptyName,

    #[error("base value must be zero or more (got {0})")]
    NegativeBase(i64),

    #[error("cap must be a positive integer (got {0})")]
    InvalidCap(i64),

    #[error("a skill named '{name}' already exists in category '{category}'")]
    NameCollision { category: String, name: String },

    #[error("skill '{0}' is not deleted")]
    NotDeleted(String),
}

/// Errors from a flush attempt. Cloneable so a single in-flight result can
/// be handed to every caller that joined it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("remote write failed: {0}")]
    Remote(String),

    #[error("remote rejected credentials")]
    Unauthorized,

    #[error("failed to encode profile: {0}")]
    Encode(String),

    #[error("flush task aborted")]
    Aborted,
}

impl From<RepositoryError> for SyncError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Unauthorized => SyncError::Unauthorized,
            RepositoryError::Serialization(msg) => SyncError::Encode(msg),
            other => SyncError::Remote(other.to_string()),
        }
    }
}

/// Errors loading the static skill catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog: {0}")]
    Io(String),

    #[error("failed to parse catalog: {0}")]
    Parse(String),

    #[error("duplicate category id '{0}'")]
    DuplicateCategory(String),

    #[error("duplicate skill '{name}' in category '{category}'")]
    DuplicateSkill { category: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_edit_error_display() {
        let err = AdminEditError::NameCollision {
            category: "artisanat".to_string(),
            name: "Forge".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "a skill named 'Forge' already exists in category 'artisanat'"
        );
    }

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_sync_error_from_repository_error() {
        assert_eq!(
            SyncError::from(RepositoryError::Unauthorized),
            SyncError::Unauthorized
        );
        assert_eq!(
            SyncError::from(RepositoryError::Transport("offline".to_string())),
            SyncError::Remote("transport error: offline".to_string())
        );
    }
}
