//! Identity/session port.
//!
//! The identity subsystem is external; the engine only needs to know which
//! character is active and whether the current user may perform admin
//! mutations.

use competence_types::character::Character;
use competence_types::error::RepositoryError;

/// Access to the active character and the caller's rights.
pub trait IdentityProvider: Send + Sync {
    /// The active character with its `profile_data`, or `None` when nobody
    /// is signed in (the engine then runs in local-only mode).
    fn active_character(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<Character>, RepositoryError>> + Send;

    /// Whether the current user may run admin operations.
    fn is_admin(&self) -> bool;
}
