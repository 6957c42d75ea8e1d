//! Replication status types shared between the sync engine and its
//! observers.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Events published by the sync engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A local edit was recorded and awaits replication.
    Dirty,
    /// A write to the remote store started.
    FlushStarted { attempt: u32 },
    /// The remote store holds the latest snapshot.
    Synced,
    /// A write failed; another attempt is scheduled.
    FlushFailed {
        attempt: u32,
        retry_in_ms: u64,
        message: String,
    },
    /// User-facing notice, throttled.
    Notice { message: String },
}

/// Point-in-time view of the replication state machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub dirty: bool,
    pub syncing: bool,
    pub retry_count: u32,
    pub local_only: bool,
}

/// Result of a call to `flush`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing to send.
    Clean,
    /// The snapshot was written to the remote store.
    Synced,
    /// No remote store is attached; the local cache is authoritative.
    LocalOnly,
    /// The write failed; a retry has been scheduled.
    Failed(SyncError),
}

impl FlushOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_event_serde_tag() {
        let json = serde_json::to_string(&SyncEvent::FlushFailed {
            attempt: 2,
            retry_in_ms: 1200,
            message: "offline".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""type":"flush_failed""#));
        assert!(json.contains(r#""retry_in_ms":1200"#));
    }

    #[test]
    fn test_flush_outcome_is_failure() {
        assert!(FlushOutcome::Failed(SyncError::Aborted).is_failure());
        assert!(!FlushOutcome::Clean.is_failure());
    }
}
