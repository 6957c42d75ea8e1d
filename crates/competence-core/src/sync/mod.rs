//! Local-first persistence with debounced, retried remote replication.

pub mod backoff;
pub mod engine;
pub mod events;
pub mod scheduler;

pub use engine::PersistenceSync;
pub use events::SyncEventBus;
pub use scheduler::{Scheduler, TaskHandle, TokioScheduler};
