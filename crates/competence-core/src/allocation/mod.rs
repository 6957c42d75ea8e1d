//! Point allocation state machine.

pub mod store;

pub use store::AllocationStore;
