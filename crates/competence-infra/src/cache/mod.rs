//! `LocalCache` implementations.

pub mod file;
pub mod memory;

pub use file::FileLocalCache;
pub use memory::MemoryLocalCache;
