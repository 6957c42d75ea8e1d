//! SQLite storage layer.
//!
//! Character repository backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod character;
pub mod pool;

pub use character::SqliteCharacterRepository;
pub use pool::DatabasePool;
