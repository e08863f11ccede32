//! Infrastructure layer - Storage adapters
//!
//! - `memory`: process-local store, always available
//! - `sqlite`: file-backed store (feature `sqlite`)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::InMemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
