//! Infrastructure layer: ReviewStore adapters
//!
//! # Adapters
//!
//! - `MemoryReviewStore`: In-memory adapter (tests, ephemeral sessions)
//! - `SqliteReviewStore`: SQLite adapter (feature `sqlite`, on by default)

pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryReviewStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteReviewStore;
