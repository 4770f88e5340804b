//! Paperscope Storage - Persistent Review Archive
//!
//! ## Core Principles
//!
//! 1. **Run Identity**: `batch_id` (UUID assigned at synthesis) identifies a review
//! 2. **Idempotent Save**: re-saving a `batch_id` replaces the stored record
//! 3. **Whole-Run Persistence**: the run and its summary forest are stored
//!    together; findings are additionally indexed for search
//!
//! ## Usage
//!
//! ```rust,ignore
//! use paperscope_storage::{ReviewRecord, ReviewStore, SqliteReviewStore};
//!
//! // 1. Persist a finished review
//! let store = SqliteReviewStore::new("reviews.db")?;
//! let record = ReviewRecord::new(output.run, output.summaries);
//! store.save_review(&record).await?;
//!
//! // 2. List a document's reviews, newest first
//! let metas = store.list_reviews("attention-is-all-you-need", Some(10)).await?;
//!
//! // 3. Search findings across every review
//! let hits = store.search_findings("ablation", Some(20)).await?;
//!
//! // 4. Retire a document
//! store.delete_document("attention-is-all-you-need").await?;
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{ErrorKind, Result, StorageError};

// Domain re-exports
pub use domain::{ReviewMeta, ReviewRecord, ReviewStore, SearchHit, StoreStats};

// Adapter re-exports
pub use infrastructure::MemoryReviewStore;

#[cfg(feature = "sqlite")]
pub use infrastructure::SqliteReviewStore;
