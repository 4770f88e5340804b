//! Domain layer for ReviewStore
//!
//! # Core Principles
//!
//! 1. **Run Identity**: `batch_id` (UUID assigned at synthesis) uniquely identifies a review
//! 2. **Idempotent Save**: saving the same `batch_id` twice replaces the record
//! 3. **Whole-Run Persistence**: the `AnalysisRun` and its `SummaryForest` are stored
//!    together; findings are additionally indexed for search
//!
//! # Domain Models
//!
//! - `ReviewRecord`: A completed analysis run plus its summary forest
//! - `ReviewMeta`: Lightweight listing row (no run payload)
//! - `SearchHit`: A finding matched by full-text search, with its review context
//! - `StoreStats`: Storage-level counters
//!
//! # Port Trait
//!
//! - `ReviewStore`: Primary storage abstraction
//!
//! # Examples
//!
//! ```rust,ignore
//! use paperscope_storage::domain::{ReviewStore, ReviewRecord};
//!
//! async fn example(store: impl ReviewStore, run: AnalysisRun, forest: SummaryForest) -> Result<()> {
//!     // Persist a finished review
//!     let record = ReviewRecord::new(run, forest);
//!     store.save_review(&record).await?;
//!
//!     // List reviews for a document, newest first
//!     let metas = store.list_reviews("attention-is-all-you-need", Some(10)).await?;
//!
//!     // Search findings across all reviews
//!     let hits = store.search_findings("ablation", Some(20)).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperscope_orchestration::{AnalysisRun, Finding, SummaryForest};

use crate::Result;

// ═══════════════════════════════════════════════════════════════════════════
// Domain Models
// ═══════════════════════════════════════════════════════════════════════════

/// A persisted review: one analysis run together with its summary forest
///
/// # Identity
///
/// - `batch_id`: the run's batch UUID rendered as a string
/// - Saving a record with an existing `batch_id` replaces the stored copy
///
/// # Examples
///
/// ```rust,ignore
/// let record = ReviewRecord::new(run, forest);
/// assert_eq!(record.batch_id, record.run.batch_id.to_string());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Review ID (run batch UUID as string)
    pub batch_id: String,
    /// Document the review analyzed
    pub document_id: String,
    /// Synthesis timestamp
    pub created_at: DateTime<Utc>,
    /// Full synthesized run (results, findings, assessment, narrative lists)
    pub run: AnalysisRun,
    /// Progressive summary forest built from the run
    pub summaries: SummaryForest,
}

impl ReviewRecord {
    /// Create a record from a synthesized run and its summaries
    ///
    /// Identity fields are derived from the run itself, so a record can
    /// never disagree with its payload about which review it is.
    pub fn new(run: AnalysisRun, summaries: SummaryForest) -> Self {
        Self {
            batch_id: run.batch_id.to_string(),
            document_id: run.document_id.clone(),
            created_at: run.created_at,
            run,
            summaries,
        }
    }

    /// Project the listing row for this record
    pub fn meta(&self) -> ReviewMeta {
        ReviewMeta {
            batch_id: self.batch_id.clone(),
            document_id: self.document_id.clone(),
            created_at: self.created_at,
            successful_count: self.run.metrics.successful_count,
            total_count: self.run.metrics.total_count,
            executive_summary: self.run.executive_summary.clone(),
        }
    }
}

/// Lightweight review listing row
///
/// Carries enough to render a review index without deserializing the
/// full run payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewMeta {
    /// Review ID (run batch UUID as string)
    pub batch_id: String,
    /// Document the review analyzed
    pub document_id: String,
    /// Synthesis timestamp
    pub created_at: DateTime<Utc>,
    /// Tasks that produced a report
    pub successful_count: usize,
    /// Tasks submitted in the batch
    pub total_count: usize,
    /// Narrative summary of the run
    pub executive_summary: String,
}

/// A finding matched by search, with the review it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Review the finding belongs to
    pub batch_id: String,
    /// Document the finding describes
    pub document_id: String,
    /// The matched finding
    pub finding: Finding,
}

/// Storage-level counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StoreStats {
    /// Persisted reviews
    pub review_count: usize,
    /// Indexed findings across all reviews
    pub finding_count: usize,
    /// On-disk size in bytes (0 for in-memory stores)
    pub db_size_bytes: u64,
}

// ═══════════════════════════════════════════════════════════════════════════
// Port Trait: ReviewStore
// ═══════════════════════════════════════════════════════════════════════════

/// Review storage abstraction
///
/// This trait defines the persistence operations for completed analysis runs.
///
/// # Core Operations
///
/// 1. **Review Management**
///    - `save_review`: Persist a record (replaces on duplicate `batch_id`)
///    - `get_review`: Retrieve a full record by ID
///    - `list_reviews`: List review metadata for a document, newest first
///    - `latest_review`: Most recent full record for a document
///
/// 2. **Search**
///    - `search_findings`: Substring search over finding content
///    - `search_reviews`: Substring search over review narratives
///
/// 3. **Lifecycle**
///    - `delete_document`: Remove every review for a document
///    - `stats`: Storage counters
///
/// # Implementations
///
/// - `SqliteReviewStore`: SQLite adapter (feature `sqlite`, on by default)
/// - `MemoryReviewStore`: In-memory adapter for tests and ephemeral use
#[async_trait]
pub trait ReviewStore: Send + Sync {
    // ═══════════════════════════════════════════════════════════════════════
    // Review Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Persist a review record
    ///
    /// Saving a record whose `batch_id` already exists replaces the stored
    /// copy, findings included.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the database or serialization fails
    async fn save_review(&self, record: &ReviewRecord) -> Result<()>;

    /// Get a full review record by ID
    ///
    /// # Errors
    ///
    /// Returns `StorageError` with `ErrorKind::ReviewNotFound` if no record
    /// has this `batch_id`
    async fn get_review(&self, batch_id: &str) -> Result<ReviewRecord>;

    /// List review metadata for a document
    ///
    /// # Arguments
    ///
    /// - `document_id`: Document identifier
    /// - `limit`: Maximum rows to return (None = unlimited)
    ///
    /// # Returns
    ///
    /// Metadata ordered by `created_at` (newest first)
    async fn list_reviews(
        &self,
        document_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ReviewMeta>>;

    /// Get the most recent full record for a document
    ///
    /// # Returns
    ///
    /// `None` if the document has no reviews
    async fn latest_review(&self, document_id: &str) -> Result<Option<ReviewRecord>>;

    // ═══════════════════════════════════════════════════════════════════════
    // Search
    // ═══════════════════════════════════════════════════════════════════════

    /// Search finding content across all reviews
    ///
    /// Case-insensitive substring match over `Finding::content`.
    ///
    /// # Arguments
    ///
    /// - `query`: Substring to match
    /// - `limit`: Maximum hits to return (None = unlimited)
    async fn search_findings(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>>;

    /// Search review narratives
    ///
    /// Case-insensitive substring match over the executive summary and the
    /// contribution list, newest first.
    ///
    /// # Arguments
    ///
    /// - `query`: Substring to match
    /// - `limit`: Maximum reviews to return (None = unlimited)
    async fn search_reviews(&self, query: &str, limit: Option<usize>) -> Result<Vec<ReviewMeta>>;

    // ═══════════════════════════════════════════════════════════════════════
    // Lifecycle Operations
    // ═══════════════════════════════════════════════════════════════════════

    /// Delete every review for a document
    ///
    /// # Returns
    ///
    /// Number of review records removed (0 if the document was unknown)
    async fn delete_document(&self, document_id: &str) -> Result<usize>;

    /// Storage counters
    async fn stats(&self) -> Result<StoreStats>;
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
