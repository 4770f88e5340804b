//! SQLite-based ReviewStore adapter
//!
//! Single-file database. Suitable for local review archives and testing.
//!
//! Full payloads (`run_json`, `summaries_json`) are stored as JSON text;
//! listing and search columns are denormalized alongside them so the index
//! queries never touch the payloads.

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;

use paperscope_orchestration::Finding;

use crate::domain::{ReviewMeta, ReviewRecord, ReviewStore, SearchHit, StoreStats};
use crate::error::{Result, StorageError};

/// SQLite-backed review store
#[derive(Clone)]
pub struct SqliteReviewStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteReviewStore {
    /// Open (or create) a store at the given path
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        // Reviews table: one row per synthesized run
        conn.execute(
            "CREATE TABLE IF NOT EXISTS reviews (
                batch_id TEXT PRIMARY KEY,
                document_id TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                successful_count INTEGER NOT NULL,
                total_count INTEGER NOT NULL,
                executive_summary TEXT NOT NULL,
                contributions TEXT NOT NULL,
                run_json TEXT NOT NULL,
                summaries_json TEXT NOT NULL
            )",
            [],
        )?;

        // Findings index: denormalized for search without payload parsing
        conn.execute(
            "CREATE TABLE IF NOT EXISTS findings (
                id TEXT PRIMARY KEY,
                batch_id TEXT NOT NULL,
                document_id TEXT NOT NULL,
                origin_task_id TEXT NOT NULL,
                category TEXT NOT NULL,
                priority TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                finding_json TEXT NOT NULL,
                FOREIGN KEY (batch_id) REFERENCES reviews(batch_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reviews_document
             ON reviews(document_id, created_at)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_findings_batch
             ON findings(batch_id)",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_findings_document
             ON findings(document_id, category)",
            [],
        )?;

        Ok(())
    }
}

#[async_trait]
impl ReviewStore for SqliteReviewStore {
    async fn save_review(&self, record: &ReviewRecord) -> Result<()> {
        let run_json = serde_json::to_string(&record.run)?;
        let summaries_json = serde_json::to_string(&record.summaries)?;

        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;

        // Replacing a review replaces its finding index too
        tx.execute(
            "DELETE FROM findings WHERE batch_id = ?1",
            params![&record.batch_id],
        )?;

        tx.execute(
            "INSERT OR REPLACE INTO reviews
             (batch_id, document_id, created_at, successful_count, total_count,
              executive_summary, contributions, run_json, summaries_json)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                &record.batch_id,
                &record.document_id,
                record.created_at.timestamp(),
                record.run.metrics.successful_count as i64,
                record.run.metrics.total_count as i64,
                &record.run.executive_summary,
                record.run.contributions.join("\n"),
                &run_json,
                &summaries_json,
            ],
        )?;

        for finding in &record.run.findings {
            tx.execute(
                "INSERT OR REPLACE INTO findings
                 (id, batch_id, document_id, origin_task_id, category, priority,
                  content, created_at, finding_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    finding.id.to_string(),
                    &record.batch_id,
                    &record.document_id,
                    &finding.origin_task_id,
                    finding.category.as_str(),
                    finding.priority.as_str(),
                    &finding.content,
                    finding.created_at.timestamp(),
                    serde_json::to_string(finding)?,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn get_review(&self, batch_id: &str) -> Result<ReviewRecord> {
        let conn = self.conn.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT run_json, summaries_json FROM reviews WHERE batch_id = ?1",
                params![batch_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let (run_json, summaries_json) =
            row.ok_or_else(|| StorageError::review_not_found(batch_id))?;
        let run = serde_json::from_str(&run_json)?;
        let summaries = serde_json::from_str(&summaries_json)?;
        Ok(ReviewRecord::new(run, summaries))
    }

    async fn list_reviews(
        &self,
        document_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ReviewMeta>> {
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT batch_id, document_id, created_at, successful_count, total_count,
                    executive_summary
             FROM reviews WHERE document_id = ?1
             ORDER BY created_at DESC{}",
            limit.map(|l| format!(" LIMIT {}", l)).unwrap_or_default()
        );
        let mut stmt = conn.prepare(&sql)?;
        let metas = stmt
            .query_map(params![document_id], |row| {
                Ok(ReviewMeta {
                    batch_id: row.get(0)?,
                    document_id: row.get(1)?,
                    created_at: chrono::DateTime::from_timestamp(row.get(2)?, 0)
                        .unwrap_or_default(),
                    successful_count: row.get::<_, i64>(3)? as usize,
                    total_count: row.get::<_, i64>(4)? as usize,
                    executive_summary: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metas)
    }

    async fn latest_review(&self, document_id: &str) -> Result<Option<ReviewRecord>> {
        let conn = self.conn.lock();
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT run_json, summaries_json FROM reviews
                 WHERE document_id = ?1
                 ORDER BY created_at DESC LIMIT 1",
                params![document_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((run_json, summaries_json)) => {
                let run = serde_json::from_str(&run_json)?;
                let summaries = serde_json::from_str(&summaries_json)?;
                Ok(Some(ReviewRecord::new(run, summaries)))
            }
            None => Ok(None),
        }
    }

    async fn search_findings(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>> {
        let pattern = format!("%{}%", query);
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT batch_id, document_id, finding_json
             FROM findings WHERE content LIKE ?1
             ORDER BY created_at DESC{}",
            limit.map(|l| format!(" LIMIT {}", l)).unwrap_or_default()
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![pattern], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut hits = Vec::with_capacity(rows.len());
        for (batch_id, document_id, finding_json) in rows {
            let finding: Finding = serde_json::from_str(&finding_json)?;
            hits.push(SearchHit {
                batch_id,
                document_id,
                finding,
            });
        }
        Ok(hits)
    }

    async fn search_reviews(&self, query: &str, limit: Option<usize>) -> Result<Vec<ReviewMeta>> {
        let pattern = format!("%{}%", query);
        let conn = self.conn.lock();
        let sql = format!(
            "SELECT batch_id, document_id, created_at, successful_count, total_count,
                    executive_summary
             FROM reviews
             WHERE executive_summary LIKE ?1 OR contributions LIKE ?1
             ORDER BY created_at DESC{}",
            limit.map(|l| format!(" LIMIT {}", l)).unwrap_or_default()
        );
        let mut stmt = conn.prepare(&sql)?;
        let metas = stmt
            .query_map(params![pattern], |row| {
                Ok(ReviewMeta {
                    batch_id: row.get(0)?,
                    document_id: row.get(1)?,
                    created_at: chrono::DateTime::from_timestamp(row.get(2)?, 0)
                        .unwrap_or_default(),
                    successful_count: row.get::<_, i64>(3)? as usize,
                    total_count: row.get::<_, i64>(4)? as usize,
                    executive_summary: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(metas)
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM findings WHERE document_id = ?1",
            params![document_id],
        )?;
        let removed = tx.execute(
            "DELETE FROM reviews WHERE document_id = ?1",
            params![document_id],
        )?;
        tx.commit()?;
        Ok(removed)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let conn = self.conn.lock();

        let review_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM reviews", [], |row| row.get(0))?;

        let finding_count: i64 =
            conn.query_row("SELECT COUNT(*) FROM findings", [], |row| row.get(0))?;

        // Get database file size (approximate)
        let db_size_bytes: u64 = conn
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get::<_, i64>(0),
            )
            .map(|bytes| bytes as u64)
            .unwrap_or(0);

        Ok(StoreStats {
            review_count: review_count as usize,
            finding_count: finding_count as usize,
            db_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tests_support::record_with_findings;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_save_and_get_roundtrip() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let record =
            record_with_findings("paper-a", 0, &["Strong ablation study", "No code release"]);

        store.save_review(&record).await.unwrap();
        let loaded = store.get_review(&record.batch_id).await.unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_get_missing_review_errors() {
        let store = SqliteReviewStore::in_memory().unwrap();

        let err = store.get_review("no-such-batch").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReviewNotFound);
    }

    #[tokio::test]
    async fn test_save_replaces_finding_index() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let mut record = record_with_findings("paper-a", 0, &["first finding", "second finding"]);
        store.save_review(&record).await.unwrap();
        assert_eq!(store.stats().await.unwrap().finding_count, 2);

        // Re-saving with fewer findings must not leave stale index rows
        record.run.findings.truncate(1);
        store.save_review(&record).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.review_count, 1);
        assert_eq!(stats.finding_count, 1);
    }

    #[tokio::test]
    async fn test_list_reviews_newest_first_with_limit() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let oldest = record_with_findings("paper-a", 30, &[]);
        let middle = record_with_findings("paper-a", 20, &[]);
        let newest = record_with_findings("paper-a", 10, &[]);
        let other = record_with_findings("paper-b", 0, &[]);
        for record in [&oldest, &middle, &newest, &other] {
            store.save_review(record).await.unwrap();
        }

        let metas = store.list_reviews("paper-a", Some(2)).await.unwrap();

        assert_eq!(metas.len(), 2);
        assert_eq!(metas[0].batch_id, newest.batch_id);
        assert_eq!(metas[1].batch_id, middle.batch_id);

        let all = store.list_reviews("paper-a", None).await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_latest_review() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let older = record_with_findings("paper-a", 60, &[]);
        let newer = record_with_findings("paper-a", 5, &[]);
        store.save_review(&older).await.unwrap();
        store.save_review(&newer).await.unwrap();

        let latest = store.latest_review("paper-a").await.unwrap().unwrap();
        assert_eq!(latest.batch_id, newer.batch_id);

        assert!(store.latest_review("paper-z").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_findings_case_insensitive() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let record = record_with_findings(
            "paper-a",
            0,
            &["Novel Attention mechanism", "Weak baseline comparison"],
        );
        store.save_review(&record).await.unwrap();

        let hits = store.search_findings("attention", None).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].batch_id, record.batch_id);
        assert_eq!(hits[0].document_id, "paper-a");
        assert!(hits[0].finding.content.contains("Attention"));

        assert!(store
            .search_findings("quantum", None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_search_findings_respects_limit() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let record = record_with_findings(
            "paper-a",
            0,
            &["missing ablation", "missing baselines", "missing code"],
        );
        store.save_review(&record).await.unwrap();

        let hits = store.search_findings("missing", Some(2)).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn test_search_reviews_matches_summary_and_contributions() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let by_summary = record_with_findings("paper-novel", 10, &[]);
        let mut by_contribution = record_with_findings("paper-b", 0, &[]);
        by_contribution
            .run
            .contributions
            .push("Introduces a novel pruning schedule".to_string());
        store.save_review(&by_summary).await.unwrap();
        store.save_review(&by_contribution).await.unwrap();

        let metas = store.search_reviews("NOVEL", None).await.unwrap();
        assert_eq!(metas.len(), 2);
        assert_eq!(metas[0].batch_id, by_contribution.batch_id);
        assert_eq!(metas[1].batch_id, by_summary.batch_id);

        let capped = store.search_reviews("novel", Some(1)).await.unwrap();
        assert_eq!(capped.len(), 1);

        assert!(store.search_reviews("hexagonal", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_document_drops_reviews_and_findings() {
        let store = SqliteReviewStore::in_memory().unwrap();
        let doomed = record_with_findings("paper-a", 20, &["finding one"]);
        store.save_review(&doomed).await.unwrap();
        store
            .save_review(&record_with_findings("paper-a", 10, &["finding two"]))
            .await
            .unwrap();
        store
            .save_review(&record_with_findings("paper-b", 0, &["finding three"]))
            .await
            .unwrap();

        let removed = store.delete_document("paper-a").await.unwrap();
        assert_eq!(removed, 2);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.review_count, 1);
        assert_eq!(stats.finding_count, 1);

        let err = store.get_review(&doomed.batch_id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReviewNotFound);

        assert_eq!(store.delete_document("paper-a").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reopen_preserves_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reviews.db");
        let record = record_with_findings("paper-a", 0, &["survives reopen"]);

        {
            let store = SqliteReviewStore::new(&path).unwrap();
            store.save_review(&record).await.unwrap();
        }

        let store = SqliteReviewStore::new(&path).unwrap();
        let loaded = store.get_review(&record.batch_id).await.unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_stats_on_disk_database() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteReviewStore::new(dir.path().join("reviews.db")).unwrap();
        store
            .save_review(&record_with_findings("paper-a", 0, &["sized"]))
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.review_count, 1);
        assert_eq!(stats.finding_count, 1);
        assert!(stats.db_size_bytes > 0);
    }
}
