//! In-memory ReviewStore adapter
//!
//! Backs tests and ephemeral sessions. Behavior mirrors the SQLite adapter:
//! idempotent saves, newest-first listings, case-insensitive search.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::{ReviewMeta, ReviewRecord, ReviewStore, SearchHit, StoreStats};
use crate::error::{Result, StorageError};

/// In-memory review store
///
/// Records live in a `HashMap` keyed by `batch_id` behind a `RwLock`.
/// Nothing survives the process; `db_size_bytes` is always 0.
#[derive(Debug, Default)]
pub struct MemoryReviewStore {
    records: RwLock<HashMap<String, ReviewRecord>>,
}

impl MemoryReviewStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewStore for MemoryReviewStore {
    async fn save_review(&self, record: &ReviewRecord) -> Result<()> {
        self.records
            .write()
            .insert(record.batch_id.clone(), record.clone());
        Ok(())
    }

    async fn get_review(&self, batch_id: &str) -> Result<ReviewRecord> {
        self.records
            .read()
            .get(batch_id)
            .cloned()
            .ok_or_else(|| StorageError::review_not_found(batch_id))
    }

    async fn list_reviews(
        &self,
        document_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<ReviewMeta>> {
        let records = self.records.read();
        let mut metas: Vec<ReviewMeta> = records
            .values()
            .filter(|r| r.document_id == document_id)
            .map(ReviewRecord::meta)
            .collect();
        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            metas.truncate(limit);
        }
        Ok(metas)
    }

    async fn latest_review(&self, document_id: &str) -> Result<Option<ReviewRecord>> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|r| r.document_id == document_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn search_findings(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>> {
        let needle = query.to_lowercase();
        let records = self.records.read();
        let mut hits: Vec<SearchHit> = records
            .values()
            .flat_map(|record| {
                record
                    .run
                    .findings
                    .iter()
                    .filter(|f| f.content.to_lowercase().contains(&needle))
                    .map(|f| SearchHit {
                        batch_id: record.batch_id.clone(),
                        document_id: record.document_id.clone(),
                        finding: f.clone(),
                    })
            })
            .collect();
        hits.sort_by(|a, b| b.finding.created_at.cmp(&a.finding.created_at));
        if let Some(limit) = limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    async fn search_reviews(&self, query: &str, limit: Option<usize>) -> Result<Vec<ReviewMeta>> {
        let needle = query.to_lowercase();
        let records = self.records.read();
        let mut metas: Vec<ReviewMeta> = records
            .values()
            .filter(|r| {
                r.run.executive_summary.to_lowercase().contains(&needle)
                    || r.run
                        .contributions
                        .iter()
                        .any(|c| c.to_lowercase().contains(&needle))
            })
            .map(ReviewRecord::meta)
            .collect();
        metas.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            metas.truncate(limit);
        }
        Ok(metas)
    }

    async fn delete_document(&self, document_id: &str) -> Result<usize> {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|_, r| r.document_id != document_id);
        Ok(before - records.len())
    }

    async fn stats(&self) -> Result<StoreStats> {
        let records = self.records.read();
        Ok(StoreStats {
            review_count: records.len(),
            finding_count: records.values().map(|r| r.run.findings.len()).sum(),
            db_size_bytes: 0,
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
        let store = MemoryReviewStore::new();
        let record = record_with_findings("paper-a", 0, &["Strong ablation study"]);

        store.save_review(&record).await.unwrap();
        let loaded = store.get_review(&record.batch_id).await.unwrap();

        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_get_missing_review_errors() {
        let store = MemoryReviewStore::new();

        let err = store.get_review("no-such-batch").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ReviewNotFound);
    }

    #[tokio::test]
    async fn test_save_replaces_same_batch_id() {
        let store = MemoryReviewStore::new();
        let mut record = record_with_findings("paper-a", 0, &["First pass"]);
        store.save_review(&record).await.unwrap();

        record.run.executive_summary = "Revised.".to_string();
        store.save_review(&record).await.unwrap();

        let loaded = store.get_review(&record.batch_id).await.unwrap();
        assert_eq!(loaded.run.executive_summary, "Revised.");
        assert_eq!(store.stats().await.unwrap().review_count, 1);
    }

    #[tokio::test]
    async fn test_list_reviews_newest_first_with_limit() {
        let store = MemoryReviewStore::new();
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
    }

    #[tokio::test]
    async fn test_latest_review() {
        let store = MemoryReviewStore::new();
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
        let store = MemoryReviewStore::new();
        let record = record_with_findings(
            "paper-a",
            0,
            &["Novel Attention mechanism", "Weak baseline comparison"],
        );
        store.save_review(&record).await.unwrap();

        let hits = store.search_findings("attention", None).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].batch_id, record.batch_id);
        assert!(hits[0].finding.content.contains("Attention"));
    }

    #[tokio::test]
    async fn test_search_findings_respects_limit() {
        let store = MemoryReviewStore::new();
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
        let store = MemoryReviewStore::new();
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
    async fn test_delete_document() {
        let store = MemoryReviewStore::new();
        store
            .save_review(&record_with_findings("paper-a", 20, &["finding one"]))
            .await
            .unwrap();
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
        assert!(store.list_reviews("paper-a", None).await.unwrap().is_empty());

        assert_eq!(store.delete_document("paper-a").await.unwrap(), 0);
    }
}
