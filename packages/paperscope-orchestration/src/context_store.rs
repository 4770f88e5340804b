use crate::report::{AgentReport, Finding, FindingCategory};
use crate::task::{Priority, TaskId, TaskResult};
use dashmap::DashSet;
use parking_lot::RwLock;
use tracing::{debug, warn};

/// Filter for querying accumulated findings. Empty filter matches everything.
#[derive(Debug, Clone, Default)]
pub struct FindingFilter {
    pub category: Option<FindingCategory>,
    pub origin_task_id: Option<TaskId>,
    /// Keep findings at least this urgent
    pub min_priority: Option<Priority>,
    pub relevant_to: Option<String>,
}

impl FindingFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, category: FindingCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn origin(mut self, task_id: impl Into<TaskId>) -> Self {
        self.origin_task_id = Some(task_id.into());
        self
    }

    pub fn min_priority(mut self, priority: Priority) -> Self {
        self.min_priority = Some(priority);
        self
    }

    pub fn relevant_to(mut self, capability: impl Into<String>) -> Self {
        self.relevant_to = Some(capability.into());
        self
    }

    pub fn matches(&self, finding: &Finding) -> bool {
        if let Some(category) = self.category {
            if finding.category != category {
                return false;
            }
        }
        if let Some(origin) = &self.origin_task_id {
            if &finding.origin_task_id != origin {
                return false;
            }
        }
        if let Some(min) = self.min_priority {
            if finding.priority.rank() > min.rank() {
                return false;
            }
        }
        if let Some(capability) = &self.relevant_to {
            if !finding.is_relevant_to(capability) {
                return false;
            }
        }
        true
    }
}

/// Thread-safe accumulator for findings produced during a batch.
///
/// Append-only while tasks run; writes from concurrent workers interleave at
/// finding granularity, never mid-finding. Ingestion is idempotent per task:
/// a report ingested twice for the same task id contributes its findings
/// exactly once.
#[derive(Debug, Default)]
pub struct ContextStore {
    findings: RwLock<Vec<Finding>>,
    ingested: DashSet<TaskId>,
}

impl ContextStore {
    pub fn new() -> Self {
        Self {
            findings: RwLock::new(Vec::new()),
            ingested: DashSet::new(),
        }
    }

    /// Ingest a settled task result, returning the findings it contributed.
    /// Only Success outcomes carry findings; Failure and Timeout results
    /// contribute nothing here but stay in the batch's result map for
    /// accounting.
    pub async fn ingest(&self, result: &TaskResult) -> Vec<Finding> {
        match result.report() {
            Some(report) => self.ingest_report(&result.task_id, report).await,
            None => Vec::new(),
        }
    }

    /// Ingest a report directly, stamping identity and origin onto each
    /// reported finding. Returns the appended findings; empty when the task
    /// was already ingested.
    pub async fn ingest_report(&self, task_id: &str, report: &AgentReport) -> Vec<Finding> {
        if !self.ingested.insert(task_id.to_string()) {
            warn!(task_id = %task_id, "Duplicate ingestion attempt ignored");
            return Vec::new();
        }

        let stamped: Vec<Finding> = report
            .findings
            .iter()
            .map(|reported| Finding::from_reported(task_id, reported))
            .collect();

        self.findings.write().extend_from_slice(&stamped);
        debug!(task_id = %task_id, count = stamped.len(), "Ingested findings");
        stamped
    }

    pub async fn query(&self, filter: &FindingFilter) -> Vec<Finding> {
        self.findings
            .read()
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect()
    }

    /// Findings other tasks flagged as relevant to the given capability
    pub async fn cross_reference(&self, capability: &str) -> Vec<Finding> {
        self.query(&FindingFilter::new().relevant_to(capability))
            .await
    }

    pub async fn all(&self) -> Vec<Finding> {
        self.findings.read().clone()
    }

    pub fn len(&self) -> usize {
        self.findings.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.findings.read().is_empty()
    }
}
