use crate::document::TaskInput;
use crate::error::{OrchestratorError, Result};
use crate::report::AgentReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task identifier (caller-assigned, unique within a batch)
pub type TaskId = String;

/// Priority for tasks and findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(OrchestratorError::parse(format!("Invalid priority: {}", s))),
        }
    }

    /// Numeric rank, lower runs/sorts first
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of analysis work: a capability applied to one document section.
///
/// Immutable once submitted; the executor never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Name of the capability handler that will execute this task
    pub capability: String,
    pub input: TaskInput,
    pub priority: Priority,
}

impl Task {
    pub fn new(id: impl Into<TaskId>, capability: impl Into<String>, input: TaskInput) -> Self {
        Self {
            id: id.into(),
            capability: capability.into(),
            input,
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Which budget a timed-out task exceeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutScope {
    /// The task started and its own execution budget ran out
    PerTask,
    /// The whole-batch deadline fired before the task settled
    Batch,
}

impl TimeoutScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutScope::PerTask => "per_task",
            TimeoutScope::Batch => "batch",
        }
    }
}

impl std::fmt::Display for TimeoutScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settled outcome of a task. Data-carrying so downstream code matches on
/// the variant instead of probing optional fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TaskOutcome {
    Success { report: AgentReport },
    Failure { error: String },
    Timeout { scope: TimeoutScope },
}

impl TaskOutcome {
    pub fn outcome_name(&self) -> &'static str {
        match self {
            TaskOutcome::Success { .. } => "success",
            TaskOutcome::Failure { .. } => "failure",
            TaskOutcome::Timeout { .. } => "timeout",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TaskOutcome::Timeout { .. })
    }
}

/// Uniform record of one task's fate within a batch.
///
/// Created exactly once per task, by the executor, after the task settles
/// or is abandoned. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub capability: String,
    pub outcome: TaskOutcome,
    /// Raw text returned by the capability, kept for diagnostics even when
    /// the structured payload failed validation
    pub raw_output: Option<String>,
    pub elapsed_ms: u64,
    pub tokens_used: u64,
    pub completed_at: DateTime<Utc>,
}

impl TaskResult {
    pub fn success(
        task: &Task,
        report: AgentReport,
        raw_output: String,
        elapsed_ms: u64,
        tokens_used: u64,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            capability: task.capability.clone(),
            outcome: TaskOutcome::Success { report },
            raw_output: Some(raw_output),
            elapsed_ms,
            tokens_used,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(
        task: &Task,
        error: impl Into<String>,
        raw_output: Option<String>,
        elapsed_ms: u64,
        tokens_used: u64,
    ) -> Self {
        Self {
            task_id: task.id.clone(),
            capability: task.capability.clone(),
            outcome: TaskOutcome::Failure {
                error: error.into(),
            },
            raw_output,
            elapsed_ms,
            tokens_used,
            completed_at: Utc::now(),
        }
    }

    pub fn timeout(task: &Task, scope: TimeoutScope, elapsed_ms: u64) -> Self {
        Self {
            task_id: task.id.clone(),
            capability: task.capability.clone(),
            outcome: TaskOutcome::Timeout { scope },
            raw_output: None,
            elapsed_ms,
            tokens_used: 0,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Structured report, present only for Success outcomes
    pub fn report(&self) -> Option<&AgentReport> {
        match &self.outcome {
            TaskOutcome::Success { report } => Some(report),
            _ => None,
        }
    }

    /// Error description, present for every non-Success outcome
    pub fn error_detail(&self) -> Option<String> {
        match &self.outcome {
            TaskOutcome::Success { .. } => None,
            TaskOutcome::Failure { error } => Some(error.clone()),
            TaskOutcome::Timeout { scope } => {
                Some(format!("{} timeout exceeded, task abandoned", scope))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{DocumentMeta, DocumentSection};
    use crate::report::AgentReport;

    fn sample_task(id: &str) -> Task {
        let input = TaskInput::new(
            DocumentMeta::new("Attention Is All You Need", vec!["Vaswani".to_string()], 2017),
            DocumentSection::new("methods", "We propose the Transformer.", 2),
        );
        Task::new(id, "methodology_review", input)
    }

    #[test]
    fn test_priority_roundtrip() {
        for priority in &[Priority::High, Priority::Medium, Priority::Low] {
            let s = priority.as_str();
            let parsed = Priority::from_str(s).unwrap();
            assert_eq!(*priority, parsed);
        }
    }

    #[test]
    fn test_priority_invalid() {
        assert!(Priority::from_str("urgent").is_err());
    }

    #[test]
    fn test_priority_rank_ordering() {
        assert!(Priority::High.rank() < Priority::Medium.rank());
        assert!(Priority::Medium.rank() < Priority::Low.rank());
    }

    #[test]
    fn test_task_builder() {
        let task = sample_task("t1").with_priority(Priority::High);
        assert_eq!(task.id, "t1");
        assert_eq!(task.capability, "methodology_review");
        assert_eq!(task.priority, Priority::High);
    }

    #[test]
    fn test_success_result_has_report() {
        let task = sample_task("t1");
        let result = TaskResult::success(&task, AgentReport::default(), "{}".to_string(), 120, 50);

        assert!(result.is_success());
        assert!(result.report().is_some());
        assert!(result.error_detail().is_none());
        assert_eq!(result.tokens_used, 50);
    }

    #[test]
    fn test_failure_result_carries_detail() {
        let task = sample_task("t1");
        let result = TaskResult::failure(&task, "connection reset", None, 40, 0);

        assert!(!result.is_success());
        assert!(result.report().is_none());
        assert_eq!(result.error_detail().unwrap(), "connection reset");
    }

    #[test]
    fn test_timeout_result_names_scope() {
        let task = sample_task("t1");
        let per_task = TaskResult::timeout(&task, TimeoutScope::PerTask, 5000);
        let batch = TaskResult::timeout(&task, TimeoutScope::Batch, 10000);

        assert!(per_task.error_detail().unwrap().contains("per_task"));
        assert!(batch.error_detail().unwrap().contains("batch"));
        assert_eq!(per_task.tokens_used, 0);
    }

    #[test]
    fn test_outcome_serde_tagging() {
        let outcome = TaskOutcome::Timeout {
            scope: TimeoutScope::Batch,
        };
        let json = serde_json::to_string(&outcome).unwrap();
        assert!(json.contains("\"outcome\":\"timeout\""));
        assert!(json.contains("\"scope\":\"batch\""));

        let parsed: TaskOutcome = serde_json::from_str(&json).unwrap();
        assert!(parsed.is_timeout());
    }
}
