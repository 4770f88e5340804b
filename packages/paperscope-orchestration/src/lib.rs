/*
 * Paperscope Orchestration - Concurrent Document Analysis Core
 *
 * Coordinates a batch of network-bound analysis agents over one document
 * and merges whatever they produce into a single coherent assessment.
 *
 * Architecture:
 * - Capability Handlers (pluggable analysis agents)
 * - Bounded Concurrent Executor (per-task + batch timeouts)
 * - Context Store (thread-safe finding accumulation)
 * - Synthesis Engine (partial-failure-tolerant aggregation)
 * - Progressive Summarizer (level-validated summary forest)
 */

// Public modules
pub mod capability;
pub mod condense;
pub mod context_store;
pub mod document;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod report;
pub mod runner;
pub mod summary;
pub mod synthesis;
pub mod task;

// Re-exports
pub use capability::{AgentResponse, CapabilityHandler, CapabilityRegistry};
pub use condense::TextCondenser;
pub use context_store::{ContextStore, FindingFilter};
pub use document::{DocumentMeta, DocumentSection, TaskInput};
pub use error::{OrchestratorError, Result};
pub use executor::{ConcurrentExecutor, ExecutorConfig};
pub use pipeline::{plan_tasks, ReviewOutput, ReviewPipeline};
pub use report::{
    AgentReport, AspectScores, Finding, FindingCategory, ReportedFinding,
};
pub use runner::TaskRunner;
pub use summary::{ProgressiveSummarizer, SummaryForest, SummaryNode};
pub use synthesis::{
    AnalysisRun, OverallAssessment, Rating, RunMetrics, SynthesisEngine,
};
pub use task::{Priority, Task, TaskId, TaskOutcome, TaskResult, TimeoutScope};
