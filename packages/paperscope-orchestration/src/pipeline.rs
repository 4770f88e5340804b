use crate::capability::{CapabilityHandler, CapabilityRegistry};
use crate::context_store::ContextStore;
use crate::document::{DocumentMeta, DocumentSection};
use crate::error::Result;
use crate::executor::{ConcurrentExecutor, ExecutorConfig};
use crate::runner::TaskRunner;
use crate::summary::{ProgressiveSummarizer, SummaryForest};
use crate::synthesis::{AnalysisRun, SynthesisEngine};
use crate::task::Task;
use futures::future::join_all;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Everything one document review produces
#[derive(Debug, Clone)]
pub struct ReviewOutput {
    pub run: AnalysisRun,
    pub summaries: SummaryForest,
}

/// End-to-end facade: execute a task batch, accumulate findings, synthesize
/// a run, derive its summary hierarchy.
///
/// Handlers are registered once; each `review` call is an independent batch
/// with its own context store.
pub struct ReviewPipeline {
    registry: Arc<CapabilityRegistry>,
    config: ExecutorConfig,
    synthesis: SynthesisEngine,
    summarizer: ProgressiveSummarizer,
    summary_levels: u32,
}

impl ReviewPipeline {
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: Arc::new(CapabilityRegistry::new()),
            config,
            synthesis: SynthesisEngine::new(),
            summarizer: ProgressiveSummarizer::new(),
            summary_levels: 2,
        })
    }

    /// Register an analysis capability
    pub fn register_handler(&mut self, handler: Arc<dyn CapabilityHandler>) {
        Arc::make_mut(&mut self.registry).register(handler);
    }

    pub fn with_summary_levels(mut self, levels: u32) -> Self {
        self.summary_levels = levels;
        self
    }

    pub fn capabilities(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Run one review batch (main entry point)
    pub async fn review(
        &self,
        document_id: impl Into<String>,
        tasks: Vec<Task>,
    ) -> Result<ReviewOutput> {
        let document_id = document_id.into();
        let batch_id = Uuid::new_v4();
        info!(
            batch_id = %batch_id,
            document_id = %document_id,
            tasks = tasks.len(),
            "Starting review batch"
        );
        let started = tokio::time::Instant::now();

        let runner = Arc::new(TaskRunner::new(self.registry.clone()));
        let executor = ConcurrentExecutor::new(runner, self.config.clone());
        let results = executor.run(tasks).await?;

        let store = ContextStore::new();
        join_all(results.values().map(|result| store.ingest(result))).await;

        // Stable order keeps synthesis reproducible whatever order the
        // batch happened to settle in
        let mut findings = store.all().await;
        findings.sort_by(|a, b| a.origin_task_id.cmp(&b.origin_task_id));

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let run = self
            .synthesis
            .synthesize(batch_id, document_id, results, findings, elapsed_ms);
        let summaries = self.summarizer.summarize(&run, self.summary_levels)?;

        info!(
            batch_id = %batch_id,
            successful = run.metrics.successful_count,
            total = run.metrics.total_count,
            findings = run.findings.len(),
            summary_nodes = summaries.len(),
            elapsed_ms,
            "Review batch complete"
        );
        Ok(ReviewOutput { run, summaries })
    }
}

/// Cross product of sections and capabilities, one task per pair, with ids
/// of the form `section:capability`
pub fn plan_tasks(
    document: &DocumentMeta,
    sections: &[DocumentSection],
    capabilities: &[&str],
) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(sections.len() * capabilities.len());
    for section in sections {
        for capability in capabilities {
            tasks.push(Task::new(
                format!("{}:{}", section.name, capability),
                *capability,
                crate::document::TaskInput::new(document.clone(), section.clone()),
            ));
        }
    }
    tasks
}
