use crate::error::{OrchestratorError, Result};
use crate::runner::TaskRunner;
use crate::task::{Task, TaskId, TaskResult, TimeoutScope};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn default_max_workers() -> usize {
    num_cpus::get().clamp(2, 8)
}

fn default_task_timeout_ms() -> u64 {
    120_000
}

fn default_batch_timeout_ms() -> u64 {
    600_000
}

/// Tunable concurrency parameters for batch execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Simultaneous in-flight tasks; excess tasks queue
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Execution budget for one task, queue time excluded
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
    /// Wall-clock budget for the whole batch, queue time included
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            task_timeout_ms: default_task_timeout_ms(),
            batch_timeout_ms: default_batch_timeout_ms(),
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_workers == 0 {
            return Err(OrchestratorError::config("max_workers must be at least 1"));
        }
        if self.task_timeout_ms == 0 {
            return Err(OrchestratorError::config("task_timeout_ms must be positive"));
        }
        if self.batch_timeout_ms == 0 {
            return Err(OrchestratorError::config(
                "batch_timeout_ms must be positive",
            ));
        }
        Ok(())
    }

    pub fn task_budget(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn batch_budget(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }
}

/// Fans a batch of tasks out to a bounded worker pool and fans results back
/// in, guaranteeing exactly one [`TaskResult`] per submitted task.
///
/// A single aggregator loop owns the result map and receives settled results
/// over a channel. When the batch deadline fires the aggregator stops
/// receiving, signals cancellation, and records a batch-scoped timeout for
/// every task not yet settled; anything a detached worker sends afterwards
/// lands on a closed channel and is discarded.
pub struct ConcurrentExecutor {
    runner: Arc<TaskRunner>,
    config: ExecutorConfig,
}

impl ConcurrentExecutor {
    pub fn new(runner: Arc<TaskRunner>, config: ExecutorConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute a batch. Programmer errors (bad config, duplicate task ids,
    /// unregistered capabilities) are rejected here before any task is
    /// scheduled; every runtime failure mode settles into the returned map.
    pub async fn run(&self, tasks: Vec<Task>) -> Result<HashMap<TaskId, TaskResult>> {
        self.config.validate()?;

        if tasks.is_empty() {
            return Ok(HashMap::new());
        }

        let mut seen: HashSet<&str> = HashSet::with_capacity(tasks.len());
        for task in &tasks {
            if !seen.insert(&task.id) {
                return Err(OrchestratorError::DuplicateTask(task.id.clone()));
            }
            if !self.runner.registry().contains(&task.capability) {
                return Err(OrchestratorError::UnknownCapability(task.capability.clone()));
            }
        }

        let total = tasks.len();
        info!(
            tasks = total,
            max_workers = self.config.max_workers,
            task_timeout_ms = self.config.task_timeout_ms,
            batch_timeout_ms = self.config.batch_timeout_ms,
            "Starting batch execution"
        );

        // High priority tasks reach the pool first; submission order is kept
        // within a priority class.
        let mut ordered = tasks;
        ordered.sort_by_key(|t| t.priority.rank());

        let started = tokio::time::Instant::now();
        let deadline = started + self.config.batch_budget();
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let cancel = CancellationToken::new();
        let (tx, mut rx) = mpsc::channel::<TaskResult>(total);

        for task in ordered.iter().cloned() {
            let runner = self.runner.clone();
            let semaphore = semaphore.clone();
            let cancel = cancel.clone();
            let tx = tx.clone();
            let budget = self.config.task_budget();

            tokio::spawn(async move {
                let _permit = tokio::select! {
                    _ = cancel.cancelled() => return,
                    permit = semaphore.acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => return,
                    },
                };

                tokio::select! {
                    _ = cancel.cancelled() => {}
                    result = runner.run(&task, budget) => {
                        // Channel is closed once the batch has returned; a
                        // late result from an abandoned worker is discarded.
                        let _ = tx.send(result).await;
                    }
                }
            });
        }
        drop(tx);

        let mut results: HashMap<TaskId, TaskResult> = HashMap::with_capacity(total);
        while results.len() < total {
            match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(Some(result)) => {
                    results.insert(result.task_id.clone(), result);
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        settled = results.len(),
                        outstanding = total - results.len(),
                        "Batch deadline reached, abandoning outstanding tasks"
                    );
                    cancel.cancel();
                    break;
                }
            }
        }
        drop(rx);

        let elapsed_ms = started.elapsed().as_millis() as u64;
        for task in &ordered {
            if !results.contains_key(&task.id) {
                results.insert(
                    task.id.clone(),
                    TaskResult::timeout(task, TimeoutScope::Batch, elapsed_ms),
                );
            }
        }

        let successful = results.values().filter(|r| r.is_success()).count();
        let timed_out = results.values().filter(|r| r.outcome.is_timeout()).count();
        info!(
            total,
            successful,
            failed = total - successful - timed_out,
            timed_out,
            elapsed_ms,
            "Batch settled"
        );

        Ok(results)
    }
}
