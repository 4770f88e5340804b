use crate::capability::CapabilityRegistry;
use crate::report::AgentReport;
use crate::task::{Task, TaskResult, TimeoutScope};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Executes one task against its capability handler and settles it into a
/// [`TaskResult`], whatever happens.
///
/// `run` is total: handler errors, malformed payloads, panics and budget
/// overruns all come back as results, never as `Err`. On a budget overrun the
/// in-flight call is abandoned, not killed; it keeps running detached and its
/// eventual output is discarded.
pub struct TaskRunner {
    registry: Arc<CapabilityRegistry>,
}

impl TaskRunner {
    pub fn new(registry: Arc<CapabilityRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Run a single task with a per-task execution budget
    pub async fn run(&self, task: &Task, budget: Duration) -> TaskResult {
        info!(task_id = %task.id, capability = %task.capability, "Executing task");
        let started = tokio::time::Instant::now();

        let handler = match self.registry.get(&task.capability) {
            Some(handler) => handler,
            None => {
                // The executor rejects unknown capabilities up front; this
                // arm only fires when a runner is driven directly.
                error!(task_id = %task.id, capability = %task.capability, "No handler registered");
                return TaskResult::failure(
                    task,
                    format!("No handler registered for capability '{}'", task.capability),
                    None,
                    started.elapsed().as_millis() as u64,
                    0,
                );
            }
        };

        let input = task.input.clone();
        let handle = tokio::spawn(async move { handler.execute(&input).await });

        // Dropping the JoinHandle on elapse detaches the call instead of
        // aborting it.
        match tokio::time::timeout(budget, handle).await {
            Ok(Ok(Ok(response))) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                match AgentReport::from_payload(&response.payload) {
                    Ok(report) => {
                        info!(
                            task_id = %task.id,
                            elapsed_ms,
                            findings = report.findings.len(),
                            "Task succeeded"
                        );
                        TaskResult::success(
                            task,
                            report,
                            response.raw_output,
                            elapsed_ms,
                            response.tokens_used,
                        )
                    }
                    Err(e) => {
                        warn!(task_id = %task.id, error = %e, "Malformed agent payload");
                        TaskResult::failure(
                            task,
                            format!("Malformed agent payload: {}", e),
                            Some(response.raw_output),
                            elapsed_ms,
                            response.tokens_used,
                        )
                    }
                }
            }
            Ok(Ok(Err(e))) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(task_id = %task.id, error = %e, "Task failed");
                TaskResult::failure(task, format!("{:#}", e), None, elapsed_ms, 0)
            }
            Ok(Err(join_err)) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                let detail = if join_err.is_panic() {
                    format!("Handler panicked: {}", panic_message(join_err.into_panic()))
                } else {
                    format!("Handler cancelled: {}", join_err)
                };
                error!(task_id = %task.id, detail = %detail, "Task aborted");
                TaskResult::failure(task, detail, None, elapsed_ms, 0)
            }
            Err(_) => {
                let elapsed_ms = started.elapsed().as_millis() as u64;
                warn!(
                    task_id = %task.id,
                    budget_ms = budget.as_millis() as u64,
                    "Task exceeded its budget, abandoning"
                );
                TaskResult::timeout(task, TimeoutScope::PerTask, elapsed_ms)
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
