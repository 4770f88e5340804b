use crate::condense::TextCondenser;
use crate::report::{AspectScores, Finding, FindingCategory};
use crate::task::{TaskId, TaskResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

/// Character budget for the composed executive summary
const SUMMARY_BUDGET: usize = 600;
/// Word-overlap ratio above which two findings count as the same point
const DEDUP_THRESHOLD: f32 = 0.7;

/// Aggregated rating for one assessment facet. `Unrated` is an explicit
/// marker, not an absent field: a zero-success batch still serializes a
/// complete assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Rating {
    Unrated,
    Rated { score: f64, votes: usize },
}

impl Rating {
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Rating::Unrated;
        }
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        Rating::Rated {
            score: (mean * 10.0).round() / 10.0,
            votes: scores.len(),
        }
    }

    pub fn score(&self) -> Option<f64> {
        match self {
            Rating::Unrated => None,
            Rating::Rated { score, .. } => Some(*score),
        }
    }

    pub fn is_rated(&self) -> bool {
        matches!(self, Rating::Rated { .. })
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating::Unrated
    }
}

/// Facet ratings aggregated across every agent that scored the document
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct OverallAssessment {
    pub quality: Rating,
    pub novelty: Rating,
    pub impact: Rating,
    pub rigor: Rating,
}

impl OverallAssessment {
    pub fn unrated() -> Self {
        Self::default()
    }

    pub fn from_scores(scores: &[AspectScores]) -> Self {
        Self {
            quality: Rating::from_scores(&scores.iter().map(|s| s.quality).collect::<Vec<_>>()),
            novelty: Rating::from_scores(&scores.iter().map(|s| s.novelty).collect::<Vec<_>>()),
            impact: Rating::from_scores(&scores.iter().map(|s| s.impact).collect::<Vec<_>>()),
            rigor: Rating::from_scores(&scores.iter().map(|s| s.rigor).collect::<Vec<_>>()),
        }
    }
}

/// Execution accounting for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunMetrics {
    pub elapsed_ms: u64,
    pub total_tokens: u64,
    pub successful_count: usize,
    pub failed_count: usize,
    pub timed_out_count: usize,
    pub total_count: usize,
}

impl RunMetrics {
    pub fn from_results(results: &HashMap<TaskId, TaskResult>, elapsed_ms: u64) -> Self {
        let mut metrics = Self {
            elapsed_ms,
            total_count: results.len(),
            ..Self::default()
        };
        for result in results.values() {
            metrics.total_tokens += result.tokens_used;
            match &result.outcome {
                crate::task::TaskOutcome::Success { .. } => metrics.successful_count += 1,
                crate::task::TaskOutcome::Failure { .. } => metrics.failed_count += 1,
                crate::task::TaskOutcome::Timeout { .. } => metrics.timed_out_count += 1,
            }
        }
        metrics
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        self.successful_count as f64 / self.total_count as f64
    }

    /// Acceptance thresholds are the caller's policy; this is just the check
    pub fn meets_threshold(&self, min_successful: usize) -> bool {
        self.successful_count >= min_successful
    }
}

/// The single coherent assessment produced from one batch, however much of
/// the batch actually succeeded. Immutable once synthesized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRun {
    pub batch_id: Uuid,
    pub document_id: String,
    pub created_at: DateTime<Utc>,
    pub results: HashMap<TaskId, TaskResult>,
    pub findings: Vec<Finding>,
    pub assessment: OverallAssessment,
    pub executive_summary: String,
    pub contributions: Vec<String>,
    pub strengths: Vec<String>,
    pub limitations: Vec<String>,
    pub future_directions: Vec<String>,
    pub metrics: RunMetrics,
}

impl AnalysisRun {
    pub fn findings_in(&self, category: FindingCategory) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.category == category)
            .collect()
    }
}

/// Reduces a settled batch into an [`AnalysisRun`].
///
/// Never rejects: a batch with zero successes still yields a complete run
/// with unrated assessment fields and a summary that says what failed.
/// Quality degrades with fewer successes; the structure never does.
pub struct SynthesisEngine {
    condenser: TextCondenser,
}

impl SynthesisEngine {
    pub fn new() -> Self {
        Self {
            condenser: TextCondenser::new(),
        }
    }

    pub fn synthesize(
        &self,
        batch_id: Uuid,
        document_id: impl Into<String>,
        results: HashMap<TaskId, TaskResult>,
        findings: Vec<Finding>,
        elapsed_ms: u64,
    ) -> AnalysisRun {
        let document_id = document_id.into();
        let metrics = RunMetrics::from_results(&results, elapsed_ms);

        if metrics.successful_count == 0 && metrics.total_count > 0 {
            warn!(
                document_id = %document_id,
                failed = metrics.failed_count,
                timed_out = metrics.timed_out_count,
                "Synthesizing degraded run, no task succeeded"
            );
        }

        let scores: Vec<AspectScores> = sorted_results(&results)
            .iter()
            .filter_map(|r| r.report())
            .filter_map(|report| report.assessment)
            .collect();
        let assessment = OverallAssessment::from_scores(&scores);

        let contributions = self.select_list(&findings, FindingCategory::Contribution);
        let strengths = self.select_list(&findings, FindingCategory::Strength);
        let limitations = self.select_list(&findings, FindingCategory::Limitation);
        let future_directions = self.select_list(&findings, FindingCategory::FutureDirection);

        let executive_summary = self.compose_summary(&document_id, &results, &metrics);

        info!(
            document_id = %document_id,
            successful = metrics.successful_count,
            total = metrics.total_count,
            findings = findings.len(),
            "Synthesized analysis run"
        );

        AnalysisRun {
            batch_id,
            document_id,
            created_at: Utc::now(),
            results,
            findings,
            assessment,
            executive_summary,
            contributions,
            strengths,
            limitations,
            future_directions,
            metrics,
        }
    }

    /// Pick a category's findings with high priority first, then dedup
    /// near-identical points contributed by different agents
    fn select_list(&self, findings: &[Finding], category: FindingCategory) -> Vec<String> {
        let mut selected: Vec<&Finding> =
            findings.iter().filter(|f| f.category == category).collect();
        selected.sort_by_key(|f| f.priority.rank());

        let contents: Vec<String> = selected
            .iter()
            .map(|f| f.content.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        self.condenser.dedup_similar(&contents, DEDUP_THRESHOLD)
    }

    fn compose_summary(
        &self,
        document_id: &str,
        results: &HashMap<TaskId, TaskResult>,
        metrics: &RunMetrics,
    ) -> String {
        if metrics.total_count == 0 {
            return format!("No analysis tasks were submitted for \"{}\".", document_id);
        }
        if metrics.successful_count == 0 {
            return format!(
                "No analysis agent succeeded for \"{}\": {} failed, {} timed out of {} tasks. \
                 No assessment could be derived.",
                document_id, metrics.failed_count, metrics.timed_out_count, metrics.total_count
            );
        }

        let narrative: Vec<String> = sorted_results(results)
            .iter()
            .filter_map(|r| r.report())
            .map(|report| report.summary.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let condensed = self
            .condenser
            .condense(&narrative.join(" "), SUMMARY_BUDGET);

        let mut summary = if condensed.is_empty() {
            format!("Analysis of \"{}\" completed.", document_id)
        } else {
            condensed
        };
        if !summary.ends_with('.') {
            summary.push('.');
        }

        summary.push_str(&format!(
            " Synthesized from {} of {} analysis tasks.",
            metrics.successful_count, metrics.total_count
        ));
        if metrics.failed_count > 0 || metrics.timed_out_count > 0 {
            summary.push_str(&format!(
                " Not reflected here: {} failed, {} timed out.",
                metrics.failed_count, metrics.timed_out_count
            ));
        }
        summary
    }
}

impl Default for SynthesisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Results in deterministic task-id order, independent of map iteration
fn sorted_results(results: &HashMap<TaskId, TaskResult>) -> Vec<&TaskResult> {
    let mut sorted: Vec<&TaskResult> = results.values().collect();
    sorted.sort_by(|a, b| a.task_id.cmp(&b.task_id));
    sorted
}
