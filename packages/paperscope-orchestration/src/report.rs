use crate::error::{OrchestratorError, Result};
use crate::task::{Priority, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Assessment facet a finding belongs to. Drives both synthesis (which
/// output list a finding feeds) and the level-1 summary grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    Contribution,
    Strength,
    Limitation,
    FutureDirection,
    Observation,
}

impl FindingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCategory::Contribution => "contribution",
            FindingCategory::Strength => "strength",
            FindingCategory::Limitation => "limitation",
            FindingCategory::FutureDirection => "future_direction",
            FindingCategory::Observation => "observation",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "contribution" => Ok(FindingCategory::Contribution),
            "strength" => Ok(FindingCategory::Strength),
            "limitation" => Ok(FindingCategory::Limitation),
            "future_direction" => Ok(FindingCategory::FutureDirection),
            "observation" => Ok(FindingCategory::Observation),
            _ => Err(OrchestratorError::parse(format!(
                "Invalid finding category: {}",
                s
            ))),
        }
    }

    pub fn all() -> [FindingCategory; 5] {
        [
            FindingCategory::Contribution,
            FindingCategory::Strength,
            FindingCategory::Limitation,
            FindingCategory::FutureDirection,
            FindingCategory::Observation,
        ]
    }
}

impl std::fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aspect scores reported by one agent, each on a 0-10 scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AspectScores {
    pub quality: f64,
    pub novelty: f64,
    pub impact: f64,
    pub rigor: f64,
}

impl AspectScores {
    fn in_range(v: f64) -> bool {
        (0.0..=10.0).contains(&v) && v.is_finite()
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("quality", self.quality),
            ("novelty", self.novelty),
            ("impact", self.impact),
            ("rigor", self.rigor),
        ] {
            if !Self::in_range(value) {
                return Err(OrchestratorError::parse(format!(
                    "Score {} out of range 0-10: {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A single finding as it appears inside an agent's structured payload,
/// before the store stamps identity and timing onto it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportedFinding {
    pub category: FindingCategory,
    pub content: String,
    /// Capability names this finding is flagged as relevant to
    #[serde(default)]
    pub relevant_to: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
}

impl ReportedFinding {
    pub fn new(category: FindingCategory, content: impl Into<String>) -> Self {
        Self {
            category,
            content: content.into(),
            relevant_to: Vec::new(),
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn relevant_to(mut self, capability: impl Into<String>) -> Self {
        self.relevant_to.push(capability.into());
        self
    }
}

/// Validated structured payload of a successful task.
///
/// Parsed from the opaque JSON value a capability handler returns; parse or
/// validation failure downgrades the task to a Failure while the raw text
/// is preserved for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    /// One-paragraph summary of what the agent concluded
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub findings: Vec<ReportedFinding>,
    /// Aspect scores; absent when the capability does not score
    #[serde(default)]
    pub assessment: Option<AspectScores>,
}

impl AgentReport {
    /// Parse and validate an opaque payload value into a report
    pub fn from_payload(payload: &serde_json::Value) -> Result<Self> {
        let report: AgentReport = serde_json::from_value(payload.clone())
            .map_err(OrchestratorError::serialization)?;
        report.validate()?;
        Ok(report)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(scores) = &self.assessment {
            scores.validate()?;
        }
        for finding in &self.findings {
            if finding.content.trim().is_empty() {
                return Err(OrchestratorError::parse(format!(
                    "Empty finding content in category {}",
                    finding.category
                )));
            }
        }
        Ok(())
    }
}

/// A discrete piece of extracted information attributed to one task.
///
/// Appended once by the context store, never mutated during a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: Uuid,
    pub origin_task_id: TaskId,
    pub category: FindingCategory,
    pub content: String,
    pub relevant_to: Vec<String>,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl Finding {
    pub fn from_reported(origin_task_id: &str, reported: &ReportedFinding) -> Self {
        Self {
            id: Uuid::new_v4(),
            origin_task_id: origin_task_id.to_string(),
            category: reported.category,
            content: reported.content.clone(),
            relevant_to: reported.relevant_to.clone(),
            priority: reported.priority,
            created_at: Utc::now(),
        }
    }

    pub fn is_relevant_to(&self, capability: &str) -> bool {
        self.relevant_to.iter().any(|c| c == capability)
    }
}
