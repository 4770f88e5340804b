//! Progressive summary hierarchy derived from an [`AnalysisRun`].
//!
//! Level 1 is the most detailed (one node per finding category seen); each
//! higher level condenses the entire level below into a single node with
//! strictly less detail. The hierarchy is validated when built, not when
//! read.

use crate::condense::TextCondenser;
use crate::error::{OrchestratorError, Result};
use crate::report::FindingCategory;
use crate::synthesis::AnalysisRun;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

/// Character budget for level-1 nodes; halves per level above, floored
const LEVEL1_BUDGET: usize = 480;
const MIN_BUDGET: usize = 60;

fn level_budget(level: u32) -> usize {
    let halvings = level.saturating_sub(1).min(31);
    (LEVEL1_BUDGET >> halvings).max(MIN_BUDGET)
}

/// One node in the summary hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryNode {
    pub id: Uuid,
    /// 1 = most detailed; larger = more condensed
    pub level: u32,
    /// Category name for level-1 nodes, absent for condensed levels
    pub section_name: Option<String>,
    pub content: String,
    pub parent_id: Option<Uuid>,
}

impl SummaryNode {
    pub fn new(level: u32, section_name: Option<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            section_name,
            content: content.into(),
            parent_id: None,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Validated forest of summary nodes.
///
/// Construction rejects dangling or same-or-lower-level parents. Because
/// every edge must strictly increase the level, cycles cannot pass
/// validation either.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryForest {
    nodes: Vec<SummaryNode>,
}

impl SummaryForest {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<SummaryNode>) -> Result<Self> {
        let mut levels: HashMap<Uuid, u32> = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            if levels.insert(node.id, node.level).is_some() {
                return Err(OrchestratorError::HierarchyViolation(format!(
                    "Duplicate summary node id {}",
                    node.id
                )));
            }
        }

        for node in &nodes {
            if let Some(parent_id) = node.parent_id {
                let parent_level = levels.get(&parent_id).ok_or_else(|| {
                    OrchestratorError::HierarchyViolation(format!(
                        "Node {} references missing parent {}",
                        node.id, parent_id
                    ))
                })?;
                if *parent_level <= node.level {
                    return Err(OrchestratorError::HierarchyViolation(format!(
                        "Node {} at level {} has parent at level {}, parent must be more condensed",
                        node.id, node.level, parent_level
                    )));
                }
            }
        }

        Ok(Self { nodes })
    }

    pub fn nodes(&self) -> &[SummaryNode] {
        &self.nodes
    }

    pub fn node(&self, id: Uuid) -> Option<&SummaryNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn roots(&self) -> Vec<&SummaryNode> {
        self.nodes.iter().filter(|n| n.is_root()).collect()
    }

    pub fn children_of(&self, id: Uuid) -> Vec<&SummaryNode> {
        self.nodes
            .iter()
            .filter(|n| n.parent_id == Some(id))
            .collect()
    }

    pub fn at_level(&self, level: u32) -> Vec<&SummaryNode> {
        self.nodes.iter().filter(|n| n.level == level).collect()
    }

    pub fn max_level(&self) -> u32 {
        self.nodes.iter().map(|n| n.level).max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Builds the summary hierarchy bottom-up from a synthesized run
pub struct ProgressiveSummarizer {
    condenser: TextCondenser,
}

impl ProgressiveSummarizer {
    pub fn new() -> Self {
        Self {
            condenser: TextCondenser::new(),
        }
    }

    /// Derive a forest with the requested number of levels. `levels == 1`
    /// yields the per-category roots only; zero yields an empty forest.
    pub fn summarize(&self, run: &AnalysisRun, levels: u32) -> Result<SummaryForest> {
        if levels == 0 {
            return Ok(SummaryForest::empty());
        }

        let mut nodes: Vec<SummaryNode> = Vec::new();
        for category in FindingCategory::all() {
            let contents: Vec<String> = run
                .findings_in(category)
                .iter()
                .map(|f| f.content.trim().trim_end_matches('.').to_string())
                .filter(|c| !c.is_empty())
                .collect();
            if contents.is_empty() {
                continue;
            }
            let condensed = self
                .condenser
                .condense(&contents.join(". "), level_budget(1));
            nodes.push(SummaryNode::new(
                1,
                Some(category.as_str().to_string()),
                condensed,
            ));
        }

        // A run with no findings still summarizes to its own account of
        // what happened.
        if nodes.is_empty() {
            nodes.push(SummaryNode::new(
                1,
                None,
                self.condenser
                    .condense(&run.executive_summary, level_budget(1)),
            ));
        }

        let mut frontier: Vec<usize> = (0..nodes.len()).collect();
        for level in 2..=levels {
            let combined = frontier
                .iter()
                .map(|&i| nodes[i].content.clone())
                .collect::<Vec<_>>()
                .join(". ");
            let condensed = self.condenser.condense(&combined, level_budget(level));
            let parent = SummaryNode::new(level, None, condensed);
            let parent_id = parent.id;
            for &i in &frontier {
                nodes[i].parent_id = Some(parent_id);
            }
            nodes.push(parent);
            frontier = vec![nodes.len() - 1];
        }

        debug!(
            document_id = %run.document_id,
            nodes = nodes.len(),
            levels,
            "Built summary forest"
        );
        SummaryForest::from_nodes(nodes)
    }
}

impl Default for ProgressiveSummarizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{Finding, ReportedFinding};
    use crate::synthesis::{OverallAssessment, RunMetrics};
    use crate::task::Priority;
    use chrono::Utc;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn run_with_findings(findings: Vec<Finding>) -> AnalysisRun {
        AnalysisRun {
            batch_id: Uuid::new_v4(),
            document_id: "paper-1".to_string(),
            created_at: Utc::now(),
            results: HashMap::new(),
            findings,
            assessment: OverallAssessment::unrated(),
            executive_summary: "No analysis agent succeeded for \"paper-1\": 2 failed, \
                                1 timed out of 3 tasks."
                .to_string(),
            contributions: vec![],
            strengths: vec![],
            limitations: vec![],
            future_directions: vec![],
            metrics: RunMetrics::default(),
        }
    }

    fn finding(category: FindingCategory, content: &str) -> Finding {
        Finding::from_reported(
            "t1",
            &ReportedFinding::new(category, content).with_priority(Priority::Medium),
        )
    }

    #[test]
    fn test_level_budget_decreases_then_floors() {
        assert_eq!(level_budget(1), 480);
        assert_eq!(level_budget(2), 240);
        assert_eq!(level_budget(3), 120);
        assert_eq!(level_budget(4), 60);
        assert_eq!(level_budget(5), 60);
    }

    #[test]
    fn test_from_nodes_accepts_valid_forest() {
        let parent = SummaryNode::new(2, None, "condensed");
        let child_a = SummaryNode::new(1, Some("strength".into()), "detail a").with_parent(parent.id);
        let child_b = SummaryNode::new(1, Some("limitation".into()), "detail b").with_parent(parent.id);
        let parent_id = parent.id;

        let forest = SummaryForest::from_nodes(vec![child_a, child_b, parent]).unwrap();
        assert_eq!(forest.len(), 3);
        assert_eq!(forest.roots().len(), 1);
        assert_eq!(forest.children_of(parent_id).len(), 2);
        assert_eq!(forest.max_level(), 2);
    }

    #[test]
    fn test_from_nodes_rejects_missing_parent() {
        let orphan = SummaryNode::new(1, None, "x").with_parent(Uuid::new_v4());
        let err = SummaryForest::from_nodes(vec![orphan]).unwrap_err();
        assert!(matches!(err, OrchestratorError::HierarchyViolation(_)));
    }

    #[test]
    fn test_from_nodes_rejects_parent_at_same_or_lower_level() {
        let a = SummaryNode::new(2, None, "a");
        let same = SummaryNode::new(2, None, "b").with_parent(a.id);
        assert!(SummaryForest::from_nodes(vec![a.clone(), same]).is_err());

        let lower = SummaryNode::new(3, None, "c").with_parent(a.id);
        assert!(SummaryForest::from_nodes(vec![a, lower]).is_err());
    }

    #[test]
    fn test_from_nodes_rejects_self_parent() {
        let mut node = SummaryNode::new(1, None, "x");
        node.parent_id = Some(node.id);
        assert!(SummaryForest::from_nodes(vec![node]).is_err());
    }

    #[test]
    fn test_from_nodes_rejects_duplicate_ids() {
        let node = SummaryNode::new(1, None, "x");
        let twin = node.clone();
        assert!(SummaryForest::from_nodes(vec![node, twin]).is_err());
    }

    #[test]
    fn test_summarize_single_level_is_per_category() {
        let run = run_with_findings(vec![
            finding(FindingCategory::Strength, "Thorough ablation study"),
            finding(FindingCategory::Strength, "Strong baselines"),
            finding(FindingCategory::Limitation, "Single dataset"),
        ]);
        let forest = ProgressiveSummarizer::new().summarize(&run, 1).unwrap();

        assert_eq!(forest.len(), 2);
        assert!(forest.nodes().iter().all(|n| n.level == 1 && n.is_root()));
        let sections: Vec<&str> = forest
            .nodes()
            .iter()
            .filter_map(|n| n.section_name.as_deref())
            .collect();
        assert!(sections.contains(&"strength"));
        assert!(sections.contains(&"limitation"));
    }

    #[test]
    fn test_summarize_condenses_upward() {
        let long = "The evaluation spans three benchmarks with consistent gains. \
                    Ablations isolate each architectural component separately. \
                    Error analysis covers the failure modes in detail. \
                    Runtime comparisons include memory footprint measurements. \
                    The appendix reproduces every hyperparameter setting used. \
                    Statistical significance is reported for all headline numbers.";
        let run = run_with_findings(vec![
            finding(FindingCategory::Strength, long),
            finding(FindingCategory::Limitation, long),
        ]);
        let forest = ProgressiveSummarizer::new().summarize(&run, 3).unwrap();

        assert_eq!(forest.max_level(), 3);
        assert_eq!(forest.roots().len(), 1);
        let root = forest.roots()[0];
        assert_eq!(root.level, 3);
        assert!(root.section_name.is_none());

        // Two level-1 nodes hang off the single level-2 node
        let mid = forest.at_level(2);
        assert_eq!(mid.len(), 1);
        assert_eq!(forest.children_of(mid[0].id).len(), 2);
        assert_eq!(forest.children_of(root.id), vec![mid[0]]);

        // Detail strictly shrinks as levels rise
        let level1_chars: usize = forest
            .at_level(1)
            .iter()
            .map(|n| n.content.chars().count())
            .sum();
        assert!(mid[0].content.chars().count() < level1_chars);
        assert!(root.content.chars().count() < mid[0].content.chars().count());
        assert!(root.content.chars().count() <= level_budget(3));
    }

    #[test]
    fn test_summarize_zero_levels_is_empty() {
        let run = run_with_findings(vec![finding(FindingCategory::Strength, "x")]);
        let forest = ProgressiveSummarizer::new().summarize(&run, 0).unwrap();
        assert!(forest.is_empty());
        assert_eq!(forest.max_level(), 0);
    }

    #[test]
    fn test_summarize_without_findings_uses_run_account() {
        let run = run_with_findings(vec![]);
        let forest = ProgressiveSummarizer::new().summarize(&run, 2).unwrap();

        let level1 = forest.at_level(1);
        assert_eq!(level1.len(), 1);
        assert!(level1[0].section_name.is_none());
        assert!(level1[0].content.contains("No analysis agent succeeded"));
        assert_eq!(forest.max_level(), 2);
    }

    proptest! {
        #[test]
        fn prop_summarize_forest_is_well_formed(
            contents in proptest::collection::vec("[a-zA-Z ]{30,120}", 1..8),
            category_picks in proptest::collection::vec(0usize..5, 1..8),
            levels in 1u32..=4,
        ) {
            let findings: Vec<Finding> = contents
                .iter()
                .zip(category_picks.iter().cycle())
                .map(|(content, &pick)| finding(FindingCategory::all()[pick], content))
                .collect();
            let run = run_with_findings(findings);

            let forest = ProgressiveSummarizer::new().summarize(&run, levels).unwrap();

            prop_assert!(!forest.is_empty());
            prop_assert!(forest.max_level() <= levels);
            if levels >= 2 {
                prop_assert_eq!(forest.roots().len(), 1);
            }
            for node in forest.nodes() {
                prop_assert!(node.content.chars().count() <= level_budget(node.level));
                if let Some(parent_id) = node.parent_id {
                    let parent = forest.node(parent_id).unwrap();
                    prop_assert!(parent.level > node.level);
                }
            }
        }

        #[test]
        fn prop_forest_rejects_level_inversions(
            child_level in 2u32..10,
        ) {
            let parent = SummaryNode::new(child_level - 1, None, "p");
            let child = SummaryNode::new(child_level, None, "c").with_parent(parent.id);
            prop_assert!(SummaryForest::from_nodes(vec![parent, child]).is_err());
        }
    }
}
