//! Diagnostic orchestration: inspect the graph, decide what work remains.
//!
//! Two-tier policy. A rule-based pre-check guarantees structural completeness
//! (descriptions and at least one resource everywhere) before spending any
//! advisory call; only once that holds does the orchestrator fan out to the
//! advisor: one global coverage judgment plus one per-node resource
//! judgment for every node not yet flagged sufficient, all concurrent and
//! joined before aggregation.

use futures_util::future::join_all;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::instrument;

use crate::advisor::{Advisor, AdvisorError, NodeSufficiency, with_deadline};
use crate::config::{EngineConfig, LearnerProfile};
use crate::curriculum::{CurriculumGraph, NodeId, TaskKind};

/// Outcome of one diagnostic pass.
#[derive(Clone, Debug, Default)]
pub struct Diagnosis {
    pub tasks: FxHashSet<TaskKind>,
    /// Existing node ids judged to need supplementation.
    pub missing_concepts: Vec<NodeId>,
    /// Nodes whose resources were judged insufficient.
    pub insufficient_resource_ids: Vec<NodeId>,
    /// Nodes that still lack a description (rule tier only).
    pub needs_description_ids: Vec<NodeId>,
    pub keyword_reasoning: String,
    pub resource_reasoning: String,
}

impl Diagnosis {
    /// True when the only remaining work is composition.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.tasks.is_empty() || self.tasks.contains(&TaskKind::Compose)
    }
}

/// Diagnose the current graph and update per-node sufficiency state.
///
/// Side effects on success: every checked node's `resource_sufficient` flag
/// reflects its verdict, and `resource_reasons` carries the per-node
/// reasoning (used by discovery as a search direction).
///
/// Advisor timeouts and malformed output degrade to neutral verdicts; only
/// [`AdvisorError::Unavailable`] propagates.
#[instrument(skip_all, fields(nodes = graph.nodes.len()))]
pub async fn diagnose(
    graph: &mut CurriculumGraph,
    advisor: &dyn Advisor,
    learner: &LearnerProfile,
    config: &EngineConfig,
    resource_reasons: &mut FxHashMap<NodeId, String>,
) -> Result<Diagnosis, AdvisorError> {
    // Tier 1: structural pre-check, no advisory spend.
    let needs_description: Vec<NodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.missing_description())
        .map(|n| n.id.clone())
        .collect();
    let zero_resources: Vec<NodeId> = graph
        .nodes
        .iter()
        .filter(|n| n.resources.is_empty())
        .map(|n| n.id.clone())
        .collect();

    if !needs_description.is_empty() || !zero_resources.is_empty() {
        let mut tasks = FxHashSet::default();
        if !needs_description.is_empty() {
            tasks.insert(TaskKind::GenerateDescription);
        }
        if !zero_resources.is_empty() {
            tasks.insert(TaskKind::SearchResources);
        }
        tracing::debug!(
            missing_descriptions = needs_description.len(),
            empty_nodes = zero_resources.len(),
            "rule tier fired, advisor not consulted"
        );
        return Ok(Diagnosis {
            tasks,
            missing_concepts: Vec::new(),
            insufficient_resource_ids: zero_resources,
            needs_description_ids: needs_description,
            keyword_reasoning: "rule tier: structural gaps detected before advisory check".into(),
            resource_reasoning: "rule tier: nodes with missing descriptions or resources".into(),
        });
    }

    // Tier 2: advisory fan-out, global coverage plus one judgment per
    // not-yet-sufficient node, joined before aggregation.
    let to_check: Vec<NodeId> = graph
        .nodes
        .iter()
        .filter(|n| !n.resource_sufficient)
        .map(|n| n.id.clone())
        .collect();

    let global_call = with_deadline(
        config.advisor_timeout,
        advisor.judge_global_sufficiency(graph, learner),
    );
    let node_calls = join_all(to_check.iter().map(|id| {
        let node = graph.node(id).expect("checked ids come from this graph");
        with_deadline(
            config.advisor_timeout,
            advisor.judge_node_sufficiency(node, learner),
        )
    }));
    let (global_result, node_results) = tokio::join!(global_call, node_calls);

    let global = settle(global_result, "global sufficiency")?;
    let mut verdicts: Vec<(NodeId, NodeSufficiency)> = Vec::with_capacity(to_check.len());
    for (id, result) in to_check.iter().zip(node_results) {
        verdicts.push((id.clone(), settle(result, "node sufficiency")?));
    }

    // Hallucination defense: only ids that exist may request supplementation.
    let known = graph.node_ids();
    let missing_concepts: Vec<NodeId> = global
        .missing_node_ids
        .iter()
        .filter(|id| known.contains(*id))
        .cloned()
        .collect();
    let dropped = global.missing_node_ids.len() - missing_concepts.len();
    if dropped > 0 {
        tracing::warn!(dropped, "ignored unknown node ids in global verdict");
    }

    // Apply per-node verdicts before returning.
    let mut insufficient: Vec<NodeId> = Vec::new();
    let mut reason_fragments: Vec<String> = Vec::new();
    for (id, verdict) in &verdicts {
        if let Some(node) = graph.node_mut(id) {
            node.resource_sufficient = verdict.sufficient;
            if !verdict.sufficient {
                insufficient.push(id.clone());
                reason_fragments.push(format!("[{}]: {}", node.label, verdict.reasoning));
            }
        }
        resource_reasons.insert(id.clone(), verdict.reasoning.clone());
    }

    let mut tasks = FxHashSet::default();
    if !missing_concepts.is_empty() {
        tasks.insert(TaskKind::ExpandConcepts);
    }
    if !insufficient.is_empty() {
        tasks.insert(TaskKind::SearchResources);
    }
    if tasks.is_empty() {
        tasks.insert(TaskKind::Compose);
    }

    let resource_reasoning = if reason_fragments.is_empty() {
        "All resources are sufficient.".to_string()
    } else {
        reason_fragments.join(" | ")
    };

    Ok(Diagnosis {
        tasks,
        missing_concepts,
        insufficient_resource_ids: insufficient,
        needs_description_ids: Vec::new(),
        keyword_reasoning: global.reasoning,
        resource_reasoning,
    })
}

/// Collapse advisor failures to the neutral default, letting only
/// unavailability through.
fn settle<T: Default>(result: Result<T, AdvisorError>, what: &str) -> Result<T, AdvisorError> {
    match result {
        Ok(value) => Ok(value),
        Err(error) if error.is_unavailable() => Err(error),
        Err(error) => {
            tracing::warn!(%error, what, "advisor judgment degraded to neutral default");
            Ok(T::default())
        }
    }
}
