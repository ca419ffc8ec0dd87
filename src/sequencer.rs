//! Root sequencing: order the graph's entry nodes for presentation.
//!
//! Roots are the node ids that never appear as an edge's `end`. The advisor
//! proposes an ordering; whatever comes back is reconciled against the root
//! set so the written `root_order` is always a permutation of it. Validation
//! problems are corrected silently, never surfaced to the caller.

use crate::advisor::{Advisor, with_deadline};
use crate::config::{EngineConfig, LearnerProfile};
use crate::curriculum::{CurriculumGraph, NodeId};
use rustc_hash::FxHashSet;

/// Node ids that never appear as an edge `end`, in node order.
#[must_use]
pub fn root_ids(graph: &CurriculumGraph) -> Vec<NodeId> {
    let targets: FxHashSet<&str> = graph.edges.iter().map(|e| e.end.as_str()).collect();
    graph
        .nodes
        .iter()
        .filter(|n| !targets.contains(n.id.as_str()))
        .map(|n| n.id.clone())
        .collect()
}

/// Reconcile a proposed ordering against the actual root set.
///
/// Keeps proposed ids that are members of the root set, in their proposed
/// relative order, deduplicating repeats; then appends any root ids absent
/// from the proposal, in their original relative order. The result is always
/// a permutation of `original`.
///
/// ```
/// use studyweave::sequencer::reconcile_order;
///
/// let roots = vec!["a".to_string(), "b".to_string(), "c".to_string()];
/// let proposed = vec!["c".to_string(), "x".to_string(), "c".to_string(), "a".to_string()];
/// assert_eq!(reconcile_order(&roots, &proposed), vec!["c", "a", "b"]);
/// ```
#[must_use]
pub fn reconcile_order(original: &[NodeId], proposed: &[NodeId]) -> Vec<NodeId> {
    let members: FxHashSet<&str> = original.iter().map(String::as_str).collect();
    let mut seen: FxHashSet<&str> = FxHashSet::default();
    let mut corrected: Vec<NodeId> = Vec::with_capacity(original.len());

    for id in proposed {
        if members.contains(id.as_str()) && seen.insert(id.as_str()) {
            corrected.push(id.clone());
        }
    }
    for id in original {
        if !seen.contains(id.as_str()) {
            corrected.push(id.clone());
            seen.insert(id.as_str());
        }
    }
    corrected
}

/// Order the graph's roots via the advisor and write the corrected sequence
/// to `root_order`.
///
/// Advisor failures of any flavor degrade to the roots' original order; a
/// flaky ordering judgment never blocks completion.
pub async fn sequence_roots(
    graph: &mut CurriculumGraph,
    advisor: &dyn Advisor,
    learner: &LearnerProfile,
    config: &EngineConfig,
) {
    let roots = root_ids(graph);
    if roots.is_empty() {
        graph.root_order = Vec::new();
        return;
    }

    let proposed = match with_deadline(
        config.advisor_timeout,
        advisor.order_roots(&roots, graph, learner),
    )
    .await
    {
        Ok(sequence) => sequence,
        Err(error) => {
            tracing::warn!(%error, "root ordering degraded to original order");
            Vec::new()
        }
    };

    let corrected = reconcile_order(&roots, &proposed);
    if corrected != proposed {
        tracing::debug!(
            proposed = proposed.len(),
            corrected = corrected.len(),
            "root ordering self-healed"
        );
    }
    graph.root_order = corrected;
}
