//! Expansion specialist: grow the concept set where coverage fell short.

use rustc_hash::FxHashSet;
use std::sync::Arc;
use tracing::instrument;

use crate::advisor::{Advisor, ProposedConcept, with_deadline};
use crate::config::EngineConfig;
use crate::curriculum::{CurriculumGraph, Edge, NodeId};
use crate::specialists::{SpecialistError, SpecialistOutput};

/// Validated expansion material: genuinely new concepts and edges only.
///
/// Proposal ids are provisional; the engine re-keys them into canonical ids
/// and remaps the edges when it materializes the delta.
#[derive(Clone, Debug, Default)]
pub struct ExpansionOutcome {
    pub proposals: Vec<ProposedConcept>,
    pub edges: Vec<Edge>,
}

pub struct ExpansionSpecialist {
    advisor: Arc<dyn Advisor>,
    config: EngineConfig,
}

impl ExpansionSpecialist {
    #[must_use]
    pub fn new(advisor: Arc<dyn Advisor>, config: EngineConfig) -> Self {
        Self { advisor, config }
    }

    /// Ask the advisor for supplementary concepts around the surviving
    /// missing-concept ids, keeping only additions the snapshot does not
    /// already contain.
    #[instrument(skip_all, fields(round, missing = missing.len()))]
    pub async fn run(
        &self,
        snapshot: &CurriculumGraph,
        missing: &[NodeId],
        reasoning: &str,
        round: u32,
    ) -> Result<SpecialistOutput, SpecialistError> {
        let expanded = match with_deadline(
            self.config.advisor_timeout,
            self.advisor.expand_concepts(snapshot, missing, reasoning),
        )
        .await
        {
            Ok(expanded) => expanded,
            Err(error) if error.is_unavailable() => {
                return Err(SpecialistError::Advisor(error));
            }
            Err(error) => {
                tracing::warn!(%error, round, "concept expansion skipped this round");
                return Ok(SpecialistOutput::Expanded(ExpansionOutcome::default()));
            }
        };

        let known = snapshot.node_ids();
        let mut proposed_ids: FxHashSet<String> = FxHashSet::default();
        let mut proposals: Vec<ProposedConcept> = Vec::new();
        for proposal in expanded.nodes {
            if proposal.id.trim().is_empty() || proposal.label.trim().is_empty() {
                tracing::warn!("dropping malformed expansion proposal");
                continue;
            }
            if known.contains(&proposal.id) || !proposed_ids.insert(proposal.id.clone()) {
                continue;
            }
            proposals.push(proposal);
        }

        // Keep edges that reference known material and add a new pair. Edges
        // between two unknown endpoints are hallucinated context and dropped.
        let mut edges: Vec<Edge> = Vec::new();
        let mut pairs: FxHashSet<(String, String)> =
            snapshot.edges.iter().map(Edge::pair_key).collect();
        for edge in expanded.edges {
            if edge.start.trim().is_empty() || edge.end.trim().is_empty() {
                continue;
            }
            let endpoint_known = |id: &str| {
                known.contains(id) || proposed_ids.contains(id) || id == snapshot.meta.subject_id
            };
            if !endpoint_known(&edge.start) || !endpoint_known(&edge.end) {
                continue;
            }
            if pairs.insert(edge.pair_key()) {
                edges.push(edge);
            }
        }

        tracing::debug!(
            round,
            proposals = proposals.len(),
            edges = edges.len(),
            "expansion material validated"
        );
        Ok(SpecialistOutput::Expanded(ExpansionOutcome { proposals, edges }))
    }
}
