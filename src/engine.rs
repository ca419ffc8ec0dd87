//! The round scheduler driving the refinement loop.
//!
//! Control flow: transform → loop { diagnose → fan out specialists → barrier
//! join → merge deltas } until no work remains or the iteration cap is hit →
//! compose under the learner's budget → order the roots.
//!
//! Concurrency model: every specialist in a round receives the same immutable
//! snapshot taken at round start and returns its contribution as data. The
//! engine is the single writer of the canonical graph; it materializes each
//! contribution into a delta (minting canonical ids from its one allocator)
//! and merges them sequentially after the join. Rounds are strictly
//! sequential; within a round merge order is irrelevant because deltas
//! commute on the disjoint material specialists produce.

use futures_util::future::{BoxFuture, join_all};
use miette::Diagnostic;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use crate::advisor::{Advisor, AdvisorError};
use crate::catalog::{Catalog, CatalogError};
use crate::composer;
use crate::config::{EngineConfig, LearnerProfile};
use crate::curriculum::{ConceptNode, CurriculumGraph, Edge, GraphMeta, NodeId, Resource, TaskKind};
use crate::events::{EventEmitter, RefineEvent};
use crate::ids::IdAllocator;
use crate::merge::{GraphDelta, merge_graph};
use crate::orchestrator::{self, Diagnosis};
use crate::sequencer;
use crate::specialists::{
    DescriptionSpecialist, DiscoverySpecialist, ExpansionOutcome, ExpansionSpecialist,
    NodeCandidates, SpecialistError, SpecialistOutput,
};
use crate::transform::{RawGraph, transform};

/// Ephemeral per-run bookkeeping; lives only for the duration of the
/// refinement loop and is discarded once it exits.
#[derive(Clone, Debug, Default)]
pub struct RoundState {
    pub tasks: FxHashSet<TaskKind>,
    pub iteration_count: u32,
    /// Per-node reasoning from the latest diagnosis, handed to discovery as
    /// a search direction.
    pub resource_reasons: FxHashMap<NodeId, String>,
    pub keyword_reasoning: String,
    /// Missing-concept ids surviving the hallucination filter.
    pub missing_concepts: Vec<NodeId>,
}

/// Successful completion of a refinement run.
#[derive(Clone, Debug)]
pub struct RefineOutcome {
    pub graph: CurriculumGraph,
    /// Rounds actually executed (0 when the first diagnosis was terminal).
    pub rounds: u32,
    pub run_id: String,
}

/// A run that could not finish because a capability became unreachable.
///
/// Committed rounds are never discarded: the graph rides along exactly as it
/// stood when the failure hit.
#[derive(Debug)]
pub struct RefineAbort {
    pub graph: CurriculumGraph,
    pub rounds: u32,
    pub error: RefineError,
}

/// Unrecoverable capability failures. Everything softer (timeouts, malformed
/// judgments, single-provider errors) is absorbed earlier as a degraded
/// round.
#[derive(Debug, Error, Diagnostic)]
pub enum RefineError {
    #[error("advisor capability failed: {source}")]
    #[diagnostic(code(studyweave::engine::advisor))]
    Advisor {
        #[source]
        source: AdvisorError,
    },

    #[error("catalog capability failed: {source}")]
    #[diagnostic(code(studyweave::engine::catalog))]
    Catalog {
        #[source]
        source: CatalogError,
    },
}

impl From<SpecialistError> for RefineError {
    fn from(error: SpecialistError) -> Self {
        match error {
            SpecialistError::Advisor(source) => RefineError::Advisor { source },
            SpecialistError::Catalog(source) => RefineError::Catalog { source },
        }
    }
}

/// Drives diagnosis, specialist rounds, merging, composition, and root
/// ordering for one curriculum at a time.
pub struct RefineEngine {
    advisor: Arc<dyn Advisor>,
    catalog: Arc<dyn Catalog>,
    config: EngineConfig,
    emitter: EventEmitter,
}

impl RefineEngine {
    #[must_use]
    pub fn new(advisor: Arc<dyn Advisor>, catalog: Arc<dyn Catalog>, config: EngineConfig) -> Self {
        Self {
            advisor,
            catalog,
            config,
            emitter: EventEmitter::disabled(),
        }
    }

    /// Attach an event channel and return its receiving end. Replaces any
    /// previous subscription.
    pub fn subscribe(&mut self) -> flume::Receiver<RefineEvent> {
        let (emitter, receiver) = EventEmitter::channel();
        self.emitter = emitter;
        receiver
    }

    /// Bootstrap a raw discovered graph and refine it to completion.
    #[instrument(skip_all, fields(subject = %meta.subject_id))]
    pub async fn refine(
        &self,
        raw: RawGraph,
        meta: GraphMeta,
        learner: &LearnerProfile,
    ) -> Result<RefineOutcome, RefineAbort> {
        let mut ids = IdAllocator::new();
        let graph = transform(raw, meta, &mut ids);
        self.refine_graph(graph, ids, learner).await
    }

    /// Refine an already-canonical graph. The allocator must be the one that
    /// minted the graph's ids so fresh ids cannot collide.
    #[instrument(skip_all, fields(nodes = graph.nodes.len()))]
    pub async fn refine_graph(
        &self,
        mut graph: CurriculumGraph,
        mut ids: IdAllocator,
        learner: &LearnerProfile,
    ) -> Result<RefineOutcome, RefineAbort> {
        let run_id = Uuid::new_v4().to_string();
        self.emitter.emit(RefineEvent::RunStarted {
            run_id: run_id.clone(),
            when: chrono::Utc::now(),
        });
        tracing::info!(%run_id, nodes = graph.nodes.len(), "refinement run started");

        let description = DescriptionSpecialist::new(Arc::clone(&self.advisor), self.config.clone());
        let discovery = DiscoverySpecialist::new(
            Arc::clone(&self.advisor),
            Arc::clone(&self.catalog),
            self.config.clone(),
        );
        let expansion = ExpansionSpecialist::new(Arc::clone(&self.advisor), self.config.clone());

        let mut state = RoundState::default();
        loop {
            let diagnosis = match orchestrator::diagnose(
                &mut graph,
                self.advisor.as_ref(),
                learner,
                &self.config,
                &mut state.resource_reasons,
            )
            .await
            {
                Ok(diagnosis) => diagnosis,
                Err(source) => {
                    return Err(RefineAbort {
                        graph,
                        rounds: state.iteration_count,
                        error: RefineError::Advisor { source },
                    });
                }
            };
            self.note_diagnosis(&mut state, &diagnosis);

            if diagnosis.is_terminal() {
                tracing::info!(rounds = state.iteration_count, "diagnosis terminal");
                break;
            }

            let mut tasks = state.tasks.clone();
            tasks.remove(&TaskKind::Compose);

            if state.iteration_count >= self.config.max_iterations {
                // Critical cleanup: nodes with neither description nor
                // resources must not ship. One last pass of exactly those two
                // specialists is allowed past the cap.
                let critical = tasks.contains(&TaskKind::GenerateDescription)
                    && tasks.contains(&TaskKind::SearchResources);
                self.emitter.emit(RefineEvent::CapReached {
                    round: state.iteration_count,
                    critical_cleanup: critical,
                });
                tracing::warn!(
                    iteration = state.iteration_count,
                    critical_cleanup = critical,
                    "iteration cap reached"
                );
                if critical {
                    let cleanup: FxHashSet<TaskKind> =
                        [TaskKind::GenerateDescription, TaskKind::SearchResources]
                            .into_iter()
                            .collect();
                    if let Err(error) = self
                        .run_round(
                            &mut graph,
                            &mut ids,
                            &cleanup,
                            &state,
                            learner,
                            &description,
                            &discovery,
                            &expansion,
                        )
                        .await
                    {
                        return Err(RefineAbort {
                            graph,
                            rounds: state.iteration_count,
                            error: error.into(),
                        });
                    }
                    state.iteration_count += 1;
                }
                break;
            }

            if let Err(error) = self
                .run_round(
                    &mut graph,
                    &mut ids,
                    &tasks,
                    &state,
                    learner,
                    &description,
                    &discovery,
                    &expansion,
                )
                .await
            {
                return Err(RefineAbort {
                    graph,
                    rounds: state.iteration_count,
                    error: error.into(),
                });
            }
            state.iteration_count += 1;
        }

        let report = composer::compose(&mut graph, learner);
        self.emitter.emit(RefineEvent::Composed {
            emphasized: report.emphasized,
            preserved: report.preserved,
            deleted: report.deleted,
        });

        sequencer::sequence_roots(&mut graph, self.advisor.as_ref(), learner, &self.config).await;
        self.emitter.emit(RefineEvent::RootsOrdered {
            roots: graph.root_order.clone(),
        });

        self.emitter.emit(RefineEvent::RunCompleted {
            run_id: run_id.clone(),
            rounds: state.iteration_count,
            when: chrono::Utc::now(),
        });
        tracing::info!(%run_id, rounds = state.iteration_count, "refinement run completed");

        Ok(RefineOutcome {
            graph,
            rounds: state.iteration_count,
            run_id,
        })
    }

    fn note_diagnosis(&self, state: &mut RoundState, diagnosis: &Diagnosis) {
        state.tasks = diagnosis.tasks.clone();
        state.keyword_reasoning = diagnosis.keyword_reasoning.clone();
        state.missing_concepts = diagnosis.missing_concepts.clone();
        let mut tasks: Vec<String> = diagnosis.tasks.iter().map(ToString::to_string).collect();
        tasks.sort();
        self.emitter.emit(RefineEvent::Diagnosed {
            round: state.iteration_count + 1,
            tasks,
            keyword_reasoning: diagnosis.keyword_reasoning.clone(),
        });
    }

    /// Execute one fan-out/join round and merge every contribution.
    #[allow(clippy::too_many_arguments)]
    async fn run_round(
        &self,
        graph: &mut CurriculumGraph,
        ids: &mut IdAllocator,
        tasks: &FxHashSet<TaskKind>,
        state: &RoundState,
        learner: &LearnerProfile,
        description: &DescriptionSpecialist,
        discovery: &DiscoverySpecialist,
        expansion: &ExpansionSpecialist,
    ) -> Result<(), SpecialistError> {
        let round = state.iteration_count + 1;
        self.emitter.emit(RefineEvent::RoundStarted { round });

        let snapshot = graph.clone();
        let mut branches: Vec<BoxFuture<'_, (TaskKind, Result<SpecialistOutput, SpecialistError>)>> =
            Vec::new();

        if tasks.contains(&TaskKind::GenerateDescription) {
            let snapshot = &snapshot;
            branches.push(Box::pin(async move {
                (
                    TaskKind::GenerateDescription,
                    description.run(snapshot, round).await,
                )
            }));
        }
        if tasks.contains(&TaskKind::SearchResources) {
            let snapshot = &snapshot;
            let reasons = &state.resource_reasons;
            branches.push(Box::pin(async move {
                (
                    TaskKind::SearchResources,
                    discovery.run(snapshot, learner, reasons, round).await,
                )
            }));
        }
        if tasks.contains(&TaskKind::ExpandConcepts) {
            let snapshot = &snapshot;
            let missing = &state.missing_concepts;
            let reasoning = state.keyword_reasoning.as_str();
            branches.push(Box::pin(async move {
                (
                    TaskKind::ExpandConcepts,
                    expansion.run(snapshot, missing, reasoning, round).await,
                )
            }));
        }

        // Barrier join: every branch finishes before anything merges.
        let results = join_all(branches).await;
        for (task, result) in results {
            let output = result?;
            let delta = materialize(output, ids, &snapshot);
            let nodes_touched = delta.nodes.len();
            let edges_before = graph.edges.len();
            let resources_before = graph.resource_count();
            merge_graph(graph, delta);
            self.emitter.emit(RefineEvent::DeltaMerged {
                round,
                specialist: task.to_string(),
                nodes_touched,
                edges_added: graph.edges.len() - edges_before,
                resources_added: graph.resource_count().saturating_sub(resources_before),
            });
        }
        Ok(())
    }
}

/// Turn a specialist contribution into a mergeable delta, minting canonical
/// ids from the engine's single allocator.
fn materialize(
    output: SpecialistOutput,
    ids: &mut IdAllocator,
    snapshot: &CurriculumGraph,
) -> GraphDelta {
    match output {
        SpecialistOutput::Delta(delta) => delta,
        SpecialistOutput::Discovered(contributions) => {
            materialize_discovery(contributions, ids, snapshot)
        }
        SpecialistOutput::Expanded(outcome) => materialize_expansion(outcome, ids),
    }
}

fn materialize_discovery(
    contributions: Vec<NodeCandidates>,
    ids: &mut IdAllocator,
    snapshot: &CurriculumGraph,
) -> GraphDelta {
    let mut nodes: Vec<ConceptNode> = Vec::new();
    for contribution in contributions {
        let Some(existing) = snapshot.node(&contribution.node_id) else {
            tracing::warn!(node = %contribution.node_id, "dropping discovery for unknown node");
            continue;
        };
        let resources: Vec<Resource> = contribution
            .selected
            .into_iter()
            .map(|candidate| Resource {
                id: ids.resource_id(),
                name: candidate.name,
                url: candidate.url,
                kind: candidate.kind,
                description: candidate.description,
                difficulty: Some(candidate.difficulty.unwrap_or(5).clamp(1, 10)),
                importance: Some(candidate.importance.unwrap_or(5).min(10)),
                study_load: Some(candidate.study_load.unwrap_or(1.0).max(0.0)),
                necessary: None,
            })
            .collect();
        if resources.is_empty() {
            continue;
        }
        let mut node = existing.clone();
        node.description = None;
        node.importance = None;
        node.necessary = None;
        node.resources = resources;
        nodes.push(node);
    }
    GraphDelta::new().with_nodes(nodes)
}

fn materialize_expansion(outcome: ExpansionOutcome, ids: &mut IdAllocator) -> GraphDelta {
    let mut remap: FxHashMap<String, String> = FxHashMap::default();
    let mut nodes: Vec<ConceptNode> = Vec::new();
    for proposal in outcome.proposals {
        let canonical = ids.node_id();
        remap.insert(proposal.id.clone(), canonical.clone());
        let mut node = ConceptNode::new(canonical, proposal.label);
        node.description = proposal
            .description
            .filter(|d| !d.trim().is_empty());
        nodes.push(node);
    }
    let edges: Vec<Edge> = outcome
        .edges
        .into_iter()
        .map(|edge| {
            let start = remap.get(&edge.start).cloned().unwrap_or(edge.start);
            let end = remap.get(&edge.end).cloned().unwrap_or(edge.end);
            Edge::new(start, end)
        })
        .collect();
    GraphDelta::new().with_nodes(nodes).with_edges(edges)
}
