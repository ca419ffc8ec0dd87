//! Advisor boundary: structured judgments about the curriculum.
//!
//! The advisor stands in for a language model. Everything it returns is a
//! typed verdict; implementations are expected to run free-text output
//! through the [`crate::json_guard`] parse-or-default helpers so malformed
//! responses degrade to safe neutral values instead of surfacing as errors.
//! Only [`AdvisorError::Unavailable`] propagates out of a refinement round;
//! timeouts and schema violations are absorbed at the call site.

use async_trait::async_trait;
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{Candidate, EvaluatedCandidate};
use crate::config::LearnerProfile;
use crate::curriculum::{ConceptNode, CurriculumGraph, Edge, GraphMeta, NodeId};

/// Global judgment of whether the node set covers the subject.
///
/// The default is the neutral verdict used when the advisor is flaky:
/// sufficient, nothing missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalSufficiency {
    pub sufficient: bool,
    /// Node ids judged to need supplementation. Ids outside the current node
    /// set are dropped by the orchestrator (hallucination defense).
    #[serde(default)]
    pub missing_node_ids: Vec<NodeId>,
    #[serde(default)]
    pub reasoning: String,
}

impl Default for GlobalSufficiency {
    fn default() -> Self {
        Self {
            sufficient: true,
            missing_node_ids: Vec::new(),
            reasoning: String::new(),
        }
    }
}

/// Per-node judgment of whether attached resources suffice for the learner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSufficiency {
    pub sufficient: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl Default for NodeSufficiency {
    fn default() -> Self {
        Self {
            sufficient: true,
            reasoning: String::new(),
        }
    }
}

/// Description and importance produced for one concept.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedConcept {
    pub description: String,
    pub importance: Option<u8>,
}

/// Concept descriptions keyed by node id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionAlignment {
    #[serde(default)]
    pub concepts: FxHashMap<NodeId, AlignedConcept>,
}

/// A supplementary concept proposed by the expansion capability.
///
/// Proposal ids are provisional; the engine re-keys accepted proposals into
/// canonical `key-NNN` ids at merge time and remaps their edges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposedConcept {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Proposed supplementary concepts and their prerequisite edges.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandedGraph {
    #[serde(default)]
    pub nodes: Vec<ProposedConcept>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// Errors surfaced by advisor implementations.
#[derive(Debug, Error, Diagnostic)]
pub enum AdvisorError {
    /// The judgment could not be parsed or violated its schema. Callers
    /// substitute the neutral default verdict.
    #[error("malformed advisor output: {detail}")]
    #[diagnostic(code(studyweave::advisor::malformed))]
    Malformed { detail: String },

    /// The call exceeded its deadline. Treated the same as malformed output:
    /// no contribution, never a stalled round.
    #[error("advisor call timed out after {seconds}s")]
    #[diagnostic(code(studyweave::advisor::timeout))]
    Timeout { seconds: u64 },

    /// The advisor cannot be reached at all. This is the one advisor failure
    /// that aborts the run, carrying the partial graph upward intact.
    #[error("advisor unreachable: {message}")]
    #[diagnostic(
        code(studyweave::advisor::unavailable),
        help("Committed rounds are never discarded; the partial graph rides along with the abort.")
    )]
    Unavailable { message: String },
}

impl AdvisorError {
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AdvisorError::Unavailable { .. })
    }
}

/// Structured-judgment capability consumed by the engine.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Judge whether the node set sufficiently covers the subject.
    async fn judge_global_sufficiency(
        &self,
        graph: &CurriculumGraph,
        learner: &LearnerProfile,
    ) -> Result<GlobalSufficiency, AdvisorError>;

    /// Judge whether one node's resources suffice for the learner.
    async fn judge_node_sufficiency(
        &self,
        node: &ConceptNode,
        learner: &LearnerProfile,
    ) -> Result<NodeSufficiency, AdvisorError>;

    /// Order the graph's entry nodes for presentation.
    ///
    /// The returned sequence is validated and self-healed by the root
    /// sequencer; duplicates, foreign ids, and omissions are all tolerated.
    async fn order_roots(
        &self,
        root_ids: &[NodeId],
        graph: &CurriculumGraph,
        learner: &LearnerProfile,
    ) -> Result<Vec<NodeId>, AdvisorError>;

    /// Produce descriptions (and importance) for the given concepts.
    async fn align_descriptions(
        &self,
        meta: &GraphMeta,
        nodes: &[ConceptNode],
    ) -> Result<DescriptionAlignment, AdvisorError>;

    /// Propose supplementary concepts for the surviving missing-concept ids.
    async fn expand_concepts(
        &self,
        graph: &CurriculumGraph,
        missing: &[NodeId],
        reasoning: &str,
    ) -> Result<ExpandedGraph, AdvisorError>;

    /// Score candidate resources for one concept.
    async fn evaluate_resources(
        &self,
        label: &str,
        candidates: &[Candidate],
        learner: &LearnerProfile,
    ) -> Result<Vec<EvaluatedCandidate>, AdvisorError>;
}

/// Run an advisor call under a deadline, mapping expiry to
/// [`AdvisorError::Timeout`].
pub async fn with_deadline<T, F>(limit: Duration, call: F) -> Result<T, AdvisorError>
where
    F: Future<Output = Result<T, AdvisorError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(AdvisorError::Timeout {
            seconds: limit.as_secs(),
        }),
    }
}
