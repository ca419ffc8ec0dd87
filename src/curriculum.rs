//! Canonical curriculum graph model.
//!
//! This module defines the typed core of the system: concept nodes with
//! prerequisite edges and attached learning resources, plus the task
//! vocabulary the diagnostic/refinement loop operates on. Every stage of the
//! engine exchanges these records; there are no untyped maps between stages.
//!
//! The graph is also the wire format: all types serialize with `serde` and
//! round-trip losslessly between rounds and to the delivery boundary.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical concept identifier, format `key-NNN`.
pub type NodeId = String;

/// Canonical resource identifier, format `res-NNN`.
pub type ResourceId = String;

/// Metadata about the subject document the curriculum is built for.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphMeta {
    /// External identifier of the subject document. Edge endpoints may
    /// reference this id directly; it is not a node of the graph.
    pub subject_id: String,
    pub title: String,
    pub summary: String,
}

/// The kind of learning artifact a resource points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Document,
    Video,
    Paper,
}

impl ResourceKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Document => "document",
            ResourceKind::Video => "video",
            ResourceKind::Paper => "paper",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A learning artifact attached to a concept node.
///
/// Identity is the `id`; deduplication during discovery is keyed by `url`.
/// Scoring fields start unset when a resource is carried over from the raw
/// graph and are filled by the evaluation step during discovery.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    pub description: String,
    /// Estimated difficulty, 1–10.
    pub difficulty: Option<u8>,
    /// Estimated importance, 0–10.
    pub importance: Option<u8>,
    /// Estimated study load in hours.
    pub study_load: Option<f64>,
    /// Set by the budget composer: `Some(true)` for emphasized resources,
    /// `Some(false)` for preserved ones, `None` until composition runs.
    pub necessary: Option<bool>,
}

/// One topic in the curriculum graph.
///
/// Nodes are created by the transformer (or the concept-expansion stage) and
/// never deleted; only their fields and resource lists change, and only
/// through the merge reducer or the diagnostic side-effect pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConceptNode {
    pub id: NodeId,
    pub label: String,
    pub description: Option<String>,
    /// Concept importance, 0–10, filled by the description specialist.
    pub importance: Option<u8>,
    pub necessary: Option<bool>,
    /// Whether the attached resources were judged sufficient for the learner.
    pub resource_sufficient: bool,
    pub resources: Vec<Resource>,
}

impl ConceptNode {
    /// Minimal node constructor; optional fields start unset and the
    /// sufficiency flag starts pessimistic.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            importance: None,
            necessary: None,
            resource_sufficient: false,
            resources: Vec::new(),
        }
    }

    /// True when the node has no usable description.
    #[must_use]
    pub fn missing_description(&self) -> bool {
        self.description
            .as_deref()
            .map(str::trim)
            .is_none_or(str::is_empty)
    }

    /// Urls already attached to this node, used to exclude rediscovery.
    #[must_use]
    pub fn resource_urls(&self) -> FxHashSet<String> {
        self.resources
            .iter()
            .filter(|r| !r.url.is_empty())
            .map(|r| r.url.clone())
            .collect()
    }
}

/// A prerequisite edge between two graph endpoints.
///
/// Endpoints reference node ids or the graph's subject id. Edges are never
/// mutated once created, only added; identity is the unordered endpoint pair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub start: String,
    pub end: String,
}

impl Edge {
    #[must_use]
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Unordered identity key: the endpoint pair with a canonical ordering,
    /// so `a → b` and `b → a` collapse to the same key.
    #[must_use]
    pub fn pair_key(&self) -> (String, String) {
        if self.start <= self.end {
            (self.start.clone(), self.end.clone())
        } else {
            (self.end.clone(), self.start.clone())
        }
    }
}

/// The canonical, in-memory curriculum graph.
///
/// Invariants upheld by the transformer and the merge reducer:
/// - node ids are unique;
/// - no duplicate `(start, end)` edge pairs;
/// - `root_order`, once written, is a permutation of the root node set.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CurriculumGraph {
    pub meta: GraphMeta,
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<Edge>,
    /// Presentation order of entry nodes, written by the root sequencer.
    pub root_order: Vec<NodeId>,
}

impl CurriculumGraph {
    #[must_use]
    pub fn node(&self, id: &str) -> Option<&ConceptNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut ConceptNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Set of all node ids currently in the graph.
    #[must_use]
    pub fn node_ids(&self) -> FxHashSet<NodeId> {
        self.nodes.iter().map(|n| n.id.clone()).collect()
    }

    #[must_use]
    pub fn has_edge(&self, candidate: &Edge) -> bool {
        let key = candidate.pair_key();
        self.edges.iter().any(|e| e.pair_key() == key)
    }

    /// Total resources attached across all nodes.
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.nodes.iter().map(|n| n.resources.len()).sum()
    }
}

/// Outstanding work the diagnostic orchestrator can hand to the scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// One or more nodes lack a description.
    GenerateDescription,
    /// One or more nodes need (more) learning resources.
    SearchResources,
    /// The concept set does not yet cover the subject.
    ExpandConcepts,
    /// Terminal: refinement is done, move to composition.
    Compose,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskKind::GenerateDescription => "generate_description",
            TaskKind::SearchResources => "search_resources",
            TaskKind::ExpandConcepts => "expand_concepts",
            TaskKind::Compose => "compose",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_direction_independent() {
        let forward = Edge::new("key-001", "key-002");
        let backward = Edge::new("key-002", "key-001");
        assert_eq!(forward.pair_key(), backward.pair_key());
    }

    #[test]
    fn missing_description_treats_blank_as_missing() {
        let mut node = ConceptNode::new("key-001", "attention");
        assert!(node.missing_description());
        node.description = Some("   ".into());
        assert!(node.missing_description());
        node.description = Some("weighted context mixing".into());
        assert!(!node.missing_description());
    }

    #[test]
    fn resource_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ResourceKind::Paper).unwrap();
        assert_eq!(json, "\"paper\"");
    }
}
