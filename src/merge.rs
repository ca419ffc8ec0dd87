//! Conflict-free combination of the canonical graph with specialist deltas.
//!
//! Each refinement round fans out to concurrent specialists, every one of
//! which works against the same immutable pre-round snapshot and returns a
//! [`GraphDelta`]. The engine merges those deltas into the canonical graph
//! sequentially, in any order: within a round specialists only add nodes,
//! resources, and edges or fill unset fields, so deltas commute on disjoint
//! id sets.
//!
//! Merge rules:
//! - nodes are keyed by id; a delta field overwrites the existing field only
//!   when it is set and non-empty (resources are special-cased below);
//! - resources within a node are unioned into a map keyed by resource id,
//!   incoming wins on collision, and the result is re-sorted by id;
//! - edges are keyed by the unordered endpoint pair; absent delta edges are
//!   appended, none are ever removed;
//! - `meta` and `root_order` only change when the delta carries a value.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::curriculum::{ConceptNode, CurriculumGraph, Edge, GraphMeta, NodeId, Resource};

/// Partial graph update produced by one specialist in one round.
///
/// Fields that are `None` (or empty collections) leave the canonical value
/// untouched, which is how a stage that does not touch meta or root order
/// avoids clobbering them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDelta {
    pub meta: Option<GraphMeta>,
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<Edge>,
    pub root_order: Option<Vec<NodeId>>,
}

impl GraphDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_nodes(mut self, nodes: Vec<ConceptNode>) -> Self {
        self.nodes = nodes;
        self
    }

    #[must_use]
    pub fn with_edges(mut self, edges: Vec<Edge>) -> Self {
        self.edges = edges;
        self
    }

    /// True when applying this delta cannot change any graph.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.meta.is_none()
            && self.nodes.is_empty()
            && self.edges.is_empty()
            && self.root_order.is_none()
    }
}

/// Merge one delta into the canonical graph.
///
/// This is the single write path for the canonical graph during a round; the
/// engine invokes it once per specialist completion, strictly after that
/// specialist's work has finished.
pub fn merge_graph(existing: &mut CurriculumGraph, delta: GraphDelta) {
    if delta.is_empty() {
        return;
    }

    let GraphDelta {
        meta,
        nodes,
        edges,
        root_order,
    } = delta;

    for incoming in nodes {
        match existing.nodes.iter().position(|n| n.id == incoming.id) {
            Some(index) => merge_node(&mut existing.nodes[index], incoming),
            None => existing.nodes.push(incoming),
        }
    }

    if !edges.is_empty() {
        let mut seen: rustc_hash::FxHashSet<(String, String)> =
            existing.edges.iter().map(Edge::pair_key).collect();
        for edge in edges {
            if seen.insert(edge.pair_key()) {
                existing.edges.push(edge);
            }
        }
    }

    if let Some(meta) = meta {
        existing.meta = meta;
    }
    if let Some(order) = root_order {
        existing.root_order = order;
    }
}

/// Field-by-field node merge: set-and-non-empty delta fields win.
///
/// The sufficiency flag always travels with the round snapshot and is only
/// changed by the diagnostic pass, which runs sequentially; carrying the
/// delta's value is therefore safe and mirrors overwrite-if-set semantics
/// for a field with no unset state.
fn merge_node(current: &mut ConceptNode, incoming: ConceptNode) {
    if !incoming.label.trim().is_empty() {
        current.label = incoming.label;
    }
    if incoming
        .description
        .as_deref()
        .is_some_and(|d| !d.trim().is_empty())
    {
        current.description = incoming.description;
    }
    if incoming.importance.is_some() {
        current.importance = incoming.importance;
    }
    if incoming.necessary.is_some() {
        current.necessary = incoming.necessary;
    }
    current.resource_sufficient = incoming.resource_sufficient;

    if !incoming.resources.is_empty() {
        current.resources = merge_resources(&current.resources, incoming.resources);
    }
}

/// Union of resource lists keyed by id; incoming wins on collision and the
/// result is re-sorted by id for determinism.
fn merge_resources(current: &[Resource], incoming: Vec<Resource>) -> Vec<Resource> {
    let mut by_id: FxHashMap<String, Resource> = current
        .iter()
        .filter(|r| !r.id.is_empty())
        .map(|r| (r.id.clone(), r.clone()))
        .collect();
    for resource in incoming {
        if resource.id.is_empty() {
            continue;
        }
        by_id.insert(resource.id.clone(), resource);
    }
    let mut merged: Vec<Resource> = by_id.into_values().collect();
    merged.sort_by(|a, b| a.id.cmp(&b.id));
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::ResourceKind;

    fn resource(id: &str, url: &str) -> Resource {
        Resource {
            id: id.into(),
            name: format!("resource {id}"),
            url: url.into(),
            kind: ResourceKind::Document,
            description: String::new(),
            difficulty: None,
            importance: None,
            study_load: None,
            necessary: None,
        }
    }

    #[test]
    fn incoming_resource_wins_on_id_collision() {
        let mut node = ConceptNode::new("key-001", "tokenization");
        node.resources = vec![resource("res-001", "https://a.example")];

        let mut graph = CurriculumGraph::default();
        graph.nodes.push(node);

        let mut replacement = resource("res-001", "https://a.example");
        replacement.difficulty = Some(7);
        let mut delta_node = ConceptNode::new("key-001", "tokenization");
        delta_node.resources = vec![replacement, resource("res-003", "https://c.example")];

        merge_graph(&mut graph, GraphDelta::new().with_nodes(vec![delta_node]));

        let merged = graph.node("key-001").unwrap();
        assert_eq!(merged.resources.len(), 2);
        assert_eq!(merged.resources[0].id, "res-001");
        assert_eq!(merged.resources[0].difficulty, Some(7));
        assert_eq!(merged.resources[1].id, "res-003");
    }

    #[test]
    fn empty_delta_fields_preserve_meta_and_root_order() {
        let mut graph = CurriculumGraph {
            meta: GraphMeta {
                subject_id: "p1".into(),
                title: "subject".into(),
                summary: String::new(),
            },
            root_order: vec!["key-001".into()],
            ..Default::default()
        };
        let before = graph.clone();

        merge_graph(&mut graph, GraphDelta::new());

        assert_eq!(graph, before);
    }
}
