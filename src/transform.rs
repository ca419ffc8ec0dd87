//! One-shot bootstrap: raw discovered graph → canonical curriculum graph.
//!
//! The raw graph arrives from an external discovery step with foreign node
//! ids (possibly missing) and unscored resources. Transformation assigns
//! stable canonical ids in traversal order, remaps every edge endpoint
//! through the resulting table, and tethers detached nodes to the subject so
//! nothing is unreachable.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::curriculum::{ConceptNode, CurriculumGraph, Edge, GraphMeta, Resource, ResourceKind};
use crate::ids::IdAllocator;

/// A node as produced by the external discovery step.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawNode {
    /// Foreign identifier; `None` (or the literal string "none") marks a
    /// detached node that will be tethered to the subject.
    pub external_id: Option<String>,
    pub label: String,
    #[serde(default)]
    pub resources: Vec<RawResource>,
}

/// A resource carried over from the raw graph, not yet scored.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawResource {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub kind: Option<ResourceKind>,
    #[serde(default)]
    pub description: String,
}

/// An edge between foreign identifiers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RawEdge {
    pub start: String,
    pub end: String,
}

/// The externally supplied raw concept graph.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RawGraph {
    pub subject_id: String,
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
}

/// Transform a raw graph into canonical form.
///
/// - Every node gets `key-{index+1:03}` in input order.
/// - Edge endpoints are remapped through the `external → canonical` table;
///   unknown endpoints pass through unchanged (tolerated, not an error).
/// - Detached nodes get a synthetic edge to the subject.
/// - Carried-over resources receive fresh `res-NNN` ids from the caller's
///   allocator; scores start unset pending later estimation.
pub fn transform(raw: RawGraph, meta: GraphMeta, ids: &mut IdAllocator) -> CurriculumGraph {
    let mut id_map: FxHashMap<String, String> = FxHashMap::default();
    if !meta.subject_id.is_empty() {
        id_map.insert(meta.subject_id.clone(), meta.subject_id.clone());
    }
    // A divergent raw subject id is aliased onto the canonical one.
    if !raw.subject_id.is_empty() && raw.subject_id != meta.subject_id {
        id_map.insert(raw.subject_id.clone(), meta.subject_id.clone());
    }

    let mut detached: Vec<String> = Vec::new();
    let mut nodes: Vec<ConceptNode> = Vec::with_capacity(raw.nodes.len());
    for raw_node in &raw.nodes {
        let canonical = ids.node_id();
        match raw_node.external_id.as_deref() {
            Some(external) if !external.eq_ignore_ascii_case("none") => {
                id_map.insert(external.to_string(), canonical.clone());
            }
            _ => detached.push(canonical.clone()),
        }

        let resources = raw_node
            .resources
            .iter()
            .map(|r| Resource {
                id: ids.resource_id(),
                name: r.name.clone(),
                url: r.url.clone(),
                kind: r.kind.unwrap_or(ResourceKind::Document),
                description: r.description.clone(),
                difficulty: None,
                importance: None,
                study_load: None,
                necessary: None,
            })
            .collect();

        let mut node = ConceptNode::new(canonical, raw_node.label.clone());
        node.resources = resources;
        nodes.push(node);
    }

    let mut edges: Vec<Edge> = Vec::new();
    let mut pairs: FxHashSet<(String, String)> = FxHashSet::default();
    let mut push_edge = |edges: &mut Vec<Edge>, edge: Edge| {
        if pairs.insert(edge.pair_key()) {
            edges.push(edge);
        }
    };

    for raw_edge in &raw.edges {
        let start = id_map
            .get(&raw_edge.start)
            .cloned()
            .unwrap_or_else(|| raw_edge.start.clone());
        let end = id_map
            .get(&raw_edge.end)
            .cloned()
            .unwrap_or_else(|| raw_edge.end.clone());
        push_edge(&mut edges, Edge::new(start, end));
    }

    if !meta.subject_id.is_empty() {
        for node_id in &detached {
            push_edge(&mut edges, Edge::new(node_id.clone(), meta.subject_id.clone()));
        }
        if !detached.is_empty() {
            tracing::debug!(
                count = detached.len(),
                subject = %meta.subject_id,
                "tethered detached nodes to the subject"
            );
        }
    }

    CurriculumGraph {
        meta,
        nodes,
        edges,
        root_order: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(subject: &str) -> GraphMeta {
        GraphMeta {
            subject_id: subject.into(),
            title: "subject".into(),
            summary: String::new(),
        }
    }

    #[test]
    fn detached_node_is_tethered_to_the_subject() {
        let raw = RawGraph {
            subject_id: "p1".into(),
            nodes: vec![RawNode {
                external_id: None,
                label: "X".into(),
                resources: vec![],
            }],
            edges: vec![],
        };
        let mut ids = IdAllocator::new();
        let graph = transform(raw, meta("p1"), &mut ids);

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.nodes[0].id, "key-001");
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0], Edge::new("key-001", "p1"));
    }

    #[test]
    fn known_endpoints_remap_and_unknown_pass_through() {
        let raw = RawGraph {
            subject_id: "p1".into(),
            nodes: vec![
                RawNode {
                    external_id: Some("ext-a".into()),
                    label: "A".into(),
                    resources: vec![],
                },
                RawNode {
                    external_id: Some("ext-b".into()),
                    label: "B".into(),
                    resources: vec![],
                },
            ],
            edges: vec![
                RawEdge {
                    start: "ext-a".into(),
                    end: "ext-b".into(),
                },
                RawEdge {
                    start: "ext-a".into(),
                    end: "ghost".into(),
                },
            ],
        };
        let mut ids = IdAllocator::new();
        let graph = transform(raw, meta("p1"), &mut ids);

        assert_eq!(graph.edges[0], Edge::new("key-001", "key-002"));
        assert_eq!(graph.edges[1], Edge::new("key-001", "ghost"));
    }

    #[test]
    fn divergent_raw_subject_id_aliases_to_canonical() {
        let raw = RawGraph {
            subject_id: "old-subject".into(),
            nodes: vec![RawNode {
                external_id: Some("ext-a".into()),
                label: "A".into(),
                resources: vec![],
            }],
            edges: vec![RawEdge {
                start: "ext-a".into(),
                end: "old-subject".into(),
            }],
        };
        let mut ids = IdAllocator::new();
        let graph = transform(raw, meta("p1"), &mut ids);
        assert_eq!(graph.edges[0], Edge::new("key-001", "p1"));
    }

    #[test]
    fn carried_resources_get_fresh_ids_and_unset_scores() {
        let raw = RawGraph {
            subject_id: "p1".into(),
            nodes: vec![RawNode {
                external_id: Some("ext-a".into()),
                label: "A".into(),
                resources: vec![RawResource {
                    name: "intro".into(),
                    url: "https://a.example".into(),
                    kind: None,
                    description: String::new(),
                }],
            }],
            edges: vec![],
        };
        let mut ids = IdAllocator::new();
        let graph = transform(raw, meta("p1"), &mut ids);

        let resource = &graph.nodes[0].resources[0];
        assert_eq!(resource.id, "res-001");
        assert_eq!(resource.kind, ResourceKind::Document);
        assert_eq!(resource.difficulty, None);
        assert_eq!(resource.study_load, None);
        assert!(!graph.nodes[0].resource_sufficient);
    }

    #[test]
    fn literal_none_external_id_counts_as_detached() {
        let raw = RawGraph {
            subject_id: "p1".into(),
            nodes: vec![RawNode {
                external_id: Some("None".into()),
                label: "X".into(),
                resources: vec![],
            }],
            edges: vec![],
        };
        let mut ids = IdAllocator::new();
        let graph = transform(raw, meta("p1"), &mut ids);
        assert_eq!(graph.edges, vec![Edge::new("key-001", "p1")]);
    }
}
