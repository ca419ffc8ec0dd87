//! Root sequencing against a scripted advisor: self-healing correction and
//! graceful degradation are never visible to the caller.

mod common;
use common::*;

use studyweave::config::{EngineConfig, LearnerProfile};
use studyweave::sequencer::{root_ids, sequence_roots};

#[tokio::test]
async fn garbage_ordering_is_silently_corrected() {
    let mut graph = settled_graph("p1", 3);
    let advisor = ScriptedAdvisor::cooperative();
    *advisor.proposed_roots.lock().unwrap() = Some(vec![
        "key-002".into(),
        "key-002".into(),   // duplicate
        "nonsense".into(),  // foreign id
        "key-003".into(),
        // key-001 omitted entirely
    ]);

    sequence_roots(
        &mut graph,
        &advisor,
        &LearnerProfile::default(),
        &EngineConfig::default(),
    )
    .await;

    assert_eq!(graph.root_order, vec!["key-002", "key-003", "key-001"]);
}

#[tokio::test]
async fn unreachable_advisor_degrades_to_original_order() {
    let mut graph = settled_graph("p1", 2);
    let advisor = ScriptedAdvisor::unreachable_advisor();

    sequence_roots(
        &mut graph,
        &advisor,
        &LearnerProfile::default(),
        &EngineConfig::default(),
    )
    .await;

    assert_eq!(graph.root_order, root_ids(&graph));
    assert_eq!(graph.root_order, vec!["key-001", "key-002"]);
}

#[tokio::test]
async fn graph_without_roots_gets_an_empty_order() {
    use studyweave::curriculum::{CurriculumGraph, Edge};

    // A three-cycle: every node appears as an edge end, so no roots exist.
    let mut graph = CurriculumGraph {
        meta: meta("p1"),
        ..Default::default()
    };
    for (id, label) in [("key-001", "a"), ("key-002", "b"), ("key-003", "c")] {
        graph.nodes.push(described_node(id, label));
    }
    graph.edges.push(Edge::new("key-001", "key-002"));
    graph.edges.push(Edge::new("key-002", "key-003"));
    graph.edges.push(Edge::new("key-003", "key-001"));

    let advisor = ScriptedAdvisor::cooperative();
    sequence_roots(
        &mut graph,
        &advisor,
        &LearnerProfile::default(),
        &EngineConfig::default(),
    )
    .await;

    assert!(graph.root_order.is_empty());
}
