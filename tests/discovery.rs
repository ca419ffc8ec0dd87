//! Discovery specialist behavior through the engine: url dedup against
//! existing resources and bounded selection.

mod common;
use common::*;

use std::sync::Arc;

use studyweave::advisor::Advisor;
use studyweave::config::{EngineConfig, LearnerProfile};
use studyweave::curriculum::ResourceKind;
use studyweave::engine::RefineEngine;
use studyweave::ids::IdAllocator;

#[tokio::test]
async fn known_urls_are_never_rediscovered() {
    let advisor = Arc::new(ScriptedAdvisor::cooperative());
    let catalog = Arc::new(StaticCatalog::cooperative());

    // The node already owns the first url the catalog will return for its
    // label ("concept 1" → slug "concept-1").
    let mut graph = settled_graph("p1", 1);
    {
        let node = graph.node_mut("key-001").unwrap();
        node.resources[0].url = "https://document.example/concept-1/0".into();
    }
    // Force one discovery round for the node.
    advisor
        .insufficient_rounds
        .lock()
        .unwrap()
        .insert("key-001".into(), 1);

    let engine = RefineEngine::new(
        Arc::clone(&advisor) as Arc<dyn Advisor>,
        catalog,
        EngineConfig::default(),
    );
    let mut ids = IdAllocator::new();
    ids.node_id();
    ids.resource_id();

    let outcome = engine
        .refine_graph(graph, ids, &LearnerProfile::default())
        .await
        .unwrap();

    let node = outcome.graph.node("key-001").unwrap();
    let urls: Vec<&str> = node.resources.iter().map(|r| r.url.as_str()).collect();
    let occurrences = urls
        .iter()
        .filter(|u| **u == "https://document.example/concept-1/0")
        .count();
    assert_eq!(occurrences, 1, "existing url must not be rediscovered");
}

#[tokio::test]
async fn selection_is_bounded_by_top_n() {
    let advisor = Arc::new(ScriptedAdvisor::cooperative());
    let catalog = Arc::new(StaticCatalog::cooperative());

    let mut graph = settled_graph("p1", 1);
    advisor
        .insufficient_rounds
        .lock()
        .unwrap()
        .insert("key-001".into(), 1);

    let learner = LearnerProfile {
        preferred_kinds: vec![
            ResourceKind::Document,
            ResourceKind::Video,
            ResourceKind::Paper,
        ],
        ..Default::default()
    };

    let engine = RefineEngine::new(
        Arc::clone(&advisor) as Arc<dyn Advisor>,
        catalog,
        EngineConfig::default(),
    );
    let mut ids = IdAllocator::new();
    ids.node_id();
    ids.resource_id();

    let before = graph.node("key-001").unwrap().resources.len();
    let outcome = engine
        .refine_graph(graph, ids, &learner)
        .await
        .unwrap();

    let node = outcome.graph.node("key-001").unwrap();
    assert!(node.resources.len() <= before + 3, "ranker caps additions at top_n");
    assert!(node.resources.len() > before, "discovery added something");
    // New resource ids came from the engine's allocator, in sequence.
    assert!(node.resources.iter().any(|r| r.id == "res-002"));
}
