//! Shared fixtures and scripted capability mocks for the integration suites.
#![allow(dead_code)]

use async_trait::async_trait;
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use studyweave::advisor::{
    Advisor, AdvisorError, AlignedConcept, DescriptionAlignment, ExpandedGraph, GlobalSufficiency,
    NodeSufficiency,
};
use studyweave::catalog::{Candidate, Catalog, CatalogError, EvaluatedCandidate, SearchHit};
use studyweave::config::LearnerProfile;
use studyweave::curriculum::{
    ConceptNode, CurriculumGraph, Edge, GraphMeta, NodeId, Resource, ResourceKind,
};

#[allow(dead_code)]
pub fn meta(subject: &str) -> GraphMeta {
    GraphMeta {
        subject_id: subject.into(),
        title: "Attention Is All You Need".into(),
        summary: "sequence transduction with attention only".into(),
    }
}

#[allow(dead_code)]
pub fn described_node(id: &str, label: &str) -> ConceptNode {
    let mut node = ConceptNode::new(id, label);
    node.description = Some(format!("{label} in one paragraph"));
    node
}

#[allow(dead_code)]
pub fn scored_resource(id: &str, url: &str) -> Resource {
    Resource {
        id: id.into(),
        name: format!("resource {id}"),
        url: url.into(),
        kind: ResourceKind::Document,
        description: String::new(),
        difficulty: Some(5),
        importance: Some(5),
        study_load: Some(1.0),
        necessary: None,
    }
}

/// A graph where every node is described and resourced, so the diagnostic
/// rule tier passes and the advisory tier runs.
#[allow(dead_code)]
pub fn settled_graph(subject: &str, node_count: usize) -> CurriculumGraph {
    let mut graph = CurriculumGraph {
        meta: meta(subject),
        ..Default::default()
    };
    for i in 1..=node_count {
        let id = format!("key-{i:03}");
        let mut node = described_node(&id, &format!("concept {i}"));
        node.resources = vec![scored_resource(
            &format!("res-{i:03}"),
            &format!("https://docs.example/{i}"),
        )];
        graph.nodes.push(node);
        graph.edges.push(Edge::new(id, subject.to_string()));
    }
    graph
}

/// Per-capability invocation counters.
#[derive(Debug, Default)]
pub struct AdvisorCalls {
    pub global: AtomicUsize,
    pub node: AtomicUsize,
    pub order: AtomicUsize,
    pub align: AtomicUsize,
    pub expand: AtomicUsize,
    pub evaluate: AtomicUsize,
}

impl AdvisorCalls {
    pub fn total(&self) -> usize {
        self.global.load(Ordering::SeqCst)
            + self.node.load(Ordering::SeqCst)
            + self.order.load(Ordering::SeqCst)
            + self.align.load(Ordering::SeqCst)
            + self.expand.load(Ordering::SeqCst)
            + self.evaluate.load(Ordering::SeqCst)
    }
}

/// Scripted advisor: neutral by default, with overridable behaviors per
/// capability. Thread-safe so concurrent fan-outs can share one instance.
#[derive(Default)]
pub struct ScriptedAdvisor {
    pub calls: AdvisorCalls,
    /// Popped front-first by global judgments; empty means "sufficient".
    pub global_script: Mutex<VecDeque<GlobalSufficiency>>,
    /// Remaining rounds each node should be judged insufficient.
    pub insufficient_rounds: Mutex<FxHashMap<NodeId, u32>>,
    /// Returned verbatim by `order_roots` when set.
    pub proposed_roots: Mutex<Option<Vec<NodeId>>>,
    /// When false, `align_descriptions` returns an empty alignment.
    pub describe: bool,
    /// Returned once by `expand_concepts`, then empty.
    pub expansion_script: Mutex<Option<ExpandedGraph>>,
    /// When set, every capability fails with an unavailable error.
    pub unavailable: bool,
}

impl ScriptedAdvisor {
    pub fn cooperative() -> Self {
        Self {
            describe: true,
            ..Default::default()
        }
    }

    pub fn unreachable_advisor() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    fn gate(&self) -> Result<(), AdvisorError> {
        if self.unavailable {
            Err(AdvisorError::Unavailable {
                message: "scripted outage".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Advisor for ScriptedAdvisor {
    async fn judge_global_sufficiency(
        &self,
        _graph: &CurriculumGraph,
        _learner: &LearnerProfile,
    ) -> Result<GlobalSufficiency, AdvisorError> {
        self.calls.global.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        let mut script = self.global_script.lock().unwrap();
        Ok(script.pop_front().unwrap_or_default())
    }

    async fn judge_node_sufficiency(
        &self,
        node: &ConceptNode,
        _learner: &LearnerProfile,
    ) -> Result<NodeSufficiency, AdvisorError> {
        self.calls.node.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        let mut remaining = self.insufficient_rounds.lock().unwrap();
        if let Some(rounds) = remaining.get_mut(&node.id)
            && *rounds > 0
        {
            *rounds -= 1;
            return Ok(NodeSufficiency {
                sufficient: false,
                reasoning: format!("{} needs beginner material", node.label),
            });
        }
        Ok(NodeSufficiency::default())
    }

    async fn order_roots(
        &self,
        root_ids: &[NodeId],
        _graph: &CurriculumGraph,
        _learner: &LearnerProfile,
    ) -> Result<Vec<NodeId>, AdvisorError> {
        self.calls.order.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        let proposed = self.proposed_roots.lock().unwrap();
        Ok(proposed.clone().unwrap_or_else(|| root_ids.to_vec()))
    }

    async fn align_descriptions(
        &self,
        _meta: &GraphMeta,
        nodes: &[ConceptNode],
    ) -> Result<DescriptionAlignment, AdvisorError> {
        self.calls.align.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        if !self.describe {
            return Ok(DescriptionAlignment::default());
        }
        let concepts = nodes
            .iter()
            .map(|n| {
                (
                    n.id.clone(),
                    AlignedConcept {
                        description: format!("{} explained for study", n.label),
                        importance: Some(7),
                    },
                )
            })
            .collect();
        Ok(DescriptionAlignment { concepts })
    }

    async fn expand_concepts(
        &self,
        _graph: &CurriculumGraph,
        _missing: &[NodeId],
        _reasoning: &str,
    ) -> Result<ExpandedGraph, AdvisorError> {
        self.calls.expand.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        let mut script = self.expansion_script.lock().unwrap();
        Ok(script.take().unwrap_or_default())
    }

    async fn evaluate_resources(
        &self,
        _label: &str,
        candidates: &[Candidate],
        _learner: &LearnerProfile,
    ) -> Result<Vec<EvaluatedCandidate>, AdvisorError> {
        self.calls.evaluate.fetch_add(1, Ordering::SeqCst);
        self.gate()?;
        Ok(candidates
            .iter()
            .map(|c| EvaluatedCandidate {
                name: c.name.clone(),
                url: c.url.clone(),
                kind: c.kind,
                description: c.description.clone(),
                difficulty: Some(5),
                importance: Some(6),
                quality: Some(4),
                study_load: Some(1.5),
            })
            .collect())
    }
}

/// Catalog returning deterministic hits per kind; selected kinds can be
/// scripted to fail like a flaky provider.
#[derive(Default)]
pub struct StaticCatalog {
    pub searches: AtomicUsize,
    pub failing_kinds: FxHashSet<ResourceKind>,
    /// When true, every search reports the catalog as unreachable.
    pub unavailable: bool,
}

impl StaticCatalog {
    pub fn cooperative() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn search(
        &self,
        query: &str,
        kind: ResourceKind,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, CatalogError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(CatalogError::Unavailable {
                message: "scripted outage".into(),
            });
        }
        if self.failing_kinds.contains(&kind) {
            return Err(CatalogError::Provider {
                provider: kind.to_string(),
                message: "scripted 500".into(),
            });
        }
        let slug = query.replace(' ', "-");
        Ok((0..max_results)
            .map(|i| SearchHit {
                title: format!("{query} ({kind} #{i})"),
                url: format!("https://{kind}.example/{slug}/{i}"),
                snippet: format!("about {query}"),
            })
            .collect())
    }
}
