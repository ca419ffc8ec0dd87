//! Discovery specialist: find, evaluate, and rank resources per node.
//!
//! Per-node work runs concurrently under a fixed permit limit so a wide
//! graph cannot flood the external providers. Within a node: plan the
//! searches from the learner's preferences, collect candidates tolerating
//! individual provider failures, dedup by url, have the advisor evaluate the
//! survivors, and keep the ranker's top picks.

use futures_util::future::join_all;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::instrument;

use crate::advisor::{Advisor, with_deadline};
use crate::catalog::{Candidate, Catalog, CatalogError, EvaluatedCandidate, plan_searches};
use crate::config::{EngineConfig, LearnerProfile};
use crate::curriculum::{ConceptNode, CurriculumGraph, NodeId, ResourceKind};
use crate::ranker;
use crate::specialists::{SpecialistError, SpecialistOutput};

/// Ranked, evaluated candidates selected for one node. Resource ids are
/// assigned later, by the engine's allocator at merge time.
#[derive(Clone, Debug)]
pub struct NodeCandidates {
    pub node_id: NodeId,
    pub selected: Vec<EvaluatedCandidate>,
}

pub struct DiscoverySpecialist {
    advisor: Arc<dyn Advisor>,
    catalog: Arc<dyn Catalog>,
    config: EngineConfig,
}

impl DiscoverySpecialist {
    #[must_use]
    pub fn new(advisor: Arc<dyn Advisor>, catalog: Arc<dyn Catalog>, config: EngineConfig) -> Self {
        Self {
            advisor,
            catalog,
            config,
        }
    }

    /// Discover resources for every node not yet flagged sufficient.
    #[instrument(skip_all, fields(round))]
    pub async fn run(
        &self,
        snapshot: &CurriculumGraph,
        learner: &LearnerProfile,
        reasons: &FxHashMap<NodeId, String>,
        round: u32,
    ) -> Result<SpecialistOutput, SpecialistError> {
        let semaphore = Arc::new(Semaphore::new(self.config.discovery_concurrency.max(1)));
        let targets: Vec<&ConceptNode> = snapshot
            .nodes
            .iter()
            .filter(|n| !n.resource_sufficient || n.resources.is_empty())
            .collect();

        let futures = targets.iter().map(|&node| {
            let semaphore = Arc::clone(&semaphore);
            let direction = reasons.get(&node.id).cloned().unwrap_or_default();
            async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .expect("discovery semaphore is never closed");
                self.discover_for_node(node, learner, &direction).await
            }
        });

        let mut contributions: Vec<NodeCandidates> = Vec::new();
        for result in join_all(futures).await {
            match result {
                Ok(Some(candidates)) => contributions.push(candidates),
                Ok(None) => {}
                Err(error) => return Err(error),
            }
        }

        tracing::debug!(
            round,
            targets = targets.len(),
            contributed = contributions.len(),
            "discovery round complete"
        );
        Ok(SpecialistOutput::Discovered(contributions))
    }

    /// Full pipeline for one node; `None` when nothing new was found.
    async fn discover_for_node(
        &self,
        node: &ConceptNode,
        learner: &LearnerProfile,
        direction: &str,
    ) -> Result<Option<NodeCandidates>, SpecialistError> {
        let excluded = node.resource_urls();
        let query = node.label.trim().to_string();
        let paper_query = format!("{query} survey");

        let mut candidates: Vec<Candidate> = Vec::new();
        let mut seen = excluded.clone();
        for step in plan_searches(&learner.preferred_kinds) {
            let step_query = match step.kind {
                ResourceKind::Paper => paper_query.as_str(),
                _ => query.as_str(),
            };
            let hits = match self.search_step(step_query, step.kind, step.max_results).await {
                Ok(hits) => hits,
                Err(error) if error.is_unavailable() => {
                    return Err(SpecialistError::Catalog(error));
                }
                Err(error) => {
                    // One provider down must not fail the node's discovery.
                    tracing::warn!(node = %node.id, %error, "dropping provider contribution");
                    continue;
                }
            };
            for hit in hits {
                if hit.url.is_empty() || !seen.insert(hit.url.clone()) {
                    continue;
                }
                candidates.push(normalize_hit(hit, step.kind));
            }
        }

        if candidates.is_empty() {
            tracing::debug!(node = %node.id, direction, "no new candidates");
            return Ok(None);
        }

        let evaluation = with_deadline(
            self.config.advisor_timeout,
            self.advisor
                .evaluate_resources(&node.label, &candidates, learner),
        )
        .await;
        let evaluated = match evaluation {
            Ok(evaluated) => reconcile_evaluation(candidates, evaluated),
            Err(error) if error.is_unavailable() => {
                return Err(SpecialistError::Advisor(error));
            }
            Err(error) => {
                // Unevaluated candidates still rank; defaults apply downstream.
                tracing::warn!(node = %node.id, %error, "evaluation degraded to defaults");
                candidates.into_iter().map(EvaluatedCandidate::unscored).collect()
            }
        };

        let selected = ranker::select_top(
            evaluated,
            &learner.preferred_kinds,
            self.config.top_n,
            self.config.min_preferred,
            &excluded,
        );
        if selected.is_empty() {
            return Ok(None);
        }
        Ok(Some(NodeCandidates {
            node_id: node.id.clone(),
            selected,
        }))
    }

    async fn search_step(
        &self,
        query: &str,
        kind: ResourceKind,
        max_results: usize,
    ) -> Result<Vec<crate::catalog::SearchHit>, CatalogError> {
        let limit = self.config.search_timeout;
        match tokio::time::timeout(limit, self.catalog.search(query, kind, max_results)).await {
            Ok(result) => result,
            Err(_) => Err(CatalogError::Timeout {
                seconds: limit.as_secs(),
            }),
        }
    }
}

/// Turn a raw hit into a candidate, detecting videos that arrive through a
/// generic document search by url.
fn normalize_hit(hit: crate::catalog::SearchHit, kind: ResourceKind) -> Candidate {
    let kind = if kind == ResourceKind::Document
        && (hit.url.contains("youtube.com") || hit.url.contains("youtu.be"))
    {
        ResourceKind::Video
    } else {
        kind
    };
    let name = if hit.title.trim().is_empty() {
        "Untitled Resource".to_string()
    } else {
        hit.title
    };
    let description: String = hit.snippet.chars().take(2000).collect();
    Candidate {
        name,
        url: hit.url,
        kind,
        description,
    }
}

/// Match evaluation results back to the candidate set by url; candidates the
/// evaluator skipped stay unscored and pick up defaults downstream.
fn reconcile_evaluation(
    candidates: Vec<Candidate>,
    evaluated: Vec<EvaluatedCandidate>,
) -> Vec<EvaluatedCandidate> {
    let mut by_url: FxHashMap<String, EvaluatedCandidate> = evaluated
        .into_iter()
        .map(|e| (e.url.clone(), e))
        .collect();
    candidates
        .into_iter()
        .map(|candidate| {
            by_url
                .remove(&candidate.url)
                .unwrap_or_else(|| EvaluatedCandidate::unscored(candidate))
        })
        .collect()
}
