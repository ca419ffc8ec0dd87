//! Resource catalog boundary: candidate discovery for one concept.
//!
//! The concrete web/video/academic search providers live outside this crate;
//! callers hand the engine any [`Catalog`] implementation. A single provider
//! failing must not fail a node's discovery; the discovery specialist drops
//! that provider's contribution and proceeds with the rest.

use async_trait::async_trait;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::curriculum::ResourceKind;

/// One raw search result from a catalog provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// A normalized, not-yet-evaluated candidate resource for one node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    pub description: String,
}

/// A candidate after the external evaluation step.
///
/// Scores stay optional: evaluation may time out or skip entries, and the
/// ranker/composer substitute documented defaults instead of aborting.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedCandidate {
    pub name: String,
    pub url: String,
    pub kind: ResourceKind,
    pub description: String,
    /// 1–10.
    pub difficulty: Option<u8>,
    /// 0–10.
    pub importance: Option<u8>,
    /// 1–5, used only for ranking.
    pub quality: Option<u8>,
    /// Hours.
    pub study_load: Option<f64>,
}

impl EvaluatedCandidate {
    /// An unevaluated candidate: all scores unset, defaults apply downstream.
    #[must_use]
    pub fn unscored(candidate: Candidate) -> Self {
        Self {
            name: candidate.name,
            url: candidate.url,
            kind: candidate.kind,
            description: candidate.description,
            difficulty: None,
            importance: None,
            quality: None,
            study_load: None,
        }
    }
}

/// Errors surfaced by catalog implementations.
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    /// A single provider failed; the caller drops its contribution.
    #[error("catalog provider {provider} failed: {message}")]
    #[diagnostic(code(studyweave::catalog::provider))]
    Provider { provider: String, message: String },

    /// The search exceeded its deadline.
    #[error("catalog search timed out after {seconds}s")]
    #[diagnostic(code(studyweave::catalog::timeout))]
    Timeout { seconds: u64 },

    /// The catalog cannot be reached at all; aborts the round upward.
    #[error("catalog unreachable: {message}")]
    #[diagnostic(
        code(studyweave::catalog::unavailable),
        help("Partial results from committed rounds are preserved by the engine.")
    )]
    Unavailable { message: String },
}

impl CatalogError {
    /// True when the error means the capability is gone, not merely flaky.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CatalogError::Unavailable { .. })
    }
}

/// Candidate-resource search capability.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Search for candidate resources of `kind` matching `query`.
    async fn search(
        &self,
        query: &str,
        kind: ResourceKind,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, CatalogError>;
}

/// One step of a per-node search plan.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchStep {
    pub kind: ResourceKind,
    pub max_results: usize,
}

/// Plan the catalog searches for one node from the learner's preferred kinds.
///
/// The plan budget is five results per node and always includes at least one
/// document search, biasing the remainder toward the preferred kinds.
#[must_use]
pub fn plan_searches(preferred: &[ResourceKind]) -> Vec<SearchStep> {
    use ResourceKind::{Document, Paper, Video};
    let wants = |kind| preferred.contains(&kind);
    let step = |kind, max_results| SearchStep { kind, max_results };

    match (wants(Paper), wants(Document), wants(Video)) {
        (true, true, true) => vec![step(Document, 3), step(Video, 1), step(Paper, 1)],
        (true, true, false) => vec![step(Document, 3), step(Paper, 2)],
        (true, false, true) => vec![step(Document, 1), step(Paper, 2), step(Video, 2)],
        (false, true, true) => vec![step(Document, 3), step(Video, 2)],
        (true, false, false) => vec![step(Document, 1), step(Paper, 4)],
        (false, false, true) => vec![step(Document, 1), step(Video, 4)],
        // Document-only and no-preference both fall back to documents.
        _ => vec![step(Document, 5)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ResourceKind::{Document, Paper, Video};

    fn total(plan: &[SearchStep]) -> usize {
        plan.iter().map(|s| s.max_results).sum()
    }

    #[test]
    fn every_plan_spends_the_full_budget() {
        let cases: &[&[ResourceKind]] = &[
            &[],
            &[Document],
            &[Video],
            &[Paper],
            &[Document, Video],
            &[Document, Paper],
            &[Video, Paper],
            &[Document, Video, Paper],
        ];
        for preferred in cases {
            let plan = plan_searches(preferred);
            assert_eq!(total(&plan), 5, "plan for {preferred:?}");
        }
    }

    #[test]
    fn every_plan_includes_a_document_search() {
        for preferred in [&[Video][..], &[Paper][..], &[Video, Paper][..]] {
            let plan = plan_searches(preferred);
            assert!(plan.iter().any(|s| s.kind == Document));
        }
    }

    #[test]
    fn preferred_kinds_dominate_their_plan() {
        let plan = plan_searches(&[Paper]);
        let papers: usize = plan
            .iter()
            .filter(|s| s.kind == Paper)
            .map(|s| s.max_results)
            .sum();
        assert_eq!(papers, 4);
    }
}
