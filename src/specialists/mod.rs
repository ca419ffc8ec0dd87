//! Specialist stages dispatched concurrently by the round scheduler.
//!
//! Every specialist works against an immutable snapshot of the graph taken at
//! round start and returns its contribution as data; the engine alone turns
//! contributions into [`crate::merge::GraphDelta`]s and merges them, so no
//! specialist ever mutates shared state. External-call timeouts are absorbed
//! here and become an empty contribution for the round: a slow provider can
//! cost a round its output, never its integrity.

mod description;
mod discovery;
mod expansion;

pub use description::DescriptionSpecialist;
pub use discovery::{DiscoverySpecialist, NodeCandidates};
pub use expansion::{ExpansionOutcome, ExpansionSpecialist};

use miette::Diagnostic;
use thiserror::Error;

use crate::advisor::AdvisorError;
use crate::catalog::CatalogError;
use crate::merge::GraphDelta;

/// Contribution of one specialist for one round.
///
/// Discovery and expansion return raw material rather than finished deltas:
/// canonical ids are minted by the engine's single allocator at merge time,
/// never inside a concurrently running specialist.
#[derive(Clone, Debug)]
pub enum SpecialistOutput {
    /// A ready-to-merge delta (description stage).
    Delta(GraphDelta),
    /// Selected, evaluated candidates per node (discovery stage).
    Discovered(Vec<NodeCandidates>),
    /// Validated supplementary concepts and edges (expansion stage).
    Expanded(ExpansionOutcome),
}

/// The one failure class a specialist cannot absorb: a capability that is
/// gone entirely. Everything else degrades to an empty contribution.
#[derive(Debug, Error, Diagnostic)]
pub enum SpecialistError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Advisor(AdvisorError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Catalog(CatalogError),
}
