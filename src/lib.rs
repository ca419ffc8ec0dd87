//! # Studyweave: Curriculum Graph Refinement Engine
//!
//! Studyweave builds a personalized study curriculum for a target document:
//! a graph of concept nodes with prerequisite edges and attached learning
//! resources, refined over concurrent specialist rounds until an advisory
//! capability judges it sufficient or the iteration cap is hit.
//!
//! ## Core Concepts
//!
//! - **Curriculum graph**: typed nodes/edges/resources, the single canonical
//!   state of a run ([`curriculum`])
//! - **Transformer**: one-shot bootstrap of an externally discovered raw
//!   graph into canonical ids ([`transform`])
//! - **Diagnosis**: rule pre-check plus concurrent advisory judgments that
//!   decide what work remains ([`orchestrator`])
//! - **Specialists**: description alignment, resource discovery, and concept
//!   expansion, fanned out per round ([`specialists`])
//! - **Merge reducer**: conflict-free combination of specialist deltas into
//!   the canonical graph ([`merge`])
//! - **Composition & sequencing**: budget-constrained resource selection and
//!   root ordering once refinement terminates ([`composer`], [`sequencer`])
//!
//! ## Execution Model
//!
//! ```text
//! transform ──▶ loop {
//!     diagnose            rule tier first, advisory fan-out second
//!     dispatch            specialists run concurrently on one snapshot
//!     barrier join        every branch finishes before anything merges
//!     merge deltas        single writer; ids minted at the merge step
//! } until no work remains or the cap is hit
//!     compose ──▶ sequence roots ──▶ done
//! ```
//!
//! External capabilities are traits supplied by the caller: the
//! [`advisor::Advisor`] producing structured judgments and the
//! [`catalog::Catalog`] producing candidate resources. Flaky output degrades
//! to documented defaults at the boundary; only a capability that is
//! unreachable outright aborts a run, and even then the partial graph is
//! returned intact.
//!
//! ## Module Guide
//!
//! - [`curriculum`] - Canonical graph model and task vocabulary
//! - [`transform`] - Raw graph bootstrap
//! - [`orchestrator`] - Diagnostic policy
//! - [`engine`] - Round scheduling, the refinement loop, run reports
//! - [`merge`] - Delta reducer
//! - [`specialists`] - Concurrent specialist stages
//! - [`ranker`] - Candidate scoring and selection
//! - [`composer`] - Budget-constrained resource composition
//! - [`sequencer`] - Root ordering with self-healing validation
//! - [`advisor`] / [`catalog`] - Capability boundaries
//! - [`json_guard`] - Parse-or-default helpers for advisor implementors
//! - [`events`] - Progress event channel
//! - [`config`] - Engine configuration and learner profile
//! - [`telemetry`] - Tracing setup

pub mod advisor;
pub mod catalog;
pub mod composer;
pub mod config;
pub mod curriculum;
pub mod engine;
pub mod events;
pub mod ids;
pub mod json_guard;
pub mod merge;
pub mod orchestrator;
pub mod ranker;
pub mod sequencer;
pub mod specialists;
pub mod telemetry;
pub mod transform;
