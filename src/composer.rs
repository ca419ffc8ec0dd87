//! Budget-constrained composition: the final pass over every resource.
//!
//! Classifies each resource as delete / preserve / emphasize under the
//! learner's total-hour budget, favoring quality and level fit over type
//! preference and minimizing deletions. Runs once, after the refinement loop
//! terminates and before root sequencing.

use std::cmp::Reverse;

use serde::{Deserialize, Serialize};

use crate::config::LearnerProfile;
use crate::curriculum::{CurriculumGraph, Resource};

/// A node retains at most this many resources.
pub const NODE_RESOURCE_CAP: usize = 4;

/// Defaults substituted for unset scores; composition never aborts on a
/// missing field.
pub const DEFAULT_DIFFICULTY: u8 = 5;
pub const DEFAULT_IMPORTANCE: u8 = 5;
pub const DEFAULT_STUDY_LOAD: f64 = 1.0;

/// Classification of one resource by the composer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceAction {
    Delete,
    Preserve,
    Emphasize,
}

/// Tally of composition decisions, for reporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeReport {
    pub emphasized: usize,
    pub preserved: usize,
    pub deleted: usize,
}

/// Sort key for resource value: higher importance first, then closer level
/// fit, then preference match, then id for determinism.
fn value_key(resource: &Resource, learner: &LearnerProfile) -> (Reverse<u8>, u8, Reverse<u8>, String) {
    let importance = resource.importance.unwrap_or(DEFAULT_IMPORTANCE);
    let difficulty = resource.difficulty.unwrap_or(DEFAULT_DIFFICULTY);
    let gap = difficulty.abs_diff(learner.level.target_difficulty());
    let pref = u8::from(learner.prefers(resource.kind));
    (Reverse(importance), gap, Reverse(pref), resource.id.clone())
}

fn load_of(resource: &Resource) -> f64 {
    resource.study_load.unwrap_or(DEFAULT_STUDY_LOAD)
}

/// Classify and apply composition decisions across the whole graph.
///
/// Guarantees:
/// - a node never retains more than [`NODE_RESOURCE_CAP`] resources, and the
///   excess deleted is exactly the lowest-value overflow, never more;
/// - a node never loses its last resource;
/// - the summed study load of emphasized resources stays within
///   `learner.budget_hours`; resources bumped by the budget are preserved,
///   not deleted.
///
/// Every surviving resource leaves with `necessary` set: `Some(true)` for
/// emphasized, `Some(false)` otherwise. Deleted resources are removed from
/// their node's list.
pub fn compose(graph: &mut CurriculumGraph, learner: &LearnerProfile) -> ComposeReport {
    let mut report = ComposeReport::default();

    // Per-node cap pass: trim the lowest-value overflow down to the cap.
    for node in &mut graph.nodes {
        if node.resources.len() <= NODE_RESOURCE_CAP {
            continue;
        }
        let mut ranked = node.resources.clone();
        ranked.sort_by_key(|r| value_key(r, learner));
        let keep: rustc_hash::FxHashSet<String> = ranked
            .iter()
            .take(NODE_RESOURCE_CAP)
            .map(|r| r.id.clone())
            .collect();
        let before = node.resources.len();
        node.resources.retain(|r| keep.contains(&r.id));
        report.deleted += before - node.resources.len();
        tracing::debug!(
            node = %node.id,
            deleted = before - node.resources.len(),
            "resource cap applied"
        );
    }

    // Budget pass: emphasize highest-value resources first, across nodes.
    let mut survivors: Vec<(String, String)> = Vec::new();
    for node in &graph.nodes {
        for resource in &node.resources {
            survivors.push((node.id.clone(), resource.id.clone()));
        }
    }
    let mut ordered = survivors;
    ordered.sort_by_key(|(node_id, resource_id)| {
        let resource = graph
            .node(node_id)
            .and_then(|n| n.resources.iter().find(|r| &r.id == resource_id))
            .expect("survivor ids collected from the same graph");
        value_key(resource, learner)
    });

    let mut emphasized: rustc_hash::FxHashSet<String> = rustc_hash::FxHashSet::default();
    let mut spent = 0.0_f64;
    for (node_id, resource_id) in &ordered {
        let resource = graph
            .node(node_id)
            .and_then(|n| n.resources.iter().find(|r| &r.id == resource_id))
            .expect("survivor ids collected from the same graph");
        let load = load_of(resource);
        if spent + load <= learner.budget_hours {
            spent += load;
            emphasized.insert(resource_id.clone());
        }
    }

    for node in &mut graph.nodes {
        for resource in &mut node.resources {
            let necessary = emphasized.contains(&resource.id);
            resource.necessary = Some(necessary);
            if necessary {
                report.emphasized += 1;
            } else {
                report.preserved += 1;
            }
        }
    }

    tracing::info!(
        emphasized = report.emphasized,
        preserved = report.preserved,
        deleted = report.deleted,
        budget_hours = learner.budget_hours,
        spent_hours = spent,
        "composition complete"
    );
    report
}
