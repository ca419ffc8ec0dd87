//! Description specialist: fill in missing concept descriptions.

use std::sync::Arc;
use tracing::instrument;

use crate::advisor::{Advisor, with_deadline};
use crate::config::EngineConfig;
use crate::curriculum::{ConceptNode, CurriculumGraph};
use crate::merge::GraphDelta;
use crate::specialists::{SpecialistError, SpecialistOutput};

/// Asks the advisor to align descriptions (and concept importance) for every
/// node in the snapshot that lacks one, and returns the result as a
/// field-only delta: untouched fields stay unset so the merge cannot clobber
/// concurrent work.
pub struct DescriptionSpecialist {
    advisor: Arc<dyn Advisor>,
    config: EngineConfig,
}

impl DescriptionSpecialist {
    #[must_use]
    pub fn new(advisor: Arc<dyn Advisor>, config: EngineConfig) -> Self {
        Self { advisor, config }
    }

    #[instrument(skip_all, fields(round))]
    pub async fn run(
        &self,
        snapshot: &CurriculumGraph,
        round: u32,
    ) -> Result<SpecialistOutput, SpecialistError> {
        let targets: Vec<ConceptNode> = snapshot
            .nodes
            .iter()
            .filter(|n| n.missing_description())
            .cloned()
            .collect();
        if targets.is_empty() {
            return Ok(SpecialistOutput::Delta(GraphDelta::new()));
        }

        let alignment = match with_deadline(
            self.config.advisor_timeout,
            self.advisor.align_descriptions(&snapshot.meta, &targets),
        )
        .await
        {
            Ok(alignment) => alignment,
            Err(error) if error.is_unavailable() => {
                return Err(SpecialistError::Advisor(error));
            }
            Err(error) => {
                tracing::warn!(%error, round, "description alignment skipped this round");
                return Ok(SpecialistOutput::Delta(GraphDelta::new()));
            }
        };

        let mut nodes: Vec<ConceptNode> = Vec::new();
        for target in &targets {
            let Some(aligned) = alignment.concepts.get(&target.id) else {
                continue;
            };
            if aligned.description.trim().is_empty() {
                continue;
            }
            let mut patch = target.clone();
            patch.description = Some(aligned.description.clone());
            patch.importance = aligned.importance.or(target.importance);
            // Resources ride along empty; the merge unions by id, so an empty
            // list leaves the node's resources untouched.
            patch.resources = Vec::new();
            nodes.push(patch);
        }

        tracing::debug!(
            round,
            requested = targets.len(),
            described = nodes.len(),
            "description alignment complete"
        );
        Ok(SpecialistOutput::Delta(GraphDelta::new().with_nodes(nodes)))
    }
}
