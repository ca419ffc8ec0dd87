//! Engine configuration and learner profile.
//!
//! Configuration is an explicit value threaded through every call; nothing in
//! the engine reads ambient/global state. [`EngineConfig::from_env`] exists
//! for binaries that want `.env`-style overrides, and resolves once at
//! startup.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::curriculum::ResourceKind;

/// Hard cap on refinement rounds.
pub const MAX_ITERATIONS: u32 = 6;

/// Upper bound on concurrently in-flight per-node discovery evaluations.
pub const DISCOVERY_CONCURRENCY: usize = 5;

/// Self-assessed level of the learner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LearnerLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl LearnerLevel {
    /// Difficulty (1–10) a resource should sit near to fit this level.
    #[must_use]
    pub fn target_difficulty(&self) -> u8 {
        match self {
            LearnerLevel::Beginner => 3,
            LearnerLevel::Intermediate => 5,
            LearnerLevel::Advanced => 8,
        }
    }
}

/// What the curriculum is being built for: level, purpose, time budget, and
/// resource-type preferences.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LearnerProfile {
    pub level: LearnerLevel,
    pub purpose: String,
    /// Total hours the learner is willing to invest; the budget composer
    /// keeps the emphasized study load within this bound.
    pub budget_hours: f64,
    pub preferred_kinds: Vec<ResourceKind>,
    pub known_concepts: Vec<String>,
}

impl Default for LearnerProfile {
    fn default() -> Self {
        Self {
            level: LearnerLevel::Intermediate,
            purpose: "simple_study".into(),
            budget_hours: 10.0,
            preferred_kinds: vec![ResourceKind::Document],
            known_concepts: Vec::new(),
        }
    }
}

impl LearnerProfile {
    #[must_use]
    pub fn prefers(&self, kind: ResourceKind) -> bool {
        self.preferred_kinds.contains(&kind)
    }
}

/// Tunables for one refinement run.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Hard cap on refinement rounds before forced composition.
    pub max_iterations: u32,
    /// Concurrency limit on per-node discovery work.
    pub discovery_concurrency: usize,
    /// Resources selected per node by the ranker.
    pub top_n: usize,
    /// Preferred-kind selections guaranteed per node when available.
    pub min_preferred: usize,
    /// Deadline on every advisor call.
    pub advisor_timeout: Duration,
    /// Deadline on every catalog search call.
    pub search_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            discovery_concurrency: DISCOVERY_CONCURRENCY,
            top_n: crate::ranker::DEFAULT_TOP_N,
            min_preferred: crate::ranker::DEFAULT_MIN_PREFERRED,
            advisor_timeout: Duration::from_secs(90),
            search_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment, falling back to defaults.
    ///
    /// Loads a `.env` file when present. Recognized variables:
    /// `STUDYWEAVE_MAX_ITERATIONS`, `STUDYWEAVE_DISCOVERY_CONCURRENCY`,
    /// `STUDYWEAVE_ADVISOR_TIMEOUT_SECS`, `STUDYWEAVE_SEARCH_TIMEOUT_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let mut config = Self::default();
        if let Some(value) = read_env("STUDYWEAVE_MAX_ITERATIONS") {
            config.max_iterations = value;
        }
        if let Some(value) = read_env("STUDYWEAVE_DISCOVERY_CONCURRENCY") {
            config.discovery_concurrency = value;
        }
        if let Some(secs) = read_env("STUDYWEAVE_ADVISOR_TIMEOUT_SECS") {
            config.advisor_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = read_env("STUDYWEAVE_SEARCH_TIMEOUT_SECS") {
            config.search_timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn read_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, raw = %raw, "ignoring unparseable environment override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_targets_are_ordered() {
        assert!(
            LearnerLevel::Beginner.target_difficulty()
                < LearnerLevel::Intermediate.target_difficulty()
        );
        assert!(
            LearnerLevel::Intermediate.target_difficulty()
                < LearnerLevel::Advanced.target_difficulty()
        );
    }

    #[test]
    fn default_config_matches_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.max_iterations, 6);
        assert_eq!(config.discovery_concurrency, 5);
        assert_eq!(config.top_n, 3);
        assert_eq!(config.min_preferred, 1);
    }
}
