//! Resource ranking: dedup, score, and select a bounded top set.
//!
//! Candidates arrive already evaluated (difficulty/importance/quality/study
//! load); this module only dedups by url, applies the preference-weighted
//! quality score, and selects the top set with a minimum-preferred guarantee.

use rustc_hash::FxHashSet;

use crate::catalog::EvaluatedCandidate;
use crate::curriculum::ResourceKind;

/// Resources returned per node.
pub const DEFAULT_TOP_N: usize = 3;

/// Preferred-kind selections guaranteed when available.
pub const DEFAULT_MIN_PREFERRED: usize = 1;

/// Score multiplier for candidates of a preferred kind.
pub const PREFERRED_WEIGHT: f64 = 1.5;

/// Quality substituted when the evaluation step left it unset.
pub const DEFAULT_QUALITY: u8 = 3;

/// `score = quality × (1.5 if preferred kind else 1.0)`.
///
/// Returns the score and whether the candidate's kind is preferred.
#[must_use]
pub fn score(candidate: &EvaluatedCandidate, preferred: &[ResourceKind]) -> (f64, bool) {
    let is_preferred = preferred.contains(&candidate.kind);
    let quality = f64::from(candidate.quality.unwrap_or(DEFAULT_QUALITY));
    let weight = if is_preferred { PREFERRED_WEIGHT } else { 1.0 };
    (quality * weight, is_preferred)
}

/// Select up to `top_n` candidates, guaranteeing at least `min_preferred`
/// preferred-kind picks when that many exist.
///
/// - Candidates are deduplicated by url before scoring; the first occurrence
///   wins. Candidates whose url is in `excluded_urls` (already attached to
///   the node) are dropped entirely.
/// - Preferred candidates are sorted by score descending and the top
///   `min_preferred` taken unconditionally (all of them if fewer exist).
/// - The remaining slots are filled from all not-yet-selected candidates,
///   again by score descending.
#[must_use]
pub fn select_top(
    candidates: Vec<EvaluatedCandidate>,
    preferred: &[ResourceKind],
    top_n: usize,
    min_preferred: usize,
    excluded_urls: &FxHashSet<String>,
) -> Vec<EvaluatedCandidate> {
    if top_n == 0 {
        return Vec::new();
    }

    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut scored: Vec<(f64, bool, EvaluatedCandidate)> = Vec::new();
    for candidate in candidates {
        if candidate.url.is_empty()
            || excluded_urls.contains(&candidate.url)
            || !seen.insert(candidate.url.clone())
        {
            continue;
        }
        let (value, is_preferred) = score(&candidate, preferred);
        scored.push((value, is_preferred, candidate));
    }

    let (mut preferred_pool, mut rest): (Vec<_>, Vec<_>) =
        scored.into_iter().partition(|(_, p, _)| *p);
    // Stable sorts keep insertion order on score ties.
    preferred_pool.sort_by(|a, b| b.0.total_cmp(&a.0));

    let take = min_preferred.min(preferred_pool.len()).min(top_n);
    let mut selected: Vec<EvaluatedCandidate> = Vec::with_capacity(top_n);
    let leftovers: Vec<_> = preferred_pool.split_off(take);
    selected.extend(preferred_pool.into_iter().map(|(_, _, c)| c));

    rest.extend(leftovers);
    rest.sort_by(|a, b| b.0.total_cmp(&a.0));
    for (_, _, candidate) in rest {
        if selected.len() >= top_n {
            break;
        }
        selected.push(candidate);
    }

    selected
}
