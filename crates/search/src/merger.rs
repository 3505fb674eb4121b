//! Result Merger: blend lexical and semantic lists into one ranking
//!
//! Each branch's scores are min-max normalised within the current result
//! set before blending. The lower bound is anchored at the score floor 0
//! (`min(0, observed min)`), so a matching document never normalises to 0
//! and a single result normalises to 1.
//!
//! `blended = lexical_weight * norm(lexical) + semantic_weight * norm(semantic)`
//!
//! Ordering: blended desc, then raw lexical desc, then document id asc.
//! Documents whose blended score is 0 carry no relevance under the weighting
//! in effect and are dropped.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use patternsearch_core::{DocumentId, ScoredResult, Weighting};

/// Min-max normalise scores into [0, 1] with the lower bound at most 0
pub fn normalize(scores: &[f32]) -> Vec<f32> {
    let upper = scores.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let lower = scores.iter().copied().fold(0.0f32, f32::min);
    let range = upper - lower;
    if !range.is_finite() || range <= 0.0 {
        return vec![0.0; scores.len()];
    }
    scores.iter().map(|s| (s - lower) / range).collect()
}

#[derive(Default)]
struct Candidate {
    lexical: f32,
    semantic: f32,
    lexical_norm: f32,
    semantic_norm: f32,
}

/// Merge branch results into a deduplicated ranking
///
/// Each document appears once. `lexical_score` and `semantic_score` on the
/// output carry the raw branch scores (0 when absent).
pub fn merge(
    lexical: &[(DocumentId, f32)],
    semantic: &[(DocumentId, f32)],
    weighting: Weighting,
) -> Vec<ScoredResult> {
    let mut candidates: BTreeMap<&DocumentId, Candidate> = BTreeMap::new();

    let lexical_norm = normalize(&lexical.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    for ((id, score), norm) in lexical.iter().zip(lexical_norm) {
        let c = candidates.entry(id).or_default();
        // Duplicate entries within one list keep the best score
        if *score >= c.lexical {
            c.lexical = *score;
            c.lexical_norm = norm;
        }
    }

    let semantic_norm = normalize(&semantic.iter().map(|(_, s)| *s).collect::<Vec<_>>());
    for ((id, score), norm) in semantic.iter().zip(semantic_norm) {
        let c = candidates.entry(id).or_default();
        if *score >= c.semantic {
            c.semantic = *score;
            c.semantic_norm = norm;
        }
    }

    let mut results: Vec<ScoredResult> = candidates
        .into_iter()
        .map(|(id, c)| ScoredResult {
            document_id: id.clone(),
            lexical_score: c.lexical,
            semantic_score: c.semantic,
            blended_score: weighting.lexical_weight * c.lexical_norm
                + weighting.semantic_weight * c.semantic_norm,
        })
        .filter(|r| r.blended_score > 0.0)
        .collect();

    results.sort_by(compare_results);
    results
}

/// Ranking order of merged results
pub fn compare_results(a: &ScoredResult, b: &ScoredResult) -> Ordering {
    b.blended_score
        .total_cmp(&a.blended_score)
        .then_with(|| b.lexical_score.total_cmp(&a.lexical_score))
        .then_with(|| a.document_id.cmp(&b.document_id))
}
