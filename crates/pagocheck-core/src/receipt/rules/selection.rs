//! Total selection among scored candidates.

use rust_decimal::prelude::ToPrimitive;

use crate::models::config::SelectionWeights;
use crate::models::receipt::ScoredCandidate;

/// Pick the most likely paid total.
///
/// Candidates near a total keyword are ranked by `confidence + value /
/// value_divisor`, so confidence dominates and value only breaks ties.
/// Without any keyword match every candidate is ranked by `value *
/// (confidence + confidence_offset)`. Ties keep the earlier candidate.
pub fn select_total<'a>(
    candidates: &'a [ScoredCandidate],
    weights: &SelectionWeights,
) -> Option<&'a ScoredCandidate> {
    let value = |c: &ScoredCandidate| c.candidate.value.to_f64().unwrap_or(0.0);

    if candidates.iter().any(|c| c.total_keyword) {
        best_by(candidates.iter().filter(|c| c.total_keyword), |c| {
            c.confidence + value(c) / weights.value_divisor
        })
    } else {
        best_by(candidates.iter(), |c| value(c) * (c.confidence + weights.confidence_offset))
    }
}

fn best_by<'a>(
    candidates: impl Iterator<Item = &'a ScoredCandidate>,
    rank: impl Fn(&ScoredCandidate) -> f64,
) -> Option<&'a ScoredCandidate> {
    let mut best: Option<(&ScoredCandidate, f64)> = None;
    for candidate in candidates {
        let r = rank(candidate);
        match best {
            Some((_, best_rank)) if r <= best_rank => {}
            _ => best = Some((candidate, r)),
        }
    }
    best.map(|(c, _)| c)
}
