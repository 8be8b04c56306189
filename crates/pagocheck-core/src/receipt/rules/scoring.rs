//! Contextual confidence scoring for amount candidates.

use rust_decimal::prelude::ToPrimitive;

use crate::models::config::ScoringWeights;
use crate::models::receipt::{AmountCandidate, ScoredCandidate};

/// Characters surrounding a candidate, inspected for semantic labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextWindow<'a> {
    /// Window text.
    pub text: &'a str,
    /// Byte position of the candidate inside `text`.
    pub anchor: usize,
}

impl<'a> ContextWindow<'a> {
    /// Up to `radius` characters on each side of `offset`.
    pub fn around(text: &'a str, offset: usize, radius: usize) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        let start = if radius == 0 {
            offset
        } else {
            text[..offset]
                .char_indices()
                .rev()
                .nth(radius - 1)
                .map(|(i, _)| i)
                .unwrap_or(0)
        };
        let end = text[offset..]
            .char_indices()
            .nth(radius)
            .map(|(i, _)| offset + i)
            .unwrap_or(text.len());

        Self {
            text: &text[start..end],
            anchor: offset - start,
        }
    }

    /// Text before the candidate.
    pub fn leading(&self) -> &'a str {
        &self.text[..self.anchor]
    }
}

/// Whether the window holds any total-indicating keyword.
pub fn has_total_keyword(window: &ContextWindow<'_>, weights: &ScoringWeights) -> bool {
    let lower = window.text.to_lowercase();
    weights
        .total_keywords
        .iter()
        .any(|k| lower.contains(k.to_lowercase().as_str()))
}

/// Whether the closest label before the candidate is a subtotal.
///
/// "subtotal" contains "total", so on equal end positions the longer
/// keyword wins.
pub fn follows_subtotal_label(window: &ContextWindow<'_>, weights: &ScoringWeights) -> bool {
    let lower = window.leading().to_lowercase();

    let last_end = |keywords: &[String]| {
        keywords
            .iter()
            .map(|k| k.to_lowercase())
            .filter_map(|k| lower.rfind(k.as_str()).map(|pos| (pos + k.len(), k.len())))
            .max()
    };

    match (last_end(&weights.subtotal_keywords), last_end(&weights.total_keywords)) {
        (Some(sub), Some(total)) => sub >= total,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

/// Score one candidate against its context window.
///
/// Starts at `base`, adds the large-value, currency and keyword bonuses,
/// subtracts the subtotal penalty, then clamps to [0, 1] and rounds to two
/// decimals.
pub fn score(candidate: &AmountCandidate, window: &ContextWindow<'_>, weights: &ScoringWeights) -> f64 {
    let mut score = weights.base;

    if candidate.value.to_f64().unwrap_or(0.0) > weights.large_value_threshold {
        score += weights.large_value_bonus;
    }
    if candidate.currency.is_known() {
        score += weights.currency_bonus;
    }
    if has_total_keyword(window, weights) {
        score += weights.keyword_bonus;
    }
    if follows_subtotal_label(window, weights) {
        score -= weights.subtotal_penalty;
    }

    (score.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Score every candidate against `text`, preserving order.
pub fn score_candidates(
    text: &str,
    candidates: Vec<AmountCandidate>,
    weights: &ScoringWeights,
) -> Vec<ScoredCandidate> {
    candidates
        .into_iter()
        .map(|candidate| {
            let window = ContextWindow::around(text, candidate.source_offset, weights.window_radius);
            ScoredCandidate {
                confidence: score(&candidate, &window, weights),
                total_keyword: has_total_keyword(&window, weights),
                candidate,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::CurrencyHint;
    use crate::receipt::rules::amounts::extract_amounts;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn candidate(value: &str, currency: CurrencyHint) -> AmountCandidate {
        AmountCandidate {
            raw_text: value.to_string(),
            value: Decimal::from_str(value).unwrap(),
            currency,
            source_offset: 0,
        }
    }

    #[test]
    fn test_window_bounds() {
        let text = "abcdefghij";
        let window = ContextWindow::around(text, 5, 2);
        assert_eq!(window.text, "defg");
        assert_eq!(window.leading(), "de");

        let window = ContextWindow::around(text, 1, 40);
        assert_eq!(window.text, text);
        assert_eq!(window.anchor, 1);
    }

    #[test]
    fn test_window_multibyte() {
        let text = "Operación pagada S/ 20.00";
        let offset = text.find("20.00").unwrap();
        let window = ContextWindow::around(text, offset, 14);
        assert_eq!(window.leading(), "ión pagada S/ ");
        assert_eq!(window.text, "ión pagada S/ 20.00");
    }

    #[test]
    fn test_base_score() {
        let weights = ScoringWeights::default();
        let window = ContextWindow::around("precio 12", 7, 40);
        assert_eq!(score(&candidate("12", CurrencyHint::Unknown), &window, &weights), 0.5);
    }

    #[test]
    fn test_all_bonuses_clamped() {
        let weights = ScoringWeights::default();
        let window = ContextWindow::around("Importe pagado S/ 120.00", 18, 40);
        // 0.5 + 0.2 + 0.15 + 0.25 = 1.1 -> 1.0
        assert_eq!(score(&candidate("120.00", CurrencyHint::Pen), &window, &weights), 1.0);
    }

    #[test]
    fn test_subtotal_penalty() {
        let weights = ScoringWeights::default();
        let window = ContextWindow::around("Subtotal: 40.00", 10, 40);
        // 0.5 + 0.25 ("total" inside "subtotal") - 0.15
        assert_eq!(score(&candidate("40.00", CurrencyHint::Unknown), &window, &weights), 0.6);
    }

    #[test]
    fn test_total_after_subtotal_not_penalized() {
        let weights = ScoringWeights::default();
        let text = "Subtotal: 40.00 Total: 45.00";
        let window = ContextWindow::around(text, text.rfind("45.00").unwrap(), 40);
        assert!(!follows_subtotal_label(&window, &weights));
    }

    #[test]
    fn test_configured_keywords_ignore_case() {
        let weights = ScoringWeights {
            total_keywords: vec!["Total".to_string()],
            subtotal_keywords: vec!["SubTotal".to_string()],
            ..ScoringWeights::default()
        };

        let window = ContextWindow::around("TOTAL: 45.00", 7, 40);
        assert!(has_total_keyword(&window, &weights));
        assert!(!follows_subtotal_label(&window, &weights));

        let window = ContextWindow::around("subtotal: 40.00", 10, 40);
        assert!(follows_subtotal_label(&window, &weights));
    }

    #[test]
    fn test_scenario_total_ranks_above_subtotal() {
        let weights = ScoringWeights::default();
        let text = "Total: S/ 45.00, Subtotal: S/40.00";
        let scored = score_candidates(text, extract_amounts(text), &weights);

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].candidate.value, Decimal::from_str("45.00").unwrap());
        assert_eq!(scored[0].confidence, 0.9);
        assert_eq!(scored[1].candidate.value, Decimal::from_str("40.00").unwrap());
        assert_eq!(scored[1].confidence, 0.75);
        assert!(scored[0].confidence > scored[1].confidence);
        assert!(scored.iter().all(|s| s.total_keyword));
    }
}
