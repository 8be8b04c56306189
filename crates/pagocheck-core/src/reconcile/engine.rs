//! Reconciliation engine.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use crate::error::{PagoError, Result};
use crate::models::config::ReconciliationConfig;
use crate::models::order::{OrderExpectation, Outcome, ReconciliationVerdict};
use crate::models::receipt::{format_amount, OcrResult};

/// Reconciles OCR results against orders using configured defaults.
#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    config: ReconciliationConfig,
}

impl Reconciler {
    /// Create a reconciler from configuration.
    pub fn new(config: ReconciliationConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    /// Reconcile with the configured tolerance and exactness.
    pub fn reconcile_with_defaults(
        &self,
        ocr: &OcrResult,
        expectation: &OrderExpectation,
    ) -> Result<ReconciliationVerdict> {
        self.reconcile(
            ocr,
            expectation,
            self.config.tolerance,
            self.config.require_exact_match,
        )
    }

    /// Compare the receipt's selected total with the order's expected total.
    ///
    /// Missing amounts are a modeled outcome, not an error; only a bad
    /// tolerance or a non-positive supplied total is rejected.
    pub fn reconcile(
        &self,
        ocr: &OcrResult,
        expectation: &OrderExpectation,
        tolerance: f64,
        require_exact_match: bool,
    ) -> Result<ReconciliationVerdict> {
        if !tolerance.is_finite() || !(0.0..=1.0).contains(&tolerance) {
            return Err(PagoError::Validation(format!(
                "tolerance must be within [0, 1], got {tolerance}"
            )));
        }

        let mut notes = Vec::new();
        let expected_total = resolve_expected_total(expectation, &mut notes)?;

        let mut verdict = ReconciliationVerdict {
            ok: false,
            outcome: Outcome::NoAmountDetected,
            detected_total: None,
            detected_confidence: None,
            expected_total,
            difference: None,
            absolute_difference: None,
            relative_difference: None,
            notes: Vec::new(),
        };

        let Some(selected) = &ocr.selected_total else {
            notes.push("No monetary amount was detected on the receipt".to_string());
            verdict.notes = notes;
            return Ok(verdict);
        };
        verdict.detected_total = Some(selected.value);
        verdict.detected_confidence = Some(selected.confidence);

        let outcome = match expected_total {
            None => {
                if selected.confidence >= self.config.detected_confidence_threshold {
                    notes.push(format!(
                        "Detected {} with confidence {:.2}; nothing to compare against",
                        format_amount(selected.value),
                        selected.confidence
                    ));
                    Outcome::DetectedOnly
                } else {
                    notes.push(format!(
                        "Detected {} with low confidence {:.2} (below {:.2}); nothing to compare against",
                        format_amount(selected.value),
                        selected.confidence,
                        self.config.detected_confidence_threshold
                    ));
                    Outcome::LowConfidenceDetected
                }
            }
            Some(expected) => {
                let difference = selected.value - expected;
                let absolute = difference.abs();
                // A quotient beyond Decimal's range is as far off as it gets.
                let relative = absolute
                    .checked_div(expected)
                    .and_then(|r| r.to_f64())
                    .unwrap_or(f64::INFINITY);

                verdict.difference = Some(difference);
                verdict.absolute_difference = Some(absolute);
                verdict.relative_difference = Some(relative);

                if difference.is_zero() {
                    notes.push(format!(
                        "Detected total {} matches the expected total",
                        format_amount(selected.value)
                    ));
                    Outcome::Match
                } else if relative <= tolerance {
                    notes.push(format!(
                        "Detected {} vs expected {}: off by {} ({:.2}%), within the {:.2}% tolerance",
                        format_amount(selected.value),
                        format_amount(expected),
                        format_amount(absolute),
                        relative * 100.0,
                        tolerance * 100.0
                    ));
                    Outcome::Close
                } else {
                    let direction = if difference.is_sign_negative() { "underpaid" } else { "overpaid" };
                    notes.push(format!(
                        "Detected {} vs expected {}: {} by {} ({:.2}%), beyond the {:.2}% tolerance",
                        format_amount(selected.value),
                        format_amount(expected),
                        direction,
                        format_amount(absolute),
                        relative * 100.0,
                        tolerance * 100.0
                    ));
                    Outcome::Mismatch
                }
            }
        };

        verdict.outcome = if require_exact_match && outcome != Outcome::Match {
            if outcome != Outcome::Mismatch {
                notes.push(format!("An exact match is required; {outcome} is not accepted"));
            }
            Outcome::Mismatch
        } else {
            outcome
        };
        verdict.ok = verdict.outcome.is_ok();
        verdict.notes = notes;

        debug!(
            "Reconciled {:?} against {:?}: {}",
            verdict.detected_total, verdict.expected_total, verdict.outcome
        );
        Ok(verdict)
    }
}

/// Reconcile with an explicit tolerance and default confidence threshold.
pub fn reconcile(
    ocr: &OcrResult,
    expectation: &OrderExpectation,
    tolerance: f64,
    require_exact_match: bool,
) -> Result<ReconciliationVerdict> {
    Reconciler::default().reconcile(ocr, expectation, tolerance, require_exact_match)
}

fn resolve_expected_total(
    expectation: &OrderExpectation,
    notes: &mut Vec<String>,
) -> Result<Option<Decimal>> {
    if let Some(total) = expectation.expected_total {
        if total <= Decimal::ZERO {
            return Err(PagoError::Validation(format!(
                "expected total must be positive, got {total}"
            )));
        }
        return Ok(Some(total));
    }

    if expectation.items.is_empty() {
        notes.push("No expected total supplied and the order has no items".to_string());
        return Ok(None);
    }

    let mut sum = Decimal::ZERO;
    for item in &expectation.items {
        if item.unit_price.is_none() {
            notes.push(format!(
                "Expected total unknown: item {} has no unit price",
                item.id
            ));
            return Ok(None);
        }
        match item.line_total().and_then(|line| sum.checked_add(line)) {
            Some(next) => sum = next,
            None => {
                notes.push(format!(
                    "Expected total unknown: order items overflow at item {}",
                    item.id
                ));
                return Ok(None);
            }
        }
    }

    if sum <= Decimal::ZERO {
        notes.push(format!(
            "Expected total computed from items is not positive ({})",
            format_amount(sum)
        ));
        return Ok(None);
    }

    notes.push(format!(
        "Expected total {} computed from {} order items",
        format_amount(sum),
        expectation.items.len()
    ));
    Ok(Some(sum))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::order::OrderItem;
    use crate::models::receipt::{CurrencyHint, SelectedTotal};
    use chrono::Utc;
    use pagocheck_providers::ProviderId;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn ocr_with(total: Option<(&str, f64)>) -> OcrResult {
        OcrResult {
            provider: ProviderId::GoogleVision,
            text: String::new(),
            provider_confidence: None,
            candidates: Vec::new(),
            selected_total: total.map(|(value, confidence)| SelectedTotal {
                value: dec(value),
                currency: CurrencyHint::Pen,
                confidence,
                source_offset: 0,
            }),
            operation_numbers: Default::default(),
            account_numbers: Default::default(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_exact_match() {
        let verdict = reconcile(
            &ocr_with(Some(("45.00", 0.9))),
            &OrderExpectation::with_total(dec("45.00")),
            0.06,
            false,
        )
        .unwrap();

        assert!(verdict.ok);
        assert_eq!(verdict.outcome, Outcome::Match);
        assert_eq!(verdict.absolute_difference, Some(Decimal::ZERO));
        assert_eq!(verdict.relative_difference, Some(0.0));
        assert_eq!(verdict.notes.len(), 1);
    }

    #[test]
    fn test_close_within_tolerance() {
        let verdict = reconcile(
            &ocr_with(Some(("46.50", 0.8))),
            &OrderExpectation::with_total(dec("45.00")),
            0.06,
            false,
        )
        .unwrap();

        assert!(verdict.ok);
        assert_eq!(verdict.outcome, Outcome::Close);
        assert_eq!(verdict.difference, Some(dec("1.50")));
        let relative = verdict.relative_difference.unwrap();
        assert!((relative - 0.0333).abs() < 1e-4);
    }

    #[test]
    fn test_mismatch_beyond_tolerance() {
        let verdict = reconcile(
            &ocr_with(Some(("46.50", 0.8))),
            &OrderExpectation::with_total(dec("45.00")),
            0.01,
            false,
        )
        .unwrap();

        assert!(!verdict.ok);
        assert_eq!(verdict.outcome, Outcome::Mismatch);
    }

    #[test]
    fn test_underpayment_is_mismatch() {
        let verdict = reconcile(
            &ocr_with(Some(("30.00", 0.95))),
            &OrderExpectation::with_total(dec("45.00")),
            0.06,
            false,
        )
        .unwrap();

        assert_eq!(verdict.outcome, Outcome::Mismatch);
        assert_eq!(verdict.difference, Some(dec("-15.00")));
        assert_eq!(verdict.absolute_difference, Some(dec("15.00")));
        assert!(verdict.notes[0].contains("underpaid"));
    }

    #[test]
    fn test_no_amount_detected() {
        let verdict = reconcile(
            &ocr_with(None),
            &OrderExpectation::with_total(dec("45.00")),
            0.06,
            false,
        )
        .unwrap();

        assert!(!verdict.ok);
        assert_eq!(verdict.outcome, Outcome::NoAmountDetected);
        assert_eq!(verdict.expected_total, Some(dec("45.00")));
        assert_eq!(verdict.detected_total, None);
        assert!(!verdict.notes.is_empty());
    }

    #[test]
    fn test_detected_only_and_low_confidence() {
        let empty = OrderExpectation::default();

        let confident = reconcile(&ocr_with(Some(("45.00", 0.7))), &empty, 0.06, false).unwrap();
        assert!(confident.ok);
        assert_eq!(confident.outcome, Outcome::DetectedOnly);

        let unsure = reconcile(&ocr_with(Some(("45.00", 0.65))), &empty, 0.06, false).unwrap();
        assert!(unsure.ok);
        assert_eq!(unsure.outcome, Outcome::LowConfidenceDetected);
        assert_eq!(unsure.notes.len(), 2);
    }

    #[test]
    fn test_require_exact_match() {
        let close = reconcile(
            &ocr_with(Some(("46.50", 0.8))),
            &OrderExpectation::with_total(dec("45.00")),
            0.06,
            true,
        )
        .unwrap();
        assert!(!close.ok);
        assert_eq!(close.outcome, Outcome::Mismatch);

        let exact = reconcile(
            &ocr_with(Some(("45.00", 0.8))),
            &OrderExpectation::with_total(dec("45.00")),
            0.06,
            true,
        )
        .unwrap();
        assert!(exact.ok);
        assert_eq!(exact.outcome, Outcome::Match);

        let beyond = reconcile(
            &ocr_with(Some(("46.50", 0.8))),
            &OrderExpectation::with_total(dec("45.00")),
            0.01,
            true,
        )
        .unwrap();
        assert!(!beyond.ok);
        assert_eq!(beyond.outcome, Outcome::Mismatch);
        assert_eq!(beyond.notes.len(), 1);
    }

    #[test]
    fn test_require_exact_match_without_expected_total() {
        let verdict = reconcile(
            &ocr_with(Some(("45.00", 0.9))),
            &OrderExpectation::default(),
            0.06,
            true,
        )
        .unwrap();

        assert!(!verdict.ok);
        assert_eq!(verdict.outcome, Outcome::Mismatch);
        assert_eq!(verdict.expected_total, None);
        assert!(verdict.notes.iter().any(|n| n.contains("exact match is required")));
    }

    #[test]
    fn test_tiny_expected_total_is_mismatch() {
        let verdict = reconcile(
            &ocr_with(Some(("99999", 0.9))),
            &OrderExpectation::with_total(Decimal::new(1, 28)),
            0.06,
            false,
        )
        .unwrap();

        assert!(!verdict.ok);
        assert_eq!(verdict.outcome, Outcome::Mismatch);
        assert_eq!(verdict.relative_difference, Some(f64::INFINITY));
    }

    #[test]
    fn test_overflowing_items_leave_expected_undefined() {
        let single = OrderExpectation::from_items(vec![OrderItem::new("banquete", Decimal::MAX, 2)]);
        let verdict = reconcile(&ocr_with(Some(("45.00", 0.9))), &single, 0.06, false).unwrap();
        assert_eq!(verdict.expected_total, None);
        assert_eq!(verdict.outcome, Outcome::DetectedOnly);
        assert!(verdict.notes[0].contains("overflow at item banquete"));

        let summed = OrderExpectation::from_items(vec![
            OrderItem::new("a", Decimal::MAX, 1),
            OrderItem::new("b", Decimal::MAX, 1),
        ]);
        let verdict = reconcile(&ocr_with(Some(("45.00", 0.9))), &summed, 0.06, false).unwrap();
        assert_eq!(verdict.expected_total, None);
        assert!(verdict.notes[0].contains("overflow at item b"));
    }

    #[test]
    fn test_expected_total_from_items() {
        let expectation = OrderExpectation::from_items(vec![
            OrderItem::new("lomo-saltado", dec("28.00"), 1).with_extras(dec("2.00")),
            OrderItem::new("inca-kola", dec("7.50"), 2),
        ]);

        let verdict = reconcile(&ocr_with(Some(("45.00", 0.9))), &expectation, 0.06, false).unwrap();

        assert_eq!(verdict.expected_total, Some(dec("45.00")));
        assert_eq!(verdict.outcome, Outcome::Match);
        assert!(verdict.notes[0].contains("computed from 2 order items"));
    }

    #[test]
    fn test_unpriced_item_leaves_expected_undefined() {
        let expectation = OrderExpectation::from_items(vec![
            OrderItem::new("lomo-saltado", dec("28.00"), 1),
            OrderItem {
                id: "postre".into(),
                unit_price: None,
                quantity: 1,
                extras_price: None,
            },
        ]);

        let verdict = reconcile(&ocr_with(Some(("45.00", 0.9))), &expectation, 0.06, false).unwrap();

        assert_eq!(verdict.expected_total, None);
        assert_eq!(verdict.outcome, Outcome::DetectedOnly);
        assert!(verdict.notes[0].contains("postre"));
    }

    #[test]
    fn test_rejects_invalid_input() {
        let ocr = ocr_with(Some(("45.00", 0.9)));
        let expectation = OrderExpectation::with_total(dec("45.00"));

        assert!(matches!(
            reconcile(&ocr, &expectation, 1.5, false),
            Err(PagoError::Validation(_))
        ));
        assert!(matches!(
            reconcile(&ocr, &expectation, f64::NAN, false),
            Err(PagoError::Validation(_))
        ));
        assert!(matches!(
            reconcile(&ocr, &OrderExpectation::with_total(Decimal::ZERO), 0.06, false),
            Err(PagoError::Validation(_))
        ));
    }

    #[test]
    fn test_defaults_from_config() {
        let reconciler = Reconciler::new(ReconciliationConfig {
            tolerance: 0.01,
            ..ReconciliationConfig::default()
        });

        let verdict = reconciler
            .reconcile_with_defaults(
                &ocr_with(Some(("46.50", 0.8))),
                &OrderExpectation::with_total(dec("45.00")),
            )
            .unwrap();
        assert_eq!(verdict.outcome, Outcome::Mismatch);
    }
}
