//! Receipt parser turning provider text into a structured `OcrResult`.

use std::time::Instant;

use chrono::Utc;
use tracing::debug;

use pagocheck_providers::{ProviderId, RecognizedText};

use crate::models::config::ExtractionConfig;
use crate::models::receipt::{OcrResult, SelectedTotal};

use super::rules::{extract_amounts, extract_numbers, normalize, score_candidates, select_total};

/// Pure pipeline: normalize, extract, score, select, collect references.
#[derive(Debug, Clone, Default)]
pub struct ReceiptParser {
    config: ExtractionConfig,
}

impl ReceiptParser {
    /// Create a parser with default tunables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given extraction configuration.
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the maximum number of characters analyzed.
    pub fn with_max_text_length(mut self, max_text_length: usize) -> Self {
        self.config.max_text_length = max_text_length;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Analyze text recognized by `provider`.
    pub fn analyze(&self, provider: ProviderId, recognized: &RecognizedText) -> OcrResult {
        self.analyze_text(provider, &recognized.text, recognized.confidence)
    }

    /// Analyze raw text, e.g. a transcript already stored in the session.
    pub fn analyze_text(
        &self,
        provider: ProviderId,
        raw_text: &str,
        provider_confidence: Option<f64>,
    ) -> OcrResult {
        let start = Instant::now();

        let text = normalize(raw_text, self.config.max_text_length);
        let candidates = score_candidates(&text, extract_amounts(&text), &self.config.scoring);
        let selected_total = select_total(&candidates, &self.config.selection).map(SelectedTotal::from);
        let numbers = extract_numbers(&text, &self.config.numbers);

        debug!(
            "Analyzed {} chars from {}: {} candidates, total {:?}, {} operations, {} accounts in {:?}",
            text.len(),
            provider,
            candidates.len(),
            selected_total.as_ref().map(|t| t.value),
            numbers.operations.len(),
            numbers.accounts.len(),
            start.elapsed()
        );

        OcrResult {
            provider,
            text,
            provider_confidence,
            candidates,
            selected_total,
            operation_numbers: numbers.operations,
            account_numbers: numbers.accounts,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::receipt::CurrencyHint;
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_scenario_total_selected_over_subtotal() {
        let result = ReceiptParser::new().analyze_text(
            ProviderId::GoogleVision,
            "Total: S/ 45.00, Subtotal: S/40.00",
            None,
        );

        let selected = result.selected_total.clone().unwrap();
        assert_eq!(selected.value, dec("45.00"));
        assert_eq!(selected.currency, CurrencyHint::Pen);
        assert_eq!(selected.confidence, 0.9);
        assert!(result.selected_candidate().is_some());
    }

    #[test]
    fn test_yape_voucher() {
        let text = "¡Yapeaste!\r\nS/ 62.50\r\nA Pollería El Rey\r\n\
                    Celular ***\t987654321\r\n\
                    Nro. de operación 04512873\r\n\
                    15 may. 2024 - 01:32 pm";
        let result = ReceiptParser::new().analyze_text(ProviderId::OcrSpace, text, Some(0.88));

        assert_eq!(result.selected_total.as_ref().map(|t| t.value), Some(dec("62.50")));
        assert!(result.account_numbers.contains("987654321"));
        assert!(result.operation_numbers.contains("04512873"));
        assert_eq!(result.provider_confidence, Some(0.88));
        assert!(!result.text.contains('\r'));
    }

    #[test]
    fn test_no_amount() {
        let result = ReceiptParser::new().analyze_text(ProviderId::GoogleVision, "Gracias", None);
        assert!(result.candidates.is_empty());
        assert!(result.selected_total.is_none());
        assert!(!result.has_amount());
    }

    #[test]
    fn test_truncation_applies_before_extraction() {
        let result = ReceiptParser::new()
            .with_max_text_length(12)
            .analyze_text(ProviderId::GoogleVision, "Total S/ 10.00 Otro S/ 99.00", None);
        assert_eq!(result.text, "Total S/ 10.");
        assert_eq!(result.selected_total.map(|t| t.value), Some(dec("10")));
    }
}
