//! Receipt data models produced by the OCR pipeline.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pagocheck_providers::ProviderId;

/// Currency detected next to an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CurrencyHint {
    /// Peruvian soles (`S/`, `PEN`, "soles").
    #[serde(rename = "PEN")]
    Pen,
    /// US dollars (`$`, `US$`, `USD`, "dólares").
    #[serde(rename = "USD")]
    Usd,
    /// No currency marker next to the number.
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl CurrencyHint {
    /// Whether a currency marker was present at extraction time.
    pub fn is_known(&self) -> bool {
        !matches!(self, CurrencyHint::Unknown)
    }

    /// Display prefix used in notes.
    pub fn symbol(&self) -> &'static str {
        match self {
            CurrencyHint::Pen => "S/ ",
            CurrencyHint::Usd => "US$ ",
            CurrencyHint::Unknown => "",
        }
    }
}

impl fmt::Display for CurrencyHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CurrencyHint::Pen => "PEN",
            CurrencyHint::Usd => "USD",
            CurrencyHint::Unknown => "unknown",
        })
    }
}

/// A monetary figure found in receipt text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountCandidate {
    /// Matched text, including any currency marker.
    pub raw_text: String,

    /// Parsed value; always non-negative.
    pub value: Decimal,

    /// Currency marker seen with the number.
    pub currency: CurrencyHint,

    /// Byte offset of the numeric literal in the normalized text.
    pub source_offset: usize,
}

/// An amount candidate with its contextual confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// The extracted candidate.
    #[serde(flatten)]
    pub candidate: AmountCandidate,

    /// Confidence in [0, 1], rounded to two decimals.
    pub confidence: f64,

    /// Whether a total-indicating keyword was near the candidate.
    pub total_keyword: bool,
}

/// The single amount chosen as the receipt total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTotal {
    /// Selected value.
    pub value: Decimal,

    /// Currency marker of the selected candidate.
    pub currency: CurrencyHint,

    /// Confidence of the selected candidate.
    pub confidence: f64,

    /// Offset of the selected candidate, linking it back to `candidates`.
    pub source_offset: usize,
}

impl From<&ScoredCandidate> for SelectedTotal {
    fn from(scored: &ScoredCandidate) -> Self {
        Self {
            value: scored.candidate.value,
            currency: scored.candidate.currency,
            confidence: scored.confidence,
            source_offset: scored.candidate.source_offset,
        }
    }
}

/// Long digit runs found in receipt text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceNumbers {
    /// Operation / transaction reference numbers.
    pub operations: BTreeSet<String>,

    /// Account-like numbers (phone-linked wallets).
    pub accounts: BTreeSet<String>,
}

/// Structured result of OCR plus receipt analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrResult {
    /// Provider that produced the text.
    pub provider: ProviderId,

    /// Normalized receipt text.
    pub text: String,

    /// Provider-reported recognition confidence, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_confidence: Option<f64>,

    /// Scored amount candidates, largest value first.
    pub candidates: Vec<ScoredCandidate>,

    /// Most likely paid total.
    pub selected_total: Option<SelectedTotal>,

    /// Operation / reference numbers.
    pub operation_numbers: BTreeSet<String>,

    /// Account-like numbers.
    pub account_numbers: BTreeSet<String>,

    /// When the analysis was produced.
    pub timestamp: DateTime<Utc>,
}

impl OcrResult {
    /// Whether any monetary amount was found.
    pub fn has_amount(&self) -> bool {
        self.selected_total.is_some()
    }

    /// The candidate the selected total was drawn from.
    pub fn selected_candidate(&self) -> Option<&ScoredCandidate> {
        let selected = self.selected_total.as_ref()?;
        self.candidates.iter().find(|c| {
            c.candidate.source_offset == selected.source_offset && c.candidate.value == selected.value
        })
    }
}

/// Format an amount the way Peruvian receipts print it (1,234.50).
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", amount.round_dp(2));
    let (integer_part, decimal_part) = s.split_once('.').unwrap_or((s.as_str(), "00"));
    let (sign, digits) = match integer_part.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", integer_part),
    };

    let chars: Vec<char> = digits.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push(',');
        }
        formatted.push(*c);
    }

    format!("{}{}.{}", sign, formatted, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::from_str("1234.5").unwrap()), "1,234.50");
        assert_eq!(format_amount(Decimal::from_str("45").unwrap()), "45.00");
        assert_eq!(format_amount(Decimal::from_str("-1.5").unwrap()), "-1.50");
        assert_eq!(format_amount(Decimal::from_str("1234567.891").unwrap()), "1,234,567.89");
    }

    #[test]
    fn test_scored_candidate_serializes_flat() {
        let scored = ScoredCandidate {
            candidate: AmountCandidate {
                raw_text: "S/ 45.00".to_string(),
                value: Decimal::from_str("45.00").unwrap(),
                currency: CurrencyHint::Pen,
                source_offset: 10,
            },
            confidence: 0.9,
            total_keyword: true,
        };

        let json = serde_json::to_value(&scored).unwrap();
        assert_eq!(json["raw_text"], "S/ 45.00");
        assert_eq!(json["currency"], "PEN");
        assert_eq!(json["source_offset"], 10);
        assert_eq!(json["confidence"], 0.9);
    }
}
