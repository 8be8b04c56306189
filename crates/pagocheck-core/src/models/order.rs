//! Order expectations and reconciliation verdicts.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One line of the customer's order as stored in the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Catalog identifier.
    pub id: String,

    /// Unit price; absent when the session only holds the product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,

    /// Ordered quantity.
    #[serde(default = "default_quantity")]
    pub quantity: u32,

    /// Price of extras (toppings, sides) for the whole line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extras_price: Option<Decimal>,
}

fn default_quantity() -> u32 {
    1
}

impl OrderItem {
    /// Create a priced line item without extras.
    pub fn new(id: impl Into<String>, unit_price: Decimal, quantity: u32) -> Self {
        Self {
            id: id.into(),
            unit_price: Some(unit_price),
            quantity,
            extras_price: None,
        }
    }

    /// Add extras to the line.
    pub fn with_extras(mut self, extras_price: Decimal) -> Self {
        self.extras_price = Some(extras_price);
        self
    }

    /// `unit_price * quantity + extras_price`, when the line is priced.
    ///
    /// `None` when the unit price is missing or the line overflows `Decimal`.
    pub fn line_total(&self) -> Option<Decimal> {
        let unit = self.unit_price?;
        unit.checked_mul(Decimal::from(self.quantity))?
            .checked_add(self.extras_price.unwrap_or_default())
    }
}

/// What the order store says the customer should have paid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExpectation {
    /// Total supplied by the order store, when it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_total: Option<Decimal>,

    /// Order lines, used when no total is supplied.
    #[serde(default)]
    pub items: Vec<OrderItem>,
}

impl OrderExpectation {
    /// Expectation with a known total.
    pub fn with_total(expected_total: Decimal) -> Self {
        Self {
            expected_total: Some(expected_total),
            items: Vec::new(),
        }
    }

    /// Expectation computed from order lines.
    pub fn from_items(items: Vec<OrderItem>) -> Self {
        Self {
            expected_total: None,
            items,
        }
    }
}

/// Reconciliation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Detected total equals the expected total.
    Match,
    /// Different, but within the relative tolerance.
    Close,
    /// Outside tolerance, or not exact when exactness is required.
    Mismatch,
    /// No expected total; detected amount is confident.
    DetectedOnly,
    /// No expected total; detected amount is not confident.
    LowConfidenceDetected,
    /// No monetary amount on the receipt.
    NoAmountDetected,
}

impl Outcome {
    /// Whether the outcome lets the order proceed.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Outcome::Mismatch | Outcome::NoAmountDetected)
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Match => "match",
            Outcome::Close => "close",
            Outcome::Mismatch => "mismatch",
            Outcome::DetectedOnly => "detected_only",
            Outcome::LowConfidenceDetected => "low_confidence_detected",
            Outcome::NoAmountDetected => "no_amount_detected",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict of comparing a receipt against an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationVerdict {
    /// Whether the payment can be accepted.
    pub ok: bool,

    /// Decision category.
    pub outcome: Outcome,

    /// Total read from the receipt.
    pub detected_total: Option<Decimal>,

    /// Confidence of the detected total.
    pub detected_confidence: Option<f64>,

    /// Total the customer should have paid.
    pub expected_total: Option<Decimal>,

    /// `detected - expected`; negative means underpayment.
    pub difference: Option<Decimal>,

    /// `|detected - expected|`.
    pub absolute_difference: Option<Decimal>,

    /// `|detected - expected| / expected`.
    pub relative_difference: Option<f64>,

    /// Human-readable reasoning, in decision order.
    pub notes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_line_total() {
        let item = OrderItem::new("lomo-saltado", dec("28.00"), 2).with_extras(dec("3.50"));
        assert_eq!(item.line_total(), Some(dec("59.50")));

        let unpriced = OrderItem {
            id: "chicha".into(),
            unit_price: None,
            quantity: 1,
            extras_price: None,
        };
        assert_eq!(unpriced.line_total(), None);

        let huge = OrderItem::new("banquete", Decimal::MAX, 2);
        assert_eq!(huge.line_total(), None);
    }

    #[test]
    fn test_outcome_ok() {
        assert!(Outcome::Match.is_ok());
        assert!(Outcome::Close.is_ok());
        assert!(Outcome::DetectedOnly.is_ok());
        assert!(Outcome::LowConfidenceDetected.is_ok());
        assert!(!Outcome::Mismatch.is_ok());
        assert!(!Outcome::NoAmountDetected.is_ok());
    }

    #[test]
    fn test_item_quantity_defaults_to_one() {
        let item: OrderItem = serde_json::from_str(r#"{"id": "inca-kola", "unit_price": "5.00"}"#).unwrap();
        assert_eq!(item.quantity, 1);
        assert_eq!(item.line_total(), Some(dec("5.00")));
    }
}
