//! Account and operation number extraction.
//!
//! Classification is by digit count only: Peruvian phone-linked wallets
//! (Yape, Plin) show 9-digit accounts, bank vouchers show 10-11 digit
//! ones, and everything else of a plausible length is treated as an
//! operation reference. There is no checksum validation, so expect false
//! positives; results are advisory.

use super::FieldExtractor;
use super::patterns::DIGIT_RUN;
use crate::models::config::NumberRules;
use crate::models::receipt::ReferenceNumbers;

/// Kind of a long digit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberKind {
    /// Bank or wallet account.
    Account,
    /// Operation / transaction reference.
    Operation,
}

/// A classified digit run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceNumber {
    /// The digits.
    pub digits: String,
    /// Length-based classification.
    pub kind: NumberKind,
    /// Byte offset in the source text.
    pub offset: usize,
}

/// Digit-run extractor.
pub struct NumberExtractor {
    rules: NumberRules,
}

impl NumberExtractor {
    pub fn new() -> Self {
        Self {
            rules: NumberRules::default(),
        }
    }

    /// Use custom length ranges.
    pub fn with_rules(mut self, rules: NumberRules) -> Self {
        self.rules = rules;
        self
    }

    fn classify(&self, len: usize) -> Option<NumberKind> {
        if !self.rules.run_range().contains(&len) {
            None
        } else if self.rules.account_range().contains(&len) {
            Some(NumberKind::Account)
        } else {
            Some(NumberKind::Operation)
        }
    }
}

impl Default for NumberExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for NumberExtractor {
    type Output = ReferenceNumber;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DIGIT_RUN
            .find_iter(text)
            .filter_map(|m| {
                self.classify(m.as_str().len()).map(|kind| ReferenceNumber {
                    digits: m.as_str().to_string(),
                    kind,
                    offset: m.start(),
                })
            })
            .collect()
    }
}

/// Collect account-like and operation-like numbers from text.
pub fn extract_numbers(text: &str, rules: &NumberRules) -> ReferenceNumbers {
    let mut numbers = ReferenceNumbers::default();

    for found in NumberExtractor::new().with_rules(rules.clone()).extract_all(text) {
        match found.kind {
            NumberKind::Account => numbers.accounts.insert(found.digits),
            NumberKind::Operation => numbers.operations.insert(found.digits),
        };
    }

    numbers
}
