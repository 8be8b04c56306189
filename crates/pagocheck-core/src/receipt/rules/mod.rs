//! Rule-based field extractors for payment receipts.

pub mod amounts;
pub mod normalize;
pub mod numbers;
pub mod patterns;
pub mod scoring;
pub mod selection;

pub use amounts::{extract_amounts, parse_amount, AmountExtractor};
pub use normalize::{normalize, normalize_default, DEFAULT_MAX_TEXT_LENGTH};
pub use numbers::{extract_numbers, NumberExtractor, NumberKind, ReferenceNumber};
pub use scoring::{score, score_candidates, ContextWindow};
pub use selection::select_total;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;

    /// Extract all occurrences of the field.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}
