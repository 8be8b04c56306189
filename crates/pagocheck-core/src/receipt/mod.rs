//! Receipt text analysis.

mod parser;
pub mod rules;

pub use parser::ReceiptParser;
