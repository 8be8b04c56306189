//! Common regex patterns for payment receipt extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// A number with optional thousands groups and up to two decimals
/// (`45`, `45.5`, `24,00`, `1,234.50`, `1.234,50`).
macro_rules! number {
    () => {
        r"\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?"
    };
}

/// Currency words that may trail a bare number.
macro_rules! currency_word {
    () => {
        r"(?:\s*(?P<word>soles|sol|d[oó]lares|dollars)\b)?"
    };
}

lazy_static! {
    // Soles prefix: "S/ 24.00", "s/24", "S/. 1,250.00"
    pub static ref SOLES_AMOUNT: Regex = Regex::new(
        concat!(r"(?i)\bS/\.?\s*(?P<num>", number!(), r")\b")
    ).unwrap();

    // ISO code: "PEN 24.00", "PEN. 24"
    pub static ref PEN_AMOUNT: Regex = Regex::new(
        concat!(r"(?i)\bPEN\.?\s*(?P<num>", number!(), r")\b")
    ).unwrap();

    // Dollars: "$ 12.50", "US$12", "USD 12.00"
    pub static ref USD_AMOUNT: Regex = Regex::new(
        concat!(r"(?i)(?:\bUS\$|\$|\bUSD\.?)\s*(?P<num>", number!(), r")\b")
    ).unwrap();

    // Bare two-decimal numbers: "45.00", "1,234.50 soles"
    pub static ref DECIMAL_AMOUNT: Regex = Regex::new(
        concat!(
            r"(?i)\b(?P<num>\d{1,3}(?:[.,]\d{3})+[.,]\d{2}|\d+[.,]\d{2})\b",
            currency_word!()
        )
    ).unwrap();

    // Numeric tokens; only pure integers are kept by the extractor.
    pub static ref INTEGER_TOKEN: Regex = Regex::new(
        concat!(r"(?i)\b(?P<num>\d+(?:[.,]\d+)*)", currency_word!())
    ).unwrap();

    // Maximal digit runs for account / operation numbers.
    pub static ref DIGIT_RUN: Regex = Regex::new(r"\d+").unwrap();
}
