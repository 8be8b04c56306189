//! Amount extraction for payment receipts.

use std::str::FromStr;

use regex::Regex;
use rust_decimal::Decimal;

use super::FieldExtractor;
use super::patterns::{DECIMAL_AMOUNT, INTEGER_TOKEN, PEN_AMOUNT, SOLES_AMOUNT, USD_AMOUNT};
use crate::models::receipt::{AmountCandidate, CurrencyHint};

/// Longest bare integer still treated as an amount; longer runs are
/// references or account numbers.
const MAX_INTEGER_DIGITS: usize = 5;

/// Amount field extractor.
pub struct AmountExtractor;

impl AmountExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Families with a fixed currency, most specific first.
    fn currency_families() -> [(&'static Regex, CurrencyHint); 3] {
        [
            (&*SOLES_AMOUNT, CurrencyHint::Pen),
            (&*PEN_AMOUNT, CurrencyHint::Pen),
            (&*USD_AMOUNT, CurrencyHint::Usd),
        ]
    }

    fn push_unique(results: &mut Vec<AmountCandidate>, candidate: AmountCandidate) {
        let duplicate = results
            .iter()
            .any(|c| c.source_offset == candidate.source_offset && c.value == candidate.value);
        if !duplicate {
            results.push(candidate);
        }
    }
}

impl Default for AmountExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for AmountExtractor {
    type Output = AmountCandidate;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        let mut results = Vec::new();

        for (pattern, currency) in Self::currency_families() {
            for caps in pattern.captures_iter(text) {
                let (Some(full), Some(num)) = (caps.get(0), caps.name("num")) else {
                    continue;
                };
                if let Some(value) = parse_amount(num.as_str()) {
                    Self::push_unique(&mut results, AmountCandidate {
                        raw_text: full.as_str().to_string(),
                        value,
                        currency,
                        source_offset: num.start(),
                    });
                }
            }
        }

        for caps in DECIMAL_AMOUNT.captures_iter(text) {
            let (Some(full), Some(num)) = (caps.get(0), caps.name("num")) else {
                continue;
            };
            if let Some(value) = parse_amount(num.as_str()) {
                Self::push_unique(&mut results, AmountCandidate {
                    raw_text: full.as_str().to_string(),
                    value,
                    currency: currency_from_word(caps.name("word").map(|m| m.as_str())),
                    source_offset: num.start(),
                });
            }
        }

        for caps in INTEGER_TOKEN.captures_iter(text) {
            let (Some(full), Some(num)) = (caps.get(0), caps.name("num")) else {
                continue;
            };
            let digits = num.as_str();
            if !is_plain_integer(digits)
                || (caps.name("word").is_none() && looks_like_year(digits))
                || inside_date_or_time(text, num.start(), num.end())
            {
                continue;
            }
            if let Ok(value) = Decimal::from_str(digits) {
                Self::push_unique(&mut results, AmountCandidate {
                    raw_text: full.as_str().to_string(),
                    value,
                    currency: currency_from_word(caps.name("word").map(|m| m.as_str())),
                    source_offset: num.start(),
                });
            }
        }

        // Largest first; stable so equal values keep family order.
        results.sort_by(|a, b| b.value.cmp(&a.value));
        results
    }
}

/// Extract all amount candidates from normalized receipt text.
pub fn extract_amounts(text: &str) -> Vec<AmountCandidate> {
    AmountExtractor::new().extract_all(text)
}

fn currency_from_word(word: Option<&str>) -> CurrencyHint {
    match word.map(str::to_lowercase).as_deref() {
        Some("soles") | Some("sol") => CurrencyHint::Pen,
        Some("dólares") | Some("dolares") | Some("dollars") => CurrencyHint::Usd,
        _ => CurrencyHint::Unknown,
    }
}

fn is_plain_integer(token: &str) -> bool {
    token.len() <= MAX_INTEGER_DIGITS
        && token.chars().all(|c| c.is_ascii_digit())
        && !(token.len() > 1 && token.starts_with('0'))
}

/// Four-digit 19xx/20xx tokens are printed dates far more often than amounts.
fn looks_like_year(token: &str) -> bool {
    token.len() == 4 && (token.starts_with("19") || token.starts_with("20"))
}

/// Digit groups joined by `/`, `:` or `-` (dates, times, phone fragments).
///
/// A separator only counts when a digit sits on its far side, so labels
/// such as "Total:45" or "Importe-35" keep their amount.
fn inside_date_or_time(text: &str, start: usize, end: usize) -> bool {
    let is_separator = |c: Option<char>| matches!(c, Some('/' | ':' | '-'));
    let is_digit = |c: Option<char>| c.is_some_and(|c| c.is_ascii_digit());

    let mut before = text[..start].chars().rev();
    let mut after = text[end..].chars();
    (is_separator(before.next()) && is_digit(before.next()))
        || (is_separator(after.next()) && is_digit(after.next()))
}

/// Parse a receipt-formatted amount (e.g. "1,234.50", "1.234,50", "24,00").
///
/// The last separator is the decimal mark when it is followed by one or
/// two digits; every other separator groups thousands.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    let normalized = match cleaned.rfind([',', '.']) {
        Some(pos) => {
            let fraction_len = cleaned.len() - pos - 1;
            let integer: String = cleaned[..pos].chars().filter(char::is_ascii_digit).collect();
            if (1..=2).contains(&fraction_len) {
                format!("{}.{}", integer, &cleaned[pos + 1..])
            } else {
                cleaned.chars().filter(char::is_ascii_digit).collect()
            }
        }
        None => cleaned,
    };

    let value = Decimal::from_str(&normalized).ok()?;
    (!value.is_sign_negative()).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn values(candidates: &[AmountCandidate]) -> Vec<Decimal> {
        candidates.iter().map(|c| c.value).collect()
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("24,00"), Some(dec("24.00")));
        assert_eq!(parse_amount("1,234.50"), Some(dec("1234.50")));
        assert_eq!(parse_amount("1.234,50"), Some(dec("1234.50")));
        assert_eq!(parse_amount("1,250"), Some(dec("1250")));
        assert_eq!(parse_amount("45.5"), Some(dec("45.5")));
        assert_eq!(parse_amount("45"), Some(dec("45")));
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn test_total_and_subtotal() {
        let candidates = extract_amounts("Total: S/ 45.00, Subtotal: S/40.00");

        assert_eq!(values(&candidates), vec![dec("45.00"), dec("40.00")]);
        assert_eq!(candidates[0].currency, CurrencyHint::Pen);
        assert_eq!(candidates[0].source_offset, 10);
        assert_eq!(candidates[0].raw_text, "S/ 45.00");
        assert_eq!(candidates[1].source_offset, 29);
    }

    #[test]
    fn test_sorted_descending() {
        let candidates = extract_amounts("Pollo 12.50\nGaseosa 4.00\nTotal 62.50");
        assert_eq!(values(&candidates), vec![dec("62.50"), dec("12.50"), dec("4.00")]);
    }

    #[test]
    fn test_currency_families() {
        let candidates = extract_amounts("PEN 30.00 y US$ 8.00 y 15.00 soles");
        let by_value = |v: &str| candidates.iter().find(|c| c.value == dec(v)).unwrap();

        assert_eq!(by_value("30.00").currency, CurrencyHint::Pen);
        assert_eq!(by_value("8.00").currency, CurrencyHint::Usd);
        assert_eq!(by_value("15.00").currency, CurrencyHint::Pen);
    }

    #[test]
    fn test_integer_fallback() {
        let candidates = extract_amounts("Yapeaste 35 soles");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].value, dec("35"));
        assert_eq!(candidates[0].currency, CurrencyHint::Pen);
    }

    #[test]
    fn test_integers_skip_dates_and_references() {
        let candidates = extract_amounts("Fecha 12/05/2024 14:35\nOperación 004512 123456789");
        assert!(candidates.is_empty(), "{candidates:?}");
    }

    #[test]
    fn test_integers_skip_years() {
        let candidates = extract_amounts("15 may. 2024 - 01:32 pm");
        assert_eq!(values(&candidates), vec![dec("15")]);
    }

    #[test]
    fn test_labelled_integers_survive_separators() {
        assert_eq!(values(&extract_amounts("Total:45")), vec![dec("45")]);
        assert_eq!(values(&extract_amounts("Monto pagado:120")), vec![dec("120")]);
        assert_eq!(values(&extract_amounts("Importe-35")), vec![dec("35")]);
    }

    #[test]
    fn test_year_shaped_amount_with_currency_word() {
        let candidates = extract_amounts("Monto 2000 soles");
        assert_eq!(values(&candidates), vec![dec("2000")]);
        assert_eq!(candidates[0].currency, CurrencyHint::Pen);
    }

    #[test]
    fn test_integers_skip_phone_fragments() {
        assert!(extract_amounts("Cel 987-654-321").is_empty());
    }

    #[test]
    fn test_soles_integer_not_duplicated() {
        let candidates = extract_amounts("Monto s/24");
        assert_eq!(values(&candidates), vec![dec("24")]);
        assert_eq!(candidates[0].currency, CurrencyHint::Pen);
    }

    #[test]
    fn test_no_amounts() {
        assert!(extract_amounts("Gracias por su compra").is_empty());
        assert!(extract_amounts("").is_empty());
    }
}
