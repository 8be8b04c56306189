//! Text normalization for provider output.

/// Default maximum number of characters kept from provider text.
pub const DEFAULT_MAX_TEXT_LENGTH: usize = 10_000;

/// Normalize raw OCR text before extraction.
///
/// Truncates to `max_len` characters, turns carriage returns, tabs and
/// non-breaking spaces into spaces, removes angle brackets and other
/// control characters (newlines survive), collapses runs of spaces and
/// trims. Applying it twice yields the same text.
pub fn normalize(raw: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(raw.len().min(max_len));
    let mut last_was_space = false;

    for c in raw.chars().take(max_len) {
        let mapped = match c {
            '\r' | '\t' | '\u{00a0}' => ' ',
            '<' | '>' => continue,
            '\n' => '\n',
            c if c.is_control() => continue,
            c => c,
        };

        if mapped == ' ' {
            if last_was_space {
                continue;
            }
            last_was_space = true;
        } else {
            last_was_space = false;
        }
        out.push(mapped);
    }

    out.trim().to_string()
}

/// Normalize with the default length bound.
pub fn normalize_default(raw: &str) -> String {
    normalize(raw, DEFAULT_MAX_TEXT_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    #[test]
    fn test_whitespace_and_markup() {
        assert_eq!(
            normalize_default("  Total:\tS/\u{a0}45.00\r\n<b>Yape</b>  "),
            "Total: S/ 45.00 \nbYape/b"
        );
    }

    #[test]
    fn test_truncates_by_characters() {
        let text = "ñ".repeat(20);
        assert_eq!(normalize(&text, 5), "ñññññ");
    }

    #[test]
    fn test_drops_control_characters() {
        assert_eq!(normalize_default("S/\u{0007}24\u{0000}"), "S/24");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize_default("   \t\r "), "");
    }

    proptest! {
        #[test]
        fn prop_idempotent(text in "\\PC*", max_len in 0usize..200) {
            let once = normalize(&text, max_len);
            prop_assert_eq!(normalize(&once, max_len), once.clone());
        }

        #[test]
        fn prop_idempotent_with_controls(text in "[a-zA-Z0-9 \\t\\r\\n<>/.,:\u{a0}]{0,80}") {
            let once = normalize_default(&text);
            prop_assert_eq!(normalize_default(&once), once.clone());
        }
    }
}
