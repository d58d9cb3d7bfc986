//! Post-processing of recognized text fragments.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // A digit, one space, then exactly two digits ending the string.
    static ref SPLIT_DECIMAL: Regex = Regex::new(r"(\d) (\d{2})$").unwrap();
}

/// Join fragments in reading order with single spaces.
///
/// Fragments are trimmed; empty fragments are dropped.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments
        .iter()
        .map(|f| f.as_ref().trim())
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Rejoin an amount whose decimal point was read as a space.
///
/// Only a space between a digit and a trailing two-digit group at the very
/// end of the string is replaced: `"Total 12 34"` becomes `"Total 12.34"`.
pub fn repair_decimal_separator(text: &str) -> Cow<'_, str> {
    SPLIT_DECIMAL.replace(text, "${1}.${2}")
}

/// Join fragments and apply decimal repair.
pub fn normalize_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    let joined = join_fragments(fragments);
    repair_decimal_separator(&joined).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repair_split_amount() {
        assert_eq!(repair_decimal_separator("Total 12 34"), "Total 12.34");
        assert_eq!(repair_decimal_separator("1 234 56"), "1 234.56");
    }

    #[test]
    fn test_repair_leaves_other_text() {
        assert_eq!(repair_decimal_separator("Total 1234"), "Total 1234");
        assert_eq!(repair_decimal_separator("12 3"), "12 3");
        assert_eq!(repair_decimal_separator("12 345"), "12 345");
        assert_eq!(repair_decimal_separator("Total 12"), "Total 12");
        assert_eq!(repair_decimal_separator("ab 12"), "ab 12");
        assert_eq!(repair_decimal_separator("12 34 EUR"), "12 34 EUR");
        assert_eq!(repair_decimal_separator(""), "");
    }

    #[test]
    fn test_repair_is_idempotent() {
        for input in ["Total 12 34", "Total 12.34", "12 3", "Invoice 42", "7 00"] {
            let once = repair_decimal_separator(input).into_owned();
            let twice = repair_decimal_separator(&once).into_owned();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_join_fragments() {
        assert_eq!(join_fragments(&["Total", " 12 ", "", "34"]), "Total 12 34");
        assert_eq!(join_fragments::<&str>(&[]), "");
    }

    #[test]
    fn test_normalize_fragments() {
        assert_eq!(normalize_fragments(&["Total", "12", "34"]), "Total 12.34");
        assert_eq!(normalize_fragments(&["INV-2024", "0042"]), "INV-2024 0042");
    }
}
