//! Defensive text and number coercion.
//!
//! Scraped tables and hand-edited config files mix full-width digits,
//! thousands separators, percent signs and stray units. Every helper here
//! degrades to a caller-supplied default instead of failing.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static FLOAT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[-+]?\d*\.?\d+(?:e[-+]?\d+)?").unwrap());
static INT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-+]?\d+").unwrap());
static LIST_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[,、/|;]").unwrap());

/// Fold full-width and compatibility characters to their canonical
/// half-width form (NFKC): `１２３` becomes `123`, `ＡＢＣ` becomes `ABC`.
pub fn to_halfwidth(s: &str) -> String {
    s.nfkc().collect()
}

/// Normalize a column header for alias comparison.
///
/// Width-folded, lower-cased, with whitespace, `-` and `_` removed, so
/// `Change %`, `change_%` and `ＣＨＡＮＧＥ％` all compare equal.
pub fn normalize_header(s: &str) -> String {
    to_halfwidth(s)
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '_')
        .collect()
}

/// Strip thousands separators, percent signs, whitespace and sign variants.
fn clean_numeric(val: &str) -> String {
    to_halfwidth(val)
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '%')
        .map(|c| match c {
            // U+2212 MINUS SIGN survives NFKC; ▲/△ mark negatives in JP filings
            '\u{2212}' | '▲' | '△' => '-',
            _ => c,
        })
        .collect()
}

/// Parse the first number found in `val`, or return `default`.
///
/// Accepts `"1,234.5"`, `"+3.2%"`, `"－１．５"`, `"3e8"`, `"約 500 円"`.
/// Non-finite results fall back to `default` as well.
pub fn parse_float(val: &str, default: f64) -> f64 {
    let cleaned = clean_numeric(val);
    FLOAT_PATTERN
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

/// Parse the first integer found in `val`, or return `default`.
///
/// `"40.5"` yields 40 and `"3e8"` yields 3; use [`parse_float`] when
/// exponent notation matters.
pub fn parse_int(val: &str, default: i64) -> i64 {
    let cleaned = clean_numeric(val);
    INT_PATTERN
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .unwrap_or(default)
}

/// Split a loosely separated list (`,` `、` `/` `|` `;`) into trimmed,
/// non-empty items.
pub fn parse_list(val: &str) -> Vec<String> {
    let folded = to_halfwidth(val);
    LIST_SEPARATOR
        .split(&folded)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_to_halfwidth() {
        assert_eq!(to_halfwidth("ＴＯＰ＿ＬＩＭＩＴ"), "TOP_LIMIT");
        assert_eq!(to_halfwidth("１２３４"), "1234");
        assert_eq!(to_halfwidth("　"), " ");
    }

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" Change % "), "change%");
        assert_eq!(normalize_header("Market_Cap"), "marketcap");
        assert_eq!(normalize_header("ＰＥＲ（倍）"), "per(倍)");
        assert_eq!(normalize_header("銘柄 コード"), "銘柄コード");
    }

    #[test]
    fn test_parse_float_variants() {
        let cases = vec![
            ("1,234.5", 1234.5),
            ("+3.2%", 3.2),
            ("－１．５", -1.5),
            ("\u{2212}2.0", -2.0),
            ("▲120", -120.0),
            ("3e8", 3e8),
            ("3E+8", 3e8),
            ("約 500 円", 500.0),
            (".5", 0.5),
            ("  42  ", 42.0),
        ];
        for (input, expected) in cases {
            let got = parse_float(input, f64::NAN);
            assert!(
                (got - expected).abs() < 1e-9,
                "parse_float({input:?}) = {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn test_parse_float_default() {
        assert_eq!(parse_float("", 7.0), 7.0);
        assert_eq!(parse_float("N/A", 0.0), 0.0);
        assert_eq!(parse_float("-", -1.0), -1.0);
        assert_eq!(parse_float("1e999", 5.0), 5.0);
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("40", 0), 40);
        assert_eq!(parse_int("４０", 0), 40);
        assert_eq!(parse_int("40.9", 0), 40);
        assert_eq!(parse_int("1,000", 0), 1000);
        assert_eq!(parse_int("-5", 0), -5);
        assert_eq!(parse_int("none", 20), 20);
        assert_eq!(parse_int("99999999999999999999", 3), 3);
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list("1570, 1357"), vec!["1570", "1357"]);
        assert_eq!(
            parse_list("Utilities、Healthcare / Banks|Energy;"),
            vec!["Utilities", "Healthcare", "Banks", "Energy"]
        );
        assert_eq!(parse_list("７２０３，６７５８"), vec!["7203", "6758"]);
        assert!(parse_list("").is_empty());
        assert!(parse_list(" , ; ").is_empty());
    }

    proptest! {
        #[test]
        fn parse_float_never_panics(s in "\\PC*") {
            let v = parse_float(&s, 0.0);
            prop_assert!(v.is_finite());
        }

        #[test]
        fn parse_float_reads_plain_numbers(x in -1.0e12f64..1.0e12f64) {
            let got = parse_float(&x.to_string(), f64::NAN);
            prop_assert!((got - x).abs() <= x.abs() * 1e-12);
        }
    }
}
