//! Boolean Query Sanitizer: rewrites user- or model-authored boolean search
//! expressions into the syntax the live-network search accepts.
//!
//! Parentheses and operator placement are not validated; malformed input is
//! forwarded and may be rejected by the provider.

use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

fn bare_not() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\)\s*NOT\s*\(").expect("valid regex"))
}

fn doubled_and() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\bAND(?:\s+AND)+\s+NOT\b").expect("valid regex"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

/// Applies, in order: `) NOT (` → `) AND NOT (`, any run of `AND`s before
/// `NOT` → `AND NOT`,
/// `&` → `and`, then collapses whitespace runs to one space and trims.
pub fn sanitize_boolean_query(query: &str) -> String {
    let query = bare_not().replace_all(query, ") AND NOT (");
    let query = doubled_and().replace_all(&query, "AND NOT");
    let query = query.replace('&', "and");
    whitespace_run()
        .replace_all(&query, " ")
        .trim()
        .to_string()
}

/// Advisory on query length; the provider starts rejecting queries around 1500 characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryLengthAdvice {
    /// No query: the search relies on titles and filters only.
    Empty,
    Optimal,
    Acceptable,
    TooLong,
}

pub fn advise_length(query: &str) -> QueryLengthAdvice {
    match query.trim().chars().count() {
        0 => QueryLengthAdvice::Empty,
        n if n < 1000 => QueryLengthAdvice::Optimal,
        n if n < 1500 => QueryLengthAdvice::Acceptable,
        _ => QueryLengthAdvice::TooLong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_documented_example() {
        assert_eq!(
            sanitize_boolean_query("(title) NOT (exclude) & more"),
            "(title) AND NOT (exclude) and more"
        );
    }

    #[test]
    fn test_sanitize_handles_tight_and_multiline_not() {
        assert_eq!(
            sanitize_boolean_query("(a OR b)NOT(c)"),
            "(a OR b) AND NOT (c)"
        );
        assert_eq!(
            sanitize_boolean_query("(a)\n\tNOT\n(c)"),
            "(a) AND NOT (c)"
        );
    }

    #[test]
    fn test_sanitize_collapses_doubled_and() {
        assert_eq!(
            sanitize_boolean_query("(a) AND  AND NOT (b)"),
            "(a) AND NOT (b)"
        );
        assert_eq!(
            sanitize_boolean_query("(a) AND AND AND NOT (b)"),
            "(a) AND NOT (b)"
        );
    }

    #[test]
    fn test_sanitize_leaves_valid_query_untouched() {
        let query = r#"("sales director" OR "directeur commercial") AND (insurance) AND NOT (junior)"#;
        assert_eq!(sanitize_boolean_query(query), query);
    }

    #[test]
    fn test_sanitize_does_not_validate_parentheses() {
        assert_eq!(sanitize_boolean_query("((a OR b"), "((a OR b");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "(title) NOT (exclude) & more",
            "  (a)NOT(b)  NOT (c)\n\n",
            "(x) AND AND NOT (y)",
            "(a) AND AND AND NOT (b)",
            "(a) AND\nAND AND  AND NOT (b)",
            "AND\nAND   NOT",
            "R&D AND (P&L OR M&A)",
            ") NOT ( ) NOT (",
            "",
            "   ",
            "\"analyste financier\" OR \"financial analyst\"",
        ];
        for input in inputs {
            let once = sanitize_boolean_query(input);
            let twice = sanitize_boolean_query(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_advise_length_bands() {
        assert_eq!(advise_length("  "), QueryLengthAdvice::Empty);
        assert_eq!(advise_length("(a OR b)"), QueryLengthAdvice::Optimal);
        assert_eq!(advise_length(&"a".repeat(1200)), QueryLengthAdvice::Acceptable);
        assert_eq!(advise_length(&"a".repeat(1500)), QueryLengthAdvice::TooLong);
    }
}
