//! Expectation evaluation
//!
//! Pure functions over a command's exit code and combined output. Substring
//! predicates ignore case; regex predicates are case-sensitive and run in
//! multiline mode so `^` and `$` anchor at line boundaries.

use regex::RegexBuilder;
use std::fmt;

use super::config::ExpectationSet;

/// The predicate kinds an [`ExpectationSet`] can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    Returncodes,
    ContainsAny,
    ContainsAll,
    RegexAny,
    RegexAll,
    NotContains,
    NotRegex,
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PredicateKind::Returncodes => "returncodes",
            PredicateKind::ContainsAny => "contains_any",
            PredicateKind::ContainsAll => "contains_all",
            PredicateKind::RegexAny => "regex_any",
            PredicateKind::RegexAll => "regex_all",
            PredicateKind::NotContains => "not_contains",
            PredicateKind::NotRegex => "not_regex",
        };
        f.write_str(name)
    }
}

/// Whether every present predicate holds
pub fn evaluate(expect: &ExpectationSet, output: &str, exit_code: i32) -> bool {
    failed_predicates(expect, output, exit_code).is_empty()
}

/// The present predicates that do not hold, in declaration order
pub fn failed_predicates(expect: &ExpectationSet, output: &str, exit_code: i32) -> Vec<PredicateKind> {
    let ExpectationSet {
        returncodes,
        contains_any: any_needles,
        contains_all: all_needles,
        regex_any: any_patterns,
        regex_all: all_patterns,
        not_contains: forbidden_needles,
        not_regex: forbidden_patterns,
    } = expect;

    let checks = [
        (
            PredicateKind::Returncodes,
            returncodes.as_ref().map(|codes| codes.contains(&exit_code)),
        ),
        (
            PredicateKind::ContainsAny,
            any_needles.as_ref().map(|n| contains_any(output, n)),
        ),
        (
            PredicateKind::ContainsAll,
            all_needles.as_ref().map(|n| contains_all(output, n)),
        ),
        (
            PredicateKind::RegexAny,
            any_patterns.as_ref().map(|p| regex_any(output, p)),
        ),
        (
            PredicateKind::RegexAll,
            all_patterns.as_ref().map(|p| regex_all(output, p)),
        ),
        (
            PredicateKind::NotContains,
            forbidden_needles.as_ref().map(|n| !contains_any(output, n)),
        ),
        (
            PredicateKind::NotRegex,
            forbidden_patterns.as_ref().map(|p| !regex_any(output, p)),
        ),
    ];

    checks
        .into_iter()
        .filter_map(|(kind, held)| (held == Some(false)).then_some(kind))
        .collect()
}

pub fn contains_any(haystack: &str, needles: &[String]) -> bool {
    let text = haystack.to_lowercase();
    needles.iter().any(|needle| text.contains(&needle.to_lowercase()))
}

pub fn contains_all(haystack: &str, needles: &[String]) -> bool {
    let text = haystack.to_lowercase();
    needles.iter().all(|needle| text.contains(&needle.to_lowercase()))
}

pub fn regex_any(haystack: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| is_match(pattern, haystack))
}

pub fn regex_all(haystack: &str, patterns: &[String]) -> bool {
    patterns.iter().all(|pattern| is_match(pattern, haystack))
}

/// An uncompilable pattern never matches
fn is_match(pattern: &str, haystack: &str) -> bool {
    match RegexBuilder::new(pattern).multi_line(true).build() {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            tracing::warn!(pattern, error = %e, "Ignoring invalid expectation pattern");
            false
        }
    }
}
