//! Trigger-pattern lookup for checkpoints with an authored error table.
//!
//! A pattern matches numerically when both the answer and the trigger start
//! with a number, otherwise by trimmed, case-insensitive string equality.
//! Zero matches is an ordinary outcome; callers fall back to a generic hint.

use std::sync::LazyLock;

use regex::Regex;

use crate::model::ErrorPattern;

/// Absolute slack added to every tolerance check so that decimal inputs are
/// not rejected by binary rounding (9.81 - 9.8 > 0.01 in `f64`).
pub const FLOAT_SLACK: f64 = 1e-9;

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?").expect("Invalid regex")
});

/// Parse the leading numeric token of `s` ("17.3 m/s" -> 17.3).
pub fn parse_leading_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    LEADING_NUMBER
        .find(trimmed)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse `s` as a number only if the whole trimmed string is one.
pub fn parse_exact_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a number optionally followed by `unit` ("9.8 m/s" with unit "m/s").
///
/// Any other trailing text means the answer is not a plain quantity.
pub fn parse_quantity(s: &str, unit: Option<&str>) -> Option<f64> {
    let trimmed = s.trim();
    let m = LEADING_NUMBER.find(trimmed)?;
    let rest = trimmed[m.end()..].trim();
    let unit_ok = rest.is_empty() || unit.is_some_and(|u| text_equals(rest, u));
    if !unit_ok {
        return None;
    }
    m.as_str().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// `|a - b| <= tolerance`, inclusive.
pub fn within_tolerance(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance.abs() + FLOAT_SLACK
}

/// Trimmed, case-insensitive equality.
pub fn text_equals(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Returns `true` if `answer` triggers `pattern`.
pub fn pattern_matches(pattern: &ErrorPattern, answer: &str) -> bool {
    match (
        parse_leading_number(answer),
        parse_leading_number(&pattern.trigger_value),
    ) {
        (Some(submitted), Some(trigger)) => {
            within_tolerance(submitted, trigger, pattern.trigger_tolerance)
        }
        _ => text_equals(answer, &pattern.trigger_value),
    }
}

/// Every pattern `answer` triggers, highest confidence first. Ties keep
/// authoring order.
pub fn matching_patterns<'a>(patterns: &'a [ErrorPattern], answer: &str) -> Vec<&'a ErrorPattern> {
    let mut matches: Vec<&ErrorPattern> = patterns
        .iter()
        .filter(|p| pattern_matches(p, answer))
        .collect();
    // sort_by is stable
    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    matches
}

/// The single best pattern for `answer`, or `None` when nothing matches.
pub fn match_error_pattern<'a>(
    patterns: &'a [ErrorPattern],
    answer: &str,
) -> Option<&'a ErrorPattern> {
    let best = matching_patterns(patterns, answer).into_iter().next();
    match best {
        Some(p) => tracing::debug!(
            "answer {answer:?} matched pattern {} ({}, confidence {:.2})",
            p.id,
            p.error_type,
            p.confidence
        ),
        None => tracing::debug!("answer {answer:?} matched no error pattern"),
    }
    best
}
