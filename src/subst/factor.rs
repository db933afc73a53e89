//! Factor-conditional configuration lines.
//!
//! An environment name such as `py34-unify` has the factors `py34` and
//! `unify`. A config line `py{33,34}: docformatter` applies only to
//! environments carrying at least one of the factors its left side expands to.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

use super::braces::expand_braces;

static CONDITION_SEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*:\s*").expect("condition separator pattern is valid"));

/// True if the labels denoted by `factor_expr` intersect the factors of `env_name`.
pub fn matches_factor(factor_expr: &str, env_name: &str) -> bool {
    let labels: HashSet<String> = expand_braces(factor_expr).into_iter().collect();
    env_name.split('-').any(|factor| labels.contains(factor))
}

/// Resolves one `FACTOREXPR: VALUE` line against `env_name`.
///
/// Returns `VALUE` when the factors match and `""` when they do not. Lines
/// without exactly one condition separator, or whose left side is not a
/// factor expression, come back unchanged.
pub fn expand_factor_conditions(line: &str, env_name: &str) -> String {
    let parts: Vec<&str> = CONDITION_SEP.splitn(line, 3).collect();
    let [factor_expr, value] = parts.as_slice() else {
        return line.to_string();
    };
    if !is_factor_expression(factor_expr) {
        return line.to_string();
    }
    if matches_factor(factor_expr, env_name) {
        (*value).to_string()
    } else {
        String::new()
    }
}

/// Label characters, commas, spaces and balanced, non-nested braces.
///
/// This keeps placeholders such as `{env:HOME}` from being read as conditions.
fn is_factor_expression(s: &str) -> bool {
    let s = s.trim();
    if s.is_empty() {
        return false;
    }
    let mut open = false;
    for c in s.chars() {
        match c {
            '{' if open => return false,
            '{' => open = true,
            '}' if !open => return false,
            '}' => open = false,
            ',' | ' ' | '.' | '-' | '_' => {}
            c if c.is_ascii_alphanumeric() => {}
            _ => return false,
        }
    }
    !open
}
