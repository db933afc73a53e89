//! Curly-brace alternation, as used by `envlist` and factor expressions.
//!
//! `{py26,py27}-django{15,16}, py32` names five environments: each top-level
//! comma-separated part is expanded into the Cartesian product of its groups,
//! leftmost group varying slowest. Groups do not nest.

use once_cell::sync::Lazy;
use regex::Regex;

/// A brace group with no braces inside it.
pub(crate) static GROUP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*\}").expect("group pattern is valid"));

static GROUP_OR_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^{}]*\}|\s*,\s*").expect("separator pattern is valid"));

/// Splits `s` on commas that are not inside a `{...}` group.
///
/// Parts are trimmed and empty parts are dropped.
pub fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut prev = 0;
    for m in GROUP_OR_COMMA.find_iter(s) {
        if m.as_str().starts_with('{') {
            continue;
        }
        push_part(&mut parts, &s[prev..m.start()]);
        prev = m.end();
    }
    push_part(&mut parts, &s[prev..]);
    parts
}

fn push_part<'a>(parts: &mut Vec<&'a str>, part: &'a str) {
    let part = part.trim();
    if !part.is_empty() {
        parts.push(part);
    }
}

/// Expands every top-level part of `s`, concatenating the results in order.
pub fn expand_braces(s: &str) -> Vec<String> {
    split_top_level(s)
        .into_iter()
        .flat_map(expand_curlys)
        .collect()
}

/// Expands the groups of a single part: `py{26, 27}` gives `py26`, `py27`.
///
/// Groups are substituted right to left so the byte offsets of groups further
/// left stay valid; iterating alternatives in the outer loop keeps the
/// leftmost group varying slowest.
pub fn expand_curlys(part: &str) -> Vec<String> {
    let groups: Vec<_> = GROUP.find_iter(part).collect();
    groups
        .iter()
        .rev()
        .fold(vec![part.to_string()], |expanded, group| {
            let inner = &part[group.start() + 1..group.end() - 1];
            inner
                .split(',')
                .map(str::trim)
                .flat_map(|alternative| {
                    expanded.iter().map(move |e| {
                        format!("{}{}{}", &e[..group.start()], alternative, &e[group.end()..])
                    })
                })
                .collect()
        })
}

/// The ordered list of concrete environment names named by an `envlist` value.
///
/// Duplicates are kept; a name listed twice runs twice.
pub fn expand_envlist(raw: &str) -> Vec<String> {
    expand_braces(raw)
}
