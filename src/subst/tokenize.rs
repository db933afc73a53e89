//! Quote-aware splitting of command lines.
//!
//! Separators inside `'...'`, `"..."`, `'''...'''` or `"""..."""` do not split.
//! A token wholly wrapped in one of those quote styles loses exactly that outer
//! pair. An unterminated quote is plain text running to the end of the input.

/// Checked longest first so `'''x'''` strips all three marks.
const QUOTES: [&str; 4] = ["'''", "\"\"\"", "'", "\""];

/// Splits `s` on spaces, honouring quotes.
pub fn split(s: &str) -> Vec<String> {
    split_on(s, " ")
}

/// Splits `s` on any character of `sep` that is not inside a quoted span.
///
/// Runs of separators never produce empty tokens.
pub fn split_on(s: &str, sep: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut rest = s;

    while let Some(c) = rest.chars().next() {
        if sep.contains(c) {
            if !current.is_empty() {
                tokens.push(strip_quotes(&current));
                current.clear();
            }
            rest = &rest[c.len_utf8()..];
        } else if c == '\'' || c == '"' {
            let span = quoted_span(rest, c);
            current.push_str(span);
            rest = &rest[span.len()..];
        } else {
            current.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    if !current.is_empty() {
        tokens.push(strip_quotes(&current));
    }
    tokens
}

/// The quoted span at the start of `s`, including its quote marks.
fn quoted_span(s: &str, quote: char) -> &str {
    let width = quote.len_utf8();
    let triple: String = std::iter::repeat(quote).take(3).collect();
    if s.starts_with(&triple) {
        if let Some(end) = s[triple.len()..].find(&triple) {
            return &s[..triple.len() + end + triple.len()];
        }
    }
    match s[width..].find(quote) {
        Some(end) => &s[..width + end + width],
        None => s,
    }
}

fn strip_quotes(token: &str) -> String {
    for quote in QUOTES {
        if token.len() >= 2 * quote.len() && token.starts_with(quote) && token.ends_with(quote) {
            return token[quote.len()..token.len() - quote.len()].to_string();
        }
    }
    token.to_string()
}
