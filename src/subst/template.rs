//! Bounded, innermost-first placeholder expansion.

use super::braces::GROUP;
use super::resolve::resolve;
use crate::env::Environment;
use crate::errors::Result;

/// Maximum number of substitution passes over one value.
///
/// A value whose placeholders keep producing placeholders stops changing after
/// this many passes, whatever text remains.
pub const MAX_DEPTH: usize = 5;

/// Expands every `{...}` placeholder in `s`, innermost first.
///
/// Each pass replaces all spans that contain no braces; the next pass sees
/// the text they produced. Text without placeholders is returned unchanged.
pub fn expand_template(s: &str, env: &Environment) -> Result<String> {
    let mut current = s.to_string();
    for depth in 0..MAX_DEPTH {
        if !GROUP.is_match(&current) {
            break;
        }
        current = substitute_pass(&current, env)?;
        log::trace!("pass {} of {:?}: {:?}", depth + 1, s, current);
    }
    Ok(current)
}

fn substitute_pass(s: &str, env: &Environment) -> Result<String> {
    let mut out = String::with_capacity(s.len());
    let mut last = 0;
    for m in GROUP.find_iter(s) {
        out.push_str(&s[last..m.start()]);
        out.push_str(&resolve(s[m.start() + 1..m.end() - 1].trim(), env)?);
        last = m.end();
    }
    out.push_str(&s[last..]);
    Ok(out)
}
