//! The tox.ini substitution engine.
//!
//! - [`tokenize`]: quote-aware splitting of command lines
//! - [`braces`]: `{a,b}` alternation for envlists and factors
//! - [`factor`]: `FACTOREXPR: VALUE` conditional lines
//! - [`resolve`]: one placeholder's inner text to its value
//! - [`template`]: repeated innermost-first expansion of a whole value

pub mod braces;
pub mod factor;
pub mod resolve;
pub mod template;
pub mod tokenize;

pub use braces::{expand_braces, expand_curlys, expand_envlist, split_top_level};
pub use factor::{expand_factor_conditions, matches_factor};
pub use resolve::resolve;
pub use template::{expand_template, MAX_DEPTH};
pub use tokenize::{split, split_on};
