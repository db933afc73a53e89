//! Resolution of a single placeholder's inner text.
//!
//! Providers are tried in a fixed order; the first one that recognises the
//! text decides the outcome, including its errors.

use once_cell::sync::Lazy;
use regex::Regex;

use super::factor::expand_factor_conditions;
use crate::env::Environment;
use crate::errors::{CtoxError, Result};

static SECTION_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(.*?)\](.*)").expect("section reference pattern is valid"));

static POSARGS_SEP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*:\s*").expect("posargs separator pattern is valid"));

/// `None` when the provider does not handle the placeholder.
type Provider = fn(&str, &Environment) -> Option<Result<String>>;

const PROVIDERS: &[(&str, Provider)] = &[
    ("attribute", attribute),
    ("env", env_var),
    ("config", config_ref),
    ("posargs", posargs),
];

/// Resolves the text between one pair of braces.
pub fn resolve(placeholder: &str, env: &Environment) -> Result<String> {
    for (name, provider) in PROVIDERS {
        if let Some(resolved) = provider(placeholder, env) {
            log::debug!("{{{placeholder}}} resolved by {name} provider");
            return resolved;
        }
    }
    Err(CtoxError::unresolved(placeholder))
}

fn attribute(placeholder: &str, env: &Environment) -> Option<Result<String>> {
    env.attribute(placeholder).map(|value| Ok(value.to_string()))
}

/// `env:KEY` or `env:KEY:DEFAULT`; the default may itself contain colons.
fn env_var(placeholder: &str, env: &Environment) -> Option<Result<String>> {
    let mut parts = placeholder.splitn(3, ':');
    if parts.next() != Some("env") {
        return None;
    }
    let key = parts.next()?;
    let default = parts.next();
    Some(match (env.lookup_var(key), default) {
        (Some(value), _) => Ok(value),
        (None, Some(default)) => Ok(default.to_string()),
        (None, None) => Err(CtoxError::missing_env_var(key)),
    })
}

/// `[SECTION]OPTION`, with factor conditions applied line by line.
fn config_ref(placeholder: &str, env: &Environment) -> Option<Result<String>> {
    let caps = SECTION_REF.captures(placeholder)?;
    let section = caps.get(1).map_or("", |m| m.as_str());
    let option = caps.get(2).map_or("", |m| m.as_str());
    let raw = env.config().get(section, option).unwrap_or("");
    Some(Ok(raw
        .split('\n')
        .map(|line| expand_factor_conditions(line, env.name()))
        .collect::<Vec<_>>()
        .join("\n")))
}

/// `posargs` or `posargs:DEFAULT`.
fn posargs(placeholder: &str, env: &Environment) -> Option<Result<String>> {
    let mut parts = POSARGS_SEP.splitn(placeholder, 2);
    if parts.next() != Some("posargs") {
        return None;
    }
    let default = parts.next().unwrap_or("");
    Some(Ok(if env.options().is_empty() {
        default.to_string()
    } else {
        env.options().join(" ")
    }))
}
