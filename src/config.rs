//! Reading `tox.ini` and deriving per-environment values from it.
//!
//! [`IniConfig`] understands the ConfigParser subset tox files use: `[section]`
//! headers, `key = value` (or `key: value`) pairs, indented continuation
//! lines and full-line `#`/`;` comments. Option names are case-insensitive,
//! section names are not.
//!
//! The `get_*` functions turn raw values into envlists, dependency lists and
//! argument vectors, running them through the substitution engine.

use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::env::Environment;
use crate::errors::{to_error_source, CtoxError, Result};
use crate::subst::{expand_envlist, expand_factor_conditions, expand_template, split, split_on};

static PACKAGING_TOOL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(pip|conda)([=<>!]|$)").expect("packaging tool pattern is valid"));

// ============================================================================
// CONFIG SOURCE
// ============================================================================

/// Read-only `(section, option)` lookup. Absence is a normal result.
pub trait ConfigSource {
    fn get(&self, section: &str, option: &str) -> Option<&str>;
}

impl ConfigSource for HashMap<(String, String), String> {
    fn get(&self, section: &str, option: &str) -> Option<&str> {
        HashMap::get(self, &(section.to_string(), option.to_string())).map(String::as_str)
    }
}

/// Lookup that treats a missing key as the empty string.
fn get_or_empty<'c>(config: &'c dyn ConfigSource, section: &str, option: &str) -> &'c str {
    config.get(section, option).unwrap_or("")
}

// ============================================================================
// INI FILES
// ============================================================================

/// A parsed ini file, sections and options in file order.
#[derive(Clone, Debug, Default)]
pub struct IniConfig {
    sections: IndexMap<String, IndexMap<String, String>>,
}

struct PendingOption {
    section: String,
    key: String,
    lines: Vec<String>,
}

impl IniConfig {
    /// Reads and parses the file at `path`.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(CtoxError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| CtoxError::io(format!("failed to read {}", path.display()), e))?;
        Self::parse(&path.to_string_lossy(), &content)
    }

    /// Parses `content`; `name` labels diagnostics.
    pub fn parse(name: &str, content: &str) -> Result<Self> {
        let src = to_error_source(name, content);
        let mut config = IniConfig::default();
        let mut section: Option<String> = None;
        let mut pending: Option<PendingOption> = None;
        let mut offset = 0;

        for raw in content.split_inclusive('\n') {
            let start = offset;
            offset += raw.len();
            let line = raw.trim_end();
            let trimmed = line.trim_start();

            if trimmed.is_empty() {
                if let Some(option) = pending.as_mut() {
                    option.lines.push(String::new());
                }
                continue;
            }
            if trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if line.starts_with(char::is_whitespace) {
                if let Some(option) = pending.as_mut() {
                    option.lines.push(trimmed.to_string());
                    continue;
                }
                return Err(CtoxError::config_syntax(
                    &src,
                    start,
                    line.len(),
                    "continuation line without an option",
                ));
            }

            config.finish(pending.take());

            if let Some(header) = trimmed.strip_prefix('[') {
                let Some(name) = header.strip_suffix(']') else {
                    return Err(CtoxError::config_syntax(&src, start, line.len(), "unclosed section header"));
                };
                if config.sections.contains_key(name) {
                    return Err(CtoxError::config_syntax(
                        &src,
                        start,
                        line.len(),
                        format!("duplicate section [{name}]"),
                    ));
                }
                config.sections.insert(name.to_string(), IndexMap::new());
                section = Some(name.to_string());
                continue;
            }

            let Some(current) = section.as_ref() else {
                return Err(CtoxError::config_syntax(
                    &src,
                    start,
                    line.len(),
                    "option outside of any [section]",
                ));
            };
            let Some(split_at) = line.find(['=', ':']) else {
                return Err(CtoxError::config_syntax(&src, start, line.len(), "expected `key = value`"));
            };
            let key = line[..split_at].trim().to_lowercase();
            if key.is_empty() {
                return Err(CtoxError::config_syntax(&src, start, line.len(), "empty option name"));
            }
            if config.sections[current].contains_key(&key) {
                return Err(CtoxError::config_syntax(
                    &src,
                    start,
                    line.len(),
                    format!("duplicate option '{key}' in [{current}]"),
                ));
            }
            pending = Some(PendingOption {
                section: current.clone(),
                key,
                lines: vec![line[split_at + 1..].trim().to_string()],
            });
        }
        config.finish(pending);
        log::debug!("parsed {} with {} sections", name, config.sections.len());
        Ok(config)
    }

    fn finish(&mut self, pending: Option<PendingOption>) {
        let Some(mut option) = pending else {
            return;
        };
        while option.lines.len() > 1 && option.lines.last().is_some_and(String::is_empty) {
            option.lines.pop();
        }
        if let Some(section) = self.sections.get_mut(&option.section) {
            section.insert(option.key, option.lines.join("\n"));
        }
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    pub fn options(&self, section: &str) -> impl Iterator<Item = (&str, &str)> {
        self.sections
            .get(section)
            .into_iter()
            .flat_map(|options| options.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

impl ConfigSource for IniConfig {
    fn get(&self, section: &str, option: &str) -> Option<&str> {
        self.sections
            .get(section)?
            .get(&option.to_lowercase())
            .map(String::as_str)
    }
}

// ============================================================================
// GETTERS
// ============================================================================

/// The expanded `[tox] envlist`.
pub fn get_envlist(config: &dyn ConfigSource) -> Vec<String> {
    expand_envlist(get_or_empty(config, "tox", "envlist"))
}

/// Commands allowed to run from outside the environment's bin directory.
pub fn get_whitelist(config: &dyn ConfigSource) -> Vec<String> {
    let raw = match get_or_empty(config, "tox", "whitelist_externals") {
        "" => get_or_empty(config, "testenv", "whitelist_externals"),
        raw => raw,
    };
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// `[testenv:NAME] option`, falling back to `[testenv] option` when empty.
fn testenv_value<'c>(env: &Environment<'c>, option: &str) -> &'c str {
    let config = env.config();
    match get_or_empty(config, &format!("testenv:{}", env.name()), option) {
        "" => get_or_empty(config, "testenv", option),
        value => value,
    }
}

/// Dependencies to install, always led by `pip`.
///
/// Each line has its factor condition applied before placeholders are
/// expanded; the packaging tools themselves are never reinstalled.
pub fn get_deps(env: &Environment) -> Result<Vec<String>> {
    let mut deps = vec!["pip".to_string()];
    for line in testenv_value(env, "deps").lines().filter(|line| !line.is_empty()) {
        let expanded = expand_template(&expand_factor_conditions(line, env.name()), env)?;
        deps.extend(
            expanded
                .split_whitespace()
                .filter(|dep| !PACKAGING_TOOL.is_match(dep))
                .map(str::to_string),
        );
    }
    Ok(deps)
}

/// Commands to run, one argument vector per non-empty line.
pub fn get_commands(env: &Environment) -> Result<Vec<Vec<String>>> {
    let expanded = expand_template(testenv_value(env, "commands"), env)?;
    Ok(split_on(&expanded, "\n")
        .iter()
        .map(|line| split(line))
        .filter(|argv| !argv.is_empty())
        .collect())
}

/// Working directory for commands; defaults to `{toxinidir}`.
pub fn get_changedir(env: &Environment) -> Result<String> {
    match testenv_value(env, "changedir") {
        "" => Ok(env.attribute("toxinidir").unwrap_or_default().to_string()),
        raw => expand_template(raw, env),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOX_INI: &str = "\
[tox]
envlist = py26, py27, py{33,34,35}-unify, foo
whitelist_externals = echo

; a comment
[base]
ment = pyfaker

[testenv]
deps =
    py26: argparse
    py26: unittest2
    nose
    colorama
    {[base]ment}
commands =
    echo {posargs:no posargs passed}

    python -m nose
changedir = {envdir}

[testenv:py34-unify]
deps =
    {[testenv]deps}
    unify
commands = unify --check-only --recursive src
";

    fn config() -> IniConfig {
        IniConfig::parse("tox.ini", TOX_INI).unwrap()
    }

    #[test]
    fn parse_sections_and_values() {
        let config = config();
        assert_eq!(
            vec!["tox", "base", "testenv", "testenv:py34-unify"],
            config.sections().collect::<Vec<_>>()
        );
        assert_eq!(Some("pyfaker"), config.get("base", "ment"));
        assert_eq!(Some("pyfaker"), config.get("base", "MENT"));
        assert_eq!(None, config.get("Base", "ment"));
        assert_eq!(
            Some("\npy26: argparse\npy26: unittest2\nnose\ncolorama\n{[base]ment}"),
            config.get("testenv", "deps")
        );
        assert_eq!(
            Some("\necho {posargs:no posargs passed}\n\npython -m nose"),
            config.get("testenv", "commands")
        );
    }

    #[test]
    fn option_names_are_lowercased_and_colon_separates() {
        let config = IniConfig::parse("x.ini", "[s]\nKey: value: with colon\n").unwrap();
        assert_eq!(Some("value: with colon"), config.get("s", "key"));
        assert_eq!(vec![("key", "value: with colon")], config.options("s").collect::<Vec<_>>());
    }

    #[test]
    fn syntax_errors() {
        let err = IniConfig::parse("x.ini", "key = value\n").unwrap_err();
        assert!(err.to_string().contains("outside of any [section]"));
        let err = IniConfig::parse("x.ini", "[s]\njust words\n").unwrap_err();
        assert!(err.to_string().contains("expected `key = value`"));
        let err = IniConfig::parse("x.ini", "[s\n").unwrap_err();
        assert!(err.to_string().contains("unclosed section header"));
        let err = IniConfig::parse("x.ini", "[s]\n[s]\n").unwrap_err();
        assert!(err.to_string().contains("duplicate section"));
        let err = IniConfig::parse("x.ini", "[s]\n  indented\n").unwrap_err();
        assert!(err.to_string().contains("continuation line"));
    }

    #[test]
    fn missing_file() {
        let err = IniConfig::read(Path::new("/definitely/not/here/tox.ini")).unwrap_err();
        assert!(matches!(err, CtoxError::ConfigNotFound { .. }));
    }

    #[test]
    fn envlist() {
        assert_eq!(
            vec!["py26", "py27", "py33-unify", "py34-unify", "py35-unify", "foo"],
            get_envlist(&config())
        );
    }

    #[test]
    fn whitelist() {
        assert_eq!(vec!["echo"], get_whitelist(&config()));
        let empty = IniConfig::default();
        assert!(get_whitelist(&empty).is_empty());
    }

    #[test]
    fn deps_apply_factor_conditions() {
        let config = config();
        let env = Environment::new("py26", &config, &());
        assert_eq!(
            vec!["pip", "argparse", "unittest2", "nose", "colorama", "pyfaker"],
            get_deps(&env).unwrap()
        );
        let env = Environment::new("py27", &config, &());
        assert_eq!(vec!["pip", "nose", "colorama", "pyfaker"], get_deps(&env).unwrap());
    }

    #[test]
    fn deps_from_env_section_reference_testenv() {
        let config = config();
        let env = Environment::new("py34-unify", &config, &());
        assert_eq!(
            vec!["pip", "nose", "colorama", "pyfaker", "unify"],
            get_deps(&env).unwrap()
        );
    }

    #[test]
    fn deps_never_reinstall_packaging_tools() {
        let config = IniConfig::parse("x.ini", "[testenv]\ndeps = pip>=8 conda nose pipenv\n").unwrap();
        let env = Environment::new("py27", &config, &());
        assert_eq!(vec!["pip", "nose", "pipenv"], get_deps(&env).unwrap());
    }

    #[test]
    fn commands_split_into_argv() {
        let config = config();
        let env = Environment::new("py27", &config, &());
        assert_eq!(
            vec![
                vec!["echo", "no", "posargs", "passed"],
                vec!["python", "-m", "nose"],
            ],
            get_commands(&env).unwrap()
        );
        let env = env.with_options(vec!["-x".to_string(), "tests/".to_string()]);
        assert_eq!(vec!["echo", "-x", "tests/"], get_commands(&env).unwrap()[0]);
    }

    #[test]
    fn commands_from_env_section() {
        let config = config();
        let env = Environment::new("py34-unify", &config, &());
        assert_eq!(
            vec![vec!["unify", "--check-only", "--recursive", "src"]],
            get_commands(&env).unwrap()
        );
    }

    #[test]
    fn changedir_expands_attributes() {
        let config = config();
        let env = Environment::new("foo", &config, &()).with_attribute("envdir", "bar");
        assert_eq!("bar", get_changedir(&env).unwrap());
    }

    #[test]
    fn changedir_defaults_to_toxinidir() {
        let config = IniConfig::default();
        let env = Environment::new("py27", &config, &()).with_attribute("toxinidir", "/proj");
        assert_eq!("/proj", get_changedir(&env).unwrap());
    }

    #[test]
    fn unresolved_placeholder_in_commands_fails() {
        let config = IniConfig::parse("x.ini", "[testenv]\ncommands = run {nope}\n").unwrap();
        let env = Environment::new("py27", &config, &());
        let err = get_commands(&env).unwrap_err();
        assert!(matches!(err, CtoxError::UnresolvedPlaceholder { ref placeholder } if placeholder == "nope"));
    }
}
