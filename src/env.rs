//! The per-environment record that placeholders are resolved against.
//!
//! An [`Environment`] is built once per concrete name from the env list. It
//! owns an explicit attribute table (`{envdir}`, `{toxinidir}`, ...) and borrows
//! the project's [`ConfigSource`] and a [`VariableProvider`] standing in for the
//! process environment, so expansion can run against deterministic fixtures.

use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::ConfigSource;

static PYTHON_FACTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^py(\d)(\d+)$").expect("python factor pattern is valid"));

// ============================================================================
// VARIABLE PROVIDERS
// ============================================================================

/// Read-only lookup of environment variables.
pub trait VariableProvider {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct ProcessEnv;

impl VariableProvider for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl VariableProvider for () {
    fn lookup(&self, _: &str) -> Option<String> {
        None
    }
}

impl<K, V, S> VariableProvider for HashMap<K, V, S>
where
    K: std::borrow::Borrow<str> + Eq + std::hash::Hash,
    V: AsRef<str>,
    S: BuildHasher,
{
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).map(|v| v.as_ref().to_string())
    }
}

// ============================================================================
// LAYOUT
// ============================================================================

/// Directory conventions of one project run.
#[derive(Clone, Debug)]
pub struct Layout {
    pub toxinidir: PathBuf,
    pub toxdir: PathBuf,
    /// `name-version` of the package under test.
    pub package: String,
}

impl Layout {
    pub fn new(toxinidir: impl Into<PathBuf>, toxdir: impl Into<PathBuf>, package: impl Into<String>) -> Self {
        Self {
            toxinidir: toxinidir.into(),
            toxdir: toxdir.into(),
            package: package.into(),
        }
    }

    pub fn distdir(&self) -> PathBuf {
        self.toxdir.join("dist")
    }

    /// The sdist archive built for this run.
    pub fn package_zip(&self) -> PathBuf {
        self.distdir().join(format!("{}.zip", self.package))
    }

    pub fn envdir(&self, name: &str) -> PathBuf {
        self.toxdir.join(name)
    }
}

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// One concrete environment, immutable while its values are expanded.
#[derive(Clone)]
pub struct Environment<'a> {
    name: String,
    options: Vec<String>,
    attributes: IndexMap<String, String>,
    config: &'a dyn ConfigSource,
    vars: &'a dyn VariableProvider,
}

impl<'a> Environment<'a> {
    /// An environment with no attributes and no positional arguments.
    pub fn new(name: impl Into<String>, config: &'a dyn ConfigSource, vars: &'a dyn VariableProvider) -> Self {
        Self {
            name: name.into(),
            options: Vec::new(),
            attributes: IndexMap::new(),
            config,
            vars,
        }
    }

    /// An environment with the standard attribute table derived from `layout`.
    pub fn for_layout(
        name: impl Into<String>,
        layout: &Layout,
        options: Vec<String>,
        config: &'a dyn ConfigSource,
        vars: &'a dyn VariableProvider,
    ) -> Self {
        let name = name.into();
        let envdir = layout.envdir(&name);
        let envbindir = envdir.join("bin");
        let envdistdir = envdir.join("dist");
        Self::new(name.clone(), config, vars)
            .with_options(options)
            .with_attribute("toxinidir", path_str(&layout.toxinidir))
            .with_attribute("toxdir", path_str(&layout.toxdir))
            .with_attribute("distdir", path_str(&layout.distdir()))
            .with_attribute("envname", name)
            .with_attribute("envdir", path_str(&envdir))
            .with_attribute("envbindir", path_str(&envbindir))
            .with_attribute("envpython", path_str(&envbindir.join("python")))
            .with_attribute("envdistdir", path_str(&envdistdir))
            .with_attribute("envpackagedir", path_str(&envdistdir.join(&layout.package)))
            .with_attribute("envctoxfile", path_str(&envdir.join("ctox")))
    }

    pub fn with_options(mut self, options: Vec<String>) -> Self {
        self.options = options;
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Positional arguments available to `{posargs}`.
    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// An attribute as a path; missing attributes are the empty path.
    pub fn path(&self, name: &str) -> PathBuf {
        PathBuf::from(self.attribute(name).unwrap_or_default())
    }

    pub fn config(&self) -> &'a dyn ConfigSource {
        self.config
    }

    pub fn lookup_var(&self, key: &str) -> Option<String> {
        self.vars.lookup(key)
    }

    /// Factors of the name, e.g. `py34` and `unify` for `py34-unify`.
    pub fn factors(&self) -> impl Iterator<Item = &str> {
        self.name.split('-')
    }

    /// Python version implied by the first factor: `py34` is `3.4`, `py310` is `3.10`.
    ///
    /// `None` for names ctox cannot build.
    pub fn py_version(&self) -> Option<String> {
        let first = self.factors().next()?;
        let caps = PYTHON_FACTOR.captures(first)?;
        Some(format!("{}.{}", &caps[1], &caps[2]))
    }
}

impl fmt::Debug for Environment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.name)
            .field("options", &self.options)
            .field("attributes", &self.attributes)
            .finish_non_exhaustive()
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

// ============================================================================
// POSITIONAL ARGUMENTS
// ============================================================================

/// Positional arguments from the trailing command-line tokens.
///
/// Tokens are taken up to the first one starting with `-`, unless the first
/// token is exactly `--`, in which case everything after it is positional.
pub fn positional_args(arguments: &[String]) -> Vec<String> {
    match arguments.split_first() {
        Some((first, rest)) if first == "--" => rest.to_vec(),
        _ => arguments
            .iter()
            .take_while(|arg| !arg.starts_with('-'))
            .cloned()
            .collect(),
    }
}
