//! Creating conda environments and installing packages into them.
//!
//! These are thin wrappers that shell out to `conda`, falling back to the
//! environment's own `pip`. The dependencies installed into an environment
//! are recorded as JSON in its `envctoxfile` so a later run can tell whether
//! the environment is reusable.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::env::{Environment, Layout};
use crate::errors::{CtoxError, Result};
use crate::shell::Shell;

/// Dependencies installed into an environment by the last run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepsRecord {
    pub deps: Vec<String>,
}

fn argv<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn pip(env: &Environment) -> String {
    env.path("envbindir").join("pip").to_string_lossy().into_owned()
}

/// Conda spells version pins with a single `=`.
fn conda_spec(lib: &str) -> String {
    lib.replace("==", "=")
}

pub fn env_exists(env: &Environment) -> bool {
    env.path("envdir").join("conda-meta").is_dir()
}

/// Creates the environment with `python=<version>`, removing any old one first
/// when `force_remove` is set.
pub fn create_env(shell: &dyn Shell, env: &Environment, python: &str, force_remove: bool) -> Result<()> {
    let toxdir = env.path("toxdir");
    if force_remove {
        shell.shell_out(
            &argv(["conda", "remove", "-p", env.name(), "--all", "--yes", "--quiet"]),
            &toxdir,
        )?;
    }
    shell.shell_out(
        &argv([
            "conda",
            "create",
            "-p",
            env.name(),
            &format!("python={python}"),
            "--yes",
            "--quiet",
        ]),
        &toxdir,
    )?;
    Ok(())
}

/// Installs one dependency, with conda if it can and pip otherwise.
pub fn install(shell: &dyn Shell, env: &Environment, lib: &str) -> bool {
    let toxdir = env.path("toxdir");
    shell.safe_shell_out(
        &argv(["conda", "install", &conda_spec(lib), "-p", env.name(), "--yes", "--quiet"]),
        &toxdir,
    ) || shell.safe_shell_out(&argv([&pip(env), "install", "--quiet", lib]), &toxdir)
}

/// Installs `deps` in order, stopping at the first failure.
///
/// Whatever was installed is recorded, so a partial install never looks
/// reusable on the next run.
pub fn install_deps(shell: &dyn Shell, env: &Environment, deps: &[String]) -> Result<()> {
    let mut installed = Vec::with_capacity(deps.len());
    let mut outcome = Ok(());
    for dep in deps {
        if !install(shell, env, dep) {
            outcome = Err(CtoxError::InstallFailed {
                package: dep.clone(),
            });
            break;
        }
        installed.push(dep.clone());
    }
    record_deps(env, &installed)?;
    outcome
}

/// Dependencies recorded by the last run; empty if there is no usable record.
pub fn prev_deps(env: &Environment) -> Vec<String> {
    let path = env.path("envctoxfile");
    let Ok(content) = fs::read_to_string(&path) else {
        return Vec::new();
    };
    match serde_json::from_str::<DepsRecord>(&content) {
        Ok(record) => record.deps,
        Err(e) => {
            log::debug!("ignoring unreadable deps record {}: {e}", path.display());
            Vec::new()
        }
    }
}

pub fn record_deps(env: &Environment, deps: &[String]) -> Result<()> {
    let path = env.path("envctoxfile");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CtoxError::io(format!("failed to create {}", parent.display()), e))?;
    }
    let record = DepsRecord { deps: deps.to_vec() };
    let json = serde_json::to_string_pretty(&record)
        .map_err(|e| CtoxError::io("failed to encode deps record", e.into()))?;
    fs::write(&path, json).map_err(|e| CtoxError::io(format!("failed to write {}", path.display()), e))
}

pub fn reset_deps(env: &Environment) -> Result<()> {
    record_deps(env, &[])
}

/// Builds the sdist zip into `<toxdir>/dist` and returns its path.
pub fn make_dist(shell: &dyn Shell, layout: &Layout) -> Result<PathBuf> {
    let distdir = layout.distdir();
    let built = shell.safe_shell_out(
        &argv([
            "python",
            "setup.py",
            "sdist",
            "--quiet",
            "--formats=zip",
            "--dist-dir",
            &distdir.to_string_lossy(),
        ]),
        &layout.toxinidir,
    );
    if built {
        Ok(layout.package_zip())
    } else {
        Err(CtoxError::Dist)
    }
}

/// Installs the built package into the environment, without its deps.
pub fn install_dist(shell: &dyn Shell, env: &Environment, package_zip: &Path) -> bool {
    shell.safe_shell_out(
        &argv([
            &pip(env),
            "install",
            &package_zip.to_string_lossy(),
            "--no-deps",
            "--upgrade",
        ]),
        &env.path("toxdir"),
    )
}

/// `name-version` of the package in `toxinidir`.
pub fn package_name(shell: &dyn Shell, toxinidir: &Path) -> Result<String> {
    let out = shell.shell_out(&argv(["python", "setup.py", "--name", "--version"]), toxinidir)?;
    Ok(out.split_whitespace().collect::<Vec<_>>().join("-"))
}
