//! Setting up and testing one environment.
//!
//! An [`EnvRunner`] takes an [`Environment`] through the whole cycle: skip it
//! if ctox cannot build its python, (re)create it when its dependencies
//! changed, install the package under test and run every configured command.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::output::{emit_diff, render_error, OutputSink, Status};
use crate::config::{get_changedir, get_commands, get_deps, get_whitelist};
use crate::env::Environment;
use crate::errors::{CtoxError, Result};
use crate::pkg;
use crate::shell::Shell;

/// How one environment's run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnvOutcome {
    Succeeded,
    Failed,
    Skipped,
}

impl EnvOutcome {
    pub fn status(self) -> Status {
        match self {
            EnvOutcome::Succeeded => Status::Ok,
            EnvOutcome::Failed => Status::Err,
            EnvOutcome::Skipped => Status::Warn,
        }
    }
}

impl fmt::Display for EnvOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EnvOutcome::Succeeded => "succeeded",
            EnvOutcome::Failed => "failed",
            EnvOutcome::Skipped => "skipped",
        })
    }
}

/// Everything an environment's config expands to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvPlan {
    pub changedir: PathBuf,
    pub whitelist: Vec<String>,
    pub deps: Vec<String>,
    pub commands: Vec<Vec<String>>,
}

impl EnvPlan {
    /// Expands the environment's values. `{changedir}` is available to deps
    /// and commands once it has been resolved.
    pub fn resolve(env: &Environment) -> Result<Self> {
        let changedir = get_changedir(env)?;
        let env = env.clone().with_attribute("changedir", changedir.clone());
        Ok(Self {
            changedir: PathBuf::from(changedir),
            whitelist: get_whitelist(env.config()),
            deps: get_deps(&env)?,
            commands: get_commands(&env)?,
        })
    }
}

pub struct EnvRunner<'a> {
    shell: &'a dyn Shell,
    sink: &'a mut dyn OutputSink,
    package_zip: PathBuf,
}

impl<'a> EnvRunner<'a> {
    pub fn new(shell: &'a dyn Shell, sink: &'a mut dyn OutputSink, package_zip: PathBuf) -> Self {
        Self {
            shell,
            sink,
            package_zip,
        }
    }

    fn emit(&mut self, text: &str, status: Status) {
        self.sink.emit(text, status);
    }

    fn emit_error(&mut self, err: CtoxError) {
        let text = render_error(err);
        self.emit(&text, Status::Err);
    }

    /// Runs one environment to completion. Failures are reported, not returned.
    pub fn run(&mut self, env: &Environment) -> EnvOutcome {
        let name = env.name();
        let Some(python) = env.py_version() else {
            self.emit(&format!("Skipping unsupported python version {name}"), Status::Bright);
            return EnvOutcome::Skipped;
        };
        log::info!("{name}: python {python}");

        let plan = match EnvPlan::resolve(env) {
            Ok(plan) => plan,
            Err(e) => {
                self.emit_error(e);
                return EnvOutcome::Failed;
            }
        };

        match self.prepare(env, &python, &plan) {
            Ok(true) => {}
            Ok(false) => return EnvOutcome::Failed,
            Err(e) => {
                self.emit_error(e);
                return EnvOutcome::Failed;
            }
        }

        self.emit(&format!("{name} inst: {}", env.attribute("envdistdir").unwrap_or_default()), Status::Bright);
        if !pkg::install_dist(self.shell, env, &self.package_zip) {
            self.emit("    install failed.", Status::Err);
            return EnvOutcome::Failed;
        }

        self.emit(&format!("{name} runtests"), Status::Bright);
        if self.run_commands(env, &plan) {
            EnvOutcome::Failed
        } else {
            EnvOutcome::Succeeded
        }
    }

    /// Makes sure the environment exists with exactly the planned deps.
    ///
    /// `Ok(false)` when a dependency could not be installed.
    fn prepare(&mut self, env: &Environment, python: &str, plan: &EnvPlan) -> Result<bool> {
        let name = env.name();
        let envdir = env.attribute("envdir").unwrap_or_default();
        let exists = pkg::env_exists(env);
        let previous = pkg::prev_deps(env);

        if exists && previous == plan.deps {
            self.emit(&format!("{name} cached (deps unchanged): {envdir}"), Status::Bright);
            return Ok(true);
        }
        if exists {
            self.emit(&format!("{name} deps changed:"), Status::Bright);
            emit_diff(&mut *self.sink, &previous, &plan.deps);
        }

        self.emit(&format!("{name} create: {envdir}"), Status::Bright);
        pkg::create_env(self.shell, env, python, exists)?;
        pkg::reset_deps(env)?;

        self.emit(&format!("{name} installdeps: {}", plan.deps.join(", ")), Status::Bright);
        match pkg::install_deps(self.shell, env, &plan.deps) {
            Ok(()) => Ok(true),
            Err(CtoxError::InstallFailed { package }) => {
                self.emit(&format!("    Unable to install {package}."), Status::Err);
                self.emit("    deps installation failed, aborted.", Status::Err);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Runs every command, even after one fails. True if any failed.
    pub fn run_commands(&mut self, env: &Environment, plan: &EnvPlan) -> bool {
        let mut failing = false;
        for command in &plan.commands {
            failing |= self.run_one_command(env, plan, command);
        }
        failing
    }

    /// True if the command failed.
    fn run_one_command(&mut self, env: &Environment, plan: &EnvPlan, command: &[String]) -> bool {
        let Some(cmd) = command.first() else {
            return false;
        };
        let envbindir = env.attribute("envbindir").unwrap_or_default();
        let in_envbindir = !envbindir.is_empty() && cmd.starts_with(envbindir);

        self.emit(&format!("({})$ {}", env.name(), display_command(command, envbindir)), Status::Plain);

        let line = command.join(" ");
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return false;
        }

        let mut argv = command.to_vec();
        if !in_envbindir && !envbindir.is_empty() && !plan.whitelist.contains(cmd) {
            argv[0] = Path::new(envbindir).join(cmd).to_string_lossy().into_owned();
        }

        match self.shell.shell_out(&argv, &plan.changedir) {
            Ok(out) => {
                if !out.is_empty() {
                    self.emit(&out, Status::Plain);
                }
                false
            }
            Err(CtoxError::CommandFailed { output, status, command }) => {
                if !output.is_empty() {
                    self.emit(&output, Status::Plain);
                }
                self.emit_error(CtoxError::CommandFailed {
                    command,
                    status,
                    output: String::new(),
                });
                true
            }
            Err(CtoxError::CommandNotFound { source, .. }) => {
                self.emit_error(CtoxError::CommandNotFound {
                    command: cmd.clone(),
                    source,
                });
                true
            }
            Err(e) => {
                self.emit_error(e);
                true
            }
        }
    }
}

/// The command as shown to the user: the program relative to the bin
/// directory, arguments containing spaces in double quotes.
fn display_command(command: &[String], envbindir: &str) -> String {
    command
        .iter()
        .enumerate()
        .map(|(i, arg)| {
            let shown = match Path::new(arg).strip_prefix(envbindir) {
                Ok(rel) if i == 0 && !envbindir.is_empty() && !rel.as_os_str().is_empty() => {
                    rel.to_string_lossy().into_owned()
                }
                _ => arg.clone(),
            };
            if shown.contains(' ') {
                format!("\"{shown}\"")
            } else {
                shown
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn display_strips_bin_dir_and_quotes_spaces() {
        assert_eq!(
            "python -c \"print('hi there')\"",
            display_command(&strings(&["/e/bin/python", "-c", "print('hi there')"]), "/e/bin")
        );
        assert_eq!("/e/bin", display_command(&strings(&["/e/bin"]), "/e/bin"));
        assert_eq!("echo x", display_command(&strings(&["echo", "x"]), "/e/bin"));
        assert_eq!("echo", display_command(&strings(&["echo"]), ""));
    }

    #[test]
    fn outcome_labels() {
        assert_eq!("succeeded", EnvOutcome::Succeeded.to_string());
        assert_eq!("failed", EnvOutcome::Failed.to_string());
        assert_eq!("skipped", EnvOutcome::Skipped.to_string());
        assert_eq!(Status::Err, EnvOutcome::Failed.status());
    }
}
