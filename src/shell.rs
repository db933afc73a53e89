//! Running external programs.
//!
//! Everything ctox does to the outside world (conda, pip, `setup.py`, the
//! configured test commands) goes through the [`Shell`] trait so the driver
//! can be exercised against a scripted fake.

use std::path::Path;
use std::process::Command;

use crate::errors::{CtoxError, Result};

pub trait Shell {
    /// Runs `cmd` in `cwd`, returning its combined stdout and stderr, trimmed.
    fn shell_out(&self, cmd: &[String], cwd: &Path) -> Result<String>;

    /// Runs `cmd` with its output suppressed; `false` on any failure.
    fn safe_shell_out(&self, cmd: &[String], cwd: &Path) -> bool {
        match self.shell_out(cmd, cwd) {
            Ok(_) => true,
            Err(e) => {
                log::debug!("suppressed failure: {e}");
                false
            }
        }
    }

    /// True if `tool` can be found on `PATH`.
    fn has_tool(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }
}

/// [`Shell`] backed by `std::process::Command`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemShell;

impl Shell for SystemShell {
    fn shell_out(&self, cmd: &[String], cwd: &Path) -> Result<String> {
        let (program, args) = cmd.split_first().ok_or(CtoxError::EmptyCommand)?;
        let command = cmd.join(" ");
        log::debug!("running `{command}` in {}", cwd.display());

        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|source| CtoxError::CommandNotFound {
                command: program.clone(),
                source,
            })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let text = text.trim().to_string();

        if output.status.success() {
            Ok(text)
        } else {
            Err(CtoxError::CommandFailed {
                command,
                status: output.status.code(),
                output: text,
            })
        }
    }
}
