//! Shared helpers for ctox integration tests: a scripted shell and
//! throwaway project directories.

#![allow(dead_code)]

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use ctox::shell::Shell;
use ctox::{CtoxError, Result};
use tempfile::TempDir;

pub const FIXTURE_TOX_INI: &str = include_str!("../fixtures/tox.ini");

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

/// A project directory holding `tox_ini` as its tox.ini.
pub fn project(tox_ini: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("create temp project");
    fs::write(dir.path().join("tox.ini"), tox_ini).expect("write tox.ini");
    dir
}

/// A shell that never spawns anything.
///
/// `conda create -p NAME` makes `<cwd>/NAME/conda-meta` so environments look
/// real to the next run; `setup.py --name --version` answers `pkg 0.1`.
pub struct FakeShell {
    pub calls: RefCell<Vec<Vec<String>>>,
    pub fails: Box<dyn Fn(&[String]) -> bool>,
    pub conda: bool,
}

impl Default for FakeShell {
    fn default() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fails: Box::new(|_| false),
            conda: true,
        }
    }
}

impl FakeShell {
    pub fn failing(fails: impl Fn(&[String]) -> bool + 'static) -> Self {
        Self {
            fails: Box::new(fails),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Every call whose program path ends with `program`.
    pub fn calls_to(&self, program: &str) -> Vec<Vec<String>> {
        self.calls()
            .into_iter()
            .filter(|cmd| cmd[0].ends_with(program))
            .collect()
    }
}

impl Shell for FakeShell {
    fn shell_out(&self, cmd: &[String], cwd: &Path) -> Result<String> {
        self.calls.borrow_mut().push(cmd.to_vec());
        if (self.fails)(cmd) {
            return Err(CtoxError::CommandFailed {
                command: cmd.join(" "),
                status: Some(1),
                output: "boom".to_string(),
            });
        }
        match cmd.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            ["conda", "create", "-p", name, ..] => {
                fs::create_dir_all(cwd.join(name).join("conda-meta"))
                    .map_err(|e| CtoxError::io("fake conda create", e))?;
                Ok(String::new())
            }
            ["python", "setup.py", "--name", "--version"] => Ok("pkg\n0.1".to_string()),
            _ => Ok(String::new()),
        }
    }

    fn has_tool(&self, tool: &str) -> bool {
        tool != "conda" || self.conda
    }
}
