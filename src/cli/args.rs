//! Defines the command-line arguments for the ctox CLI.
//!
//! This module uses the `clap` crate with its "derive" feature. Everything
//! after the first `--` is kept verbatim for `{posargs}`.

use clap::{ArgAction, Parser};
use std::ffi::OsString;
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(name = "ctox", version, about = "Tox but with conda.")]
pub struct CtoxArgs {
    /// Project directory containing tox.ini (default: current directory).
    #[arg(short = 'c', long, value_name = "DIR")]
    pub toxinidir: Option<PathBuf>,

    /// Where environments and the sdist are kept (default: <toxinidir>/.tox).
    #[arg(long, value_name = "DIR")]
    pub toxdir: Option<PathBuf>,

    /// Print the expanded environment list and exit.
    #[arg(short = 'l', long)]
    pub list_envs: bool,

    /// Environments to run instead of `[tox] envlist`, e.g. `py{27,34}`.
    #[arg(short = 'e', long, value_name = "ENVS")]
    pub envlist: Option<String>,

    /// More logging; repeat for more detail.
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Arguments substituted for {posargs}.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub arguments: Vec<String>,
}

impl CtoxArgs {
    /// Parses a full argv, program name first.
    pub fn from_argv<I, T>(argv: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
        let escaped = argv
            .iter()
            .skip(1)
            .position(|arg| arg == "--")
            .map(|i| argv.split_off(i + 1));

        let mut args = Self::try_parse_from(argv)?;
        if let Some(rest) = escaped {
            args.arguments
                .extend(rest.into_iter().map(|arg| arg.to_string_lossy().into_owned()));
        }
        Ok(args)
    }
}
