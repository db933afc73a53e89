//! The ctox Command-Line Interface.
//!
//! This module is the main entry point for the binary and orchestrates the
//! library: read `tox.ini`, build the sdist, run every environment and print
//! a summary.

use std::path::PathBuf;
use std::process;

use log::LevelFilter;
use termcolor::ColorChoice;

use crate::cli::args::CtoxArgs;
use crate::cli::output::{print_error, OutputSink, Status, StdoutSink};
use crate::config::{get_envlist, IniConfig};
use crate::env::{positional_args, Environment, Layout, ProcessEnv, VariableProvider};
use crate::errors::{CtoxError, Result};
use crate::pkg;
use crate::runner::{EnvOutcome, EnvRunner};
use crate::shell::{Shell, SystemShell};
use crate::subst::expand_envlist;

pub mod args;
pub mod output;

/// The main entry point for the CLI.
pub fn run() {
    let args = CtoxArgs::from_argv(std::env::args_os()).unwrap_or_else(|e| e.exit());
    init_logging(args.verbose);

    let mut sink = StdoutSink::new(ColorChoice::Auto);
    match execute(&args, &mut sink, &SystemShell, &ProcessEnv) {
        Ok(code) => process::exit(code),
        Err(e) => {
            print_error(e);
            process::exit(1);
        }
    }
}

/// `-v` raises the level from warn; `RUST_LOG` overrides it.
pub fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Runs ctox for `args`, returning the process exit code.
pub fn execute(
    args: &CtoxArgs,
    sink: &mut dyn OutputSink,
    shell: &dyn Shell,
    vars: &dyn VariableProvider,
) -> Result<i32> {
    let toxinidir = match &args.toxinidir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().map_err(|e| CtoxError::io("failed to read the current directory", e))?,
    };
    let config = IniConfig::read(&toxinidir.join("tox.ini"))?;
    let envlist = match &args.envlist {
        Some(raw) => expand_envlist(raw),
        None => get_envlist(&config),
    };

    if args.list_envs {
        for name in &envlist {
            sink.emit(name, Status::Plain);
        }
        return Ok(0);
    }

    if !shell.has_tool("conda") {
        return Err(CtoxError::ToolMissing {
            tool: "conda".to_string(),
        });
    }

    let toxdir: PathBuf = args.toxdir.clone().unwrap_or_else(|| toxinidir.join(".tox"));
    sink.emit(
        &format!("GLOB sdist-make: {}", toxinidir.join("setup.py").display()),
        Status::Bright,
    );
    let package = pkg::package_name(shell, &toxinidir)?;
    let layout = Layout::new(toxinidir, toxdir, package);
    let package_zip = pkg::make_dist(shell, &layout)?;
    let options = positional_args(&args.arguments);

    let mut outcomes = Vec::with_capacity(envlist.len());
    let mut runner = EnvRunner::new(shell, &mut *sink, package_zip);
    for name in &envlist {
        let env = Environment::for_layout(name.as_str(), &layout, options.clone(), &config, vars);
        outcomes.push((name, runner.run(&env)));
    }

    sink.emit("Summary", Status::Bright);
    sink.emit(&"-".repeat(23), Status::Plain);
    for (name, outcome) in &outcomes {
        sink.emit(&format!("{name} commands {outcome}"), outcome.status());
    }

    let failed = outcomes
        .iter()
        .any(|(_, outcome)| *outcome == EnvOutcome::Failed);
    Ok(i32::from(failed))
}
