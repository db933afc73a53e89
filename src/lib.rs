//! ctox: tox with conda.
//!
//! The heart of the crate is [`subst`], the tox.ini substitution engine:
//! envlist brace expansion, factor-conditional lines, `{...}` placeholders
//! and quote-aware command splitting. [`config`] reads `tox.ini` and derives
//! each environment's deps and commands; [`runner`] and [`pkg`] drive conda
//! and pip through a [`shell::Shell`].

pub use crate::errors::{CtoxError, Result};

pub mod cli;
pub mod config;
pub mod env;
pub mod errors;
pub mod pkg;
pub mod runner;
pub mod shell;
pub mod subst;
