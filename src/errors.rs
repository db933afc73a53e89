//! ctox error handling.
//!
//! Every failure in the crate is a [`CtoxError`]. `thiserror` provides the
//! `Display` text; the `miette::Diagnostic` impl below adds a stable code, a
//! help line and, for `tox.ini` syntax errors, a labelled source snippet.
//! The CLI renders errors through `miette::Report`.

use std::path::PathBuf;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = CtoxError> = std::result::Result<T, E>;

/// Shared, named source for diagnostics.
pub type SourceArc = Arc<NamedSource<String>>;

const ISSUES_URL: &str = "https://github.com/hayd/ctox/issues";

// ============================================================================
// ERROR TYPE
// ============================================================================

/// Unified error type for ctox.
#[derive(Debug, Error)]
pub enum CtoxError {
    /// A `{...}` placeholder that no substitution provider accepts.
    #[error("{{{placeholder}}} not understood in tox.ini file.")]
    UnresolvedPlaceholder { placeholder: String },

    /// `{env:KEY}` referenced a variable that is not set.
    #[error("environment variable '{key}' is not set (use {{env:{key}:}} for an empty default)")]
    MissingEnvironmentVariable { key: String },

    #[error("no tox.ini found at {}", .path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("invalid tox.ini: {message}")]
    ConfigSyntax {
        message: String,
        src: SourceArc,
        span: SourceSpan,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("command '{command}' {}", exit_status_text(.status))]
    CommandFailed {
        command: String,
        status: Option<i32>,
        output: String,
    },

    /// The command could not be started at all.
    #[error("could not run '{command}'")]
    CommandNotFound {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("empty command line")]
    EmptyCommand,

    #[error("{tool} not found")]
    ToolMissing { tool: String },

    #[error("unable to install {package}")]
    InstallFailed { package: String },

    #[error("setup.py sdist failed")]
    Dist,
}

fn exit_status_text(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("returned non-zero exit status {code}"),
        None => "was terminated by a signal".to_string(),
    }
}

impl CtoxError {
    pub fn unresolved(placeholder: impl Into<String>) -> Self {
        Self::UnresolvedPlaceholder {
            placeholder: placeholder.into(),
        }
    }

    pub fn missing_env_var(key: impl Into<String>) -> Self {
        Self::MissingEnvironmentVariable { key: key.into() }
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Syntax error at byte range `start..start + len` of the named file.
    pub fn config_syntax(src: &SourceArc, start: usize, len: usize, message: impl Into<String>) -> Self {
        Self::ConfigSyntax {
            message: message.into(),
            src: Arc::clone(src),
            span: SourceSpan::new(start.into(), len.max(1)),
        }
    }

    /// Stable code suffix, appended to `ctox::`.
    pub fn code_suffix(&self) -> &'static str {
        match self {
            CtoxError::UnresolvedPlaceholder { .. } => "subst::unresolved",
            CtoxError::MissingEnvironmentVariable { .. } => "subst::missing_env",
            CtoxError::ConfigNotFound { .. } => "config::not_found",
            CtoxError::ConfigSyntax { .. } => "config::syntax",
            CtoxError::Io { .. } => "io",
            CtoxError::CommandFailed { .. } => "shell::failed",
            CtoxError::CommandNotFound { .. } => "shell::not_found",
            CtoxError::EmptyCommand => "shell::empty",
            CtoxError::ToolMissing { .. } => "shell::tool_missing",
            CtoxError::InstallFailed { .. } => "pkg::install",
            CtoxError::Dist => "pkg::sdist",
        }
    }

    fn help_text(&self) -> Option<String> {
        match self {
            CtoxError::UnresolvedPlaceholder { .. } => Some(format!(
                "If this is a valid tox.ini substitution, please open an issue and request support: {ISSUES_URL}"
            )),
            CtoxError::ToolMissing { tool } if tool == "conda" => Some(
                "You need to install conda to use ctox. The recommended way is to download \
                 miniconda. Do not install conda via pip."
                    .to_string(),
            ),
            CtoxError::CommandNotFound { command, .. } => {
                Some(format!("Is {command} in your dependencies?"))
            }
            _ => None,
        }
    }
}

// ============================================================================
// DIAGNOSTICS
// ============================================================================

impl Diagnostic for CtoxError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("ctox::{}", self.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.help_text()
            .map(|h| Box::new(h) as Box<dyn std::fmt::Display + 'a>)
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        match self {
            CtoxError::ConfigSyntax { src, .. } => Some(src.as_ref() as &dyn SourceCode),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        match self {
            CtoxError::ConfigSyntax { message, span, .. } => Some(Box::new(std::iter::once(
                LabeledSpan::new_with_span(Some(message.clone()), *span),
            ))),
            _ => None,
        }
    }
}

/// Converts file content into a shared named source.
pub fn to_error_source(name: impl AsRef<str>, content: impl Into<String>) -> SourceArc {
    Arc::new(NamedSource::new(name.as_ref(), content.into()))
}

#[cfg(test)]
mod tests {
    use miette::Report;

    use super::*;

    fn render(err: CtoxError) -> String {
        let report = Report::new(err);
        format!("{report:?}")
    }

    #[test]
    fn unresolved_placeholder_keeps_braces_and_help() {
        let err = CtoxError::unresolved("foo:bar");
        assert_eq!("{foo:bar} not understood in tox.ini file.", err.to_string());
        let output = render(err);
        assert!(output.contains("open an issue"));
        assert!(output.contains("ctox::subst::unresolved"));
    }

    #[test]
    fn missing_env_var_names_key() {
        let err = CtoxError::missing_env_var("NOTAENVKEY");
        assert!(err.to_string().contains("'NOTAENVKEY'"));
        assert!(err.to_string().contains("{env:NOTAENVKEY:}"));
    }

    #[test]
    fn config_syntax_labels_line() {
        let src = to_error_source("tox.ini", "[tox]\nnot a pair\n");
        let err = CtoxError::config_syntax(&src, 6, 10, "expected `key = value`");
        let output = render(err);
        assert!(output.contains("tox.ini"));
        assert!(output.contains("expected `key = value`"));
    }

    #[test]
    fn command_failed_reports_status() {
        let err = CtoxError::CommandFailed {
            command: "python -m nose".to_string(),
            status: Some(2),
            output: String::new(),
        };
        assert_eq!(
            "command 'python -m nose' returned non-zero exit status 2",
            err.to_string()
        );
        let err = CtoxError::CommandFailed {
            command: "sleep".to_string(),
            status: None,
            output: String::new(),
        };
        assert!(err.to_string().ends_with("terminated by a signal"));
    }

    #[test]
    fn conda_missing_has_install_help() {
        let output = render(CtoxError::ToolMissing {
            tool: "conda".to_string(),
        });
        assert!(output.contains("miniconda"));
    }
}
