//! Handles all user-facing output for the CLI.
//!
//! Progress lines go through an [`OutputSink`] so runs can be captured in
//! tests; on a terminal they are colored by [`Status`]. Errors are rendered
//! with `miette`.

use std::io::Write;

use difference::{Changeset, Difference};
use miette::Report;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::errors::CtoxError;

// ============================================================================
// OUTPUT SINKS: OutputBuffer and StdoutSink implementations
// ============================================================================

/// How a line of output should stand out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Plain,
    Bright,
    Ok,
    Err,
    Warn,
}

impl Status {
    fn color_spec(self) -> ColorSpec {
        let mut spec = ColorSpec::new();
        match self {
            Status::Plain => {}
            Status::Bright => {
                spec.set_bold(true);
            }
            Status::Ok => {
                spec.set_fg(Some(Color::Green));
            }
            Status::Err => {
                spec.set_fg(Some(Color::Red));
            }
            Status::Warn => {
                spec.set_fg(Some(Color::Yellow));
            }
        }
        spec
    }
}

/// Destination for progress lines.
pub trait OutputSink {
    fn emit(&mut self, text: &str, status: Status);
}

/// OutputBuffer: collects output into a String for testing or programmatic capture.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pub buffer: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

impl OutputSink for OutputBuffer {
    fn emit(&mut self, text: &str, _status: Status) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(text);
    }
}

/// StdoutSink: writes colored output to stdout.
pub struct StdoutSink {
    stream: StandardStream,
}

impl StdoutSink {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stream: StandardStream::stdout(choice),
        }
    }
}

impl OutputSink for StdoutSink {
    fn emit(&mut self, text: &str, status: Status) {
        let _ = self.stream.set_color(&status.color_spec());
        let _ = writeln!(self.stream, "{text}");
        let _ = self.stream.reset();
    }
}

// ============================================================================
// CORE OUTPUT FUNCTIONS
// ============================================================================

/// Emits a line diff from `before` to `after`.
pub fn emit_diff(sink: &mut dyn OutputSink, before: &[String], after: &[String]) {
    let changeset = Changeset::new(&before.join("\n"), &after.join("\n"), "\n");
    for diff in &changeset.diffs {
        let (marker, status, text) = match diff {
            Difference::Same(x) => (' ', Status::Plain, x),
            Difference::Add(x) => ('+', Status::Ok, x),
            Difference::Rem(x) => ('-', Status::Err, x),
        };
        for line in text.lines() {
            sink.emit(&format!("{marker}{line}"), status);
        }
    }
}

/// The full diagnostic text of an error.
pub fn render_error(err: CtoxError) -> String {
    format!("{:?}", Report::new(err))
}

/// Prints an error diagnostic to stderr.
pub fn print_error(err: CtoxError) {
    eprintln!("{}", render_error(err));
}
