//! Terminal echo for diagnostics nobody else handled.
//!
//! When no delegate is registered, the manager writes each diagnostic in a
//! fixed one-line format:
//!
//! ```text
//! RuntimeError: in open at line 12 of stage.rs -- could not open layer
//! Warning (secondary thread): deprecated prim type [usdcat]
//! ```
//!
//! The second form is used when the call site is hidden or unknown.
//!
//! Output goes to an [`EchoSink`], selected through [`EchoTarget`]:
//! stderr by default, a buffer for tests and embedding hosts, or nowhere.
//! Dispatch is an enum match rather than a trait object since this runs
//! for every unhandled diagnostic.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Write};
use std::sync::LazyLock;

use parking_lot::Mutex;

use crate::CallContext;

/// ANSI color codes for terminal output.
mod colors {
    pub const ERROR: &str = "\x1b[1;31m"; // Bold red
    pub const WARNING: &str = "\x1b[1;33m"; // Bold yellow
    pub const STATUS: &str = "\x1b[1;36m"; // Bold cyan
    pub const RESET: &str = "\x1b[0m";
}

/// Color output mode for the terminal echo.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorMode {
    /// Color when the destination is a terminal.
    #[default]
    Auto,
    /// Always use colors.
    Always,
    /// Never use colors.
    Never,
}

impl ColorMode {
    /// Resolve to a boolean; `is_tty` only matters for `Auto`.
    pub fn should_use_colors(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

/// Where unhandled diagnostics are echoed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EchoTarget {
    /// Standard error.
    #[default]
    Stderr,
    /// An in-memory buffer, readable through the manager.
    Buffer,
    /// Discard everything.
    Silent,
}

/// Which kind of diagnostic is being echoed; selects the color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum EchoKind {
    Error,
    Warning,
    Status,
    Fatal,
}

impl EchoKind {
    fn color(self) -> &'static str {
        match self {
            EchoKind::Error | EchoKind::Fatal => colors::ERROR,
            EchoKind::Warning => colors::WARNING,
            EchoKind::Status => colors::STATUS,
        }
    }
}

/// Echo destination owned by a manager.
pub(crate) enum EchoSink {
    Stderr { colors: bool },
    Buffer { colors: bool, buffer: Mutex<String> },
    Silent,
}

impl EchoSink {
    pub(crate) fn new(target: EchoTarget, mode: ColorMode) -> Self {
        match target {
            EchoTarget::Stderr => EchoSink::Stderr {
                colors: mode.should_use_colors(io::stderr().is_terminal()),
            },
            EchoTarget::Buffer => EchoSink::Buffer {
                colors: mode.should_use_colors(false),
                buffer: Mutex::new(String::new()),
            },
            EchoTarget::Silent => EchoSink::Silent,
        }
    }

    /// Format and write one diagnostic.
    pub(crate) fn echo(&self, kind: EchoKind, code_name: &str, context: &CallContext, msg: &str) {
        match self {
            EchoSink::Stderr { colors } => {
                let line = render(kind, code_name, context, msg, *colors);
                let _ = io::stderr().lock().write_all(line.as_bytes());
            }
            EchoSink::Buffer { colors, buffer } => {
                let line = render(kind, code_name, context, msg, *colors);
                buffer.lock().push_str(&line);
            }
            EchoSink::Silent => {}
        }
    }

    /// Captured output; empty unless this is a buffer sink.
    pub(crate) fn output(&self) -> String {
        match self {
            EchoSink::Buffer { buffer, .. } => buffer.lock().clone(),
            EchoSink::Stderr { .. } | EchoSink::Silent => String::new(),
        }
    }

    pub(crate) fn clear(&self) {
        if let EchoSink::Buffer { buffer, .. } = self {
            buffer.lock().clear();
        }
    }

    /// Write a fatal message straight to stderr, whatever the target.
    ///
    /// The process is about to end, so a buffer would never be read.
    pub(crate) fn echo_fatal(&self, code_name: &str, context: &CallContext, msg: &str) {
        let colors = matches!(self, EchoSink::Stderr { colors: true });
        let line = render(EchoKind::Fatal, code_name, context, msg, colors);
        if let EchoSink::Buffer { buffer, .. } = self {
            buffer.lock().push_str(&line);
        }
        let mut stderr = io::stderr().lock();
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

/// Program name shown in the short form.
static PROGRAM_NAME: LazyLock<String> = LazyLock::new(|| {
    std::env::current_exe()
        .ok()
        .and_then(|path| path.file_name().map(|name| name.to_string_lossy().into_owned()))
        .unwrap_or_else(|| String::from("unknown program"))
});

fn is_main_thread() -> bool {
    std::thread::current().name() == Some("main")
}

/// Format a diagnostic the way the terminal echo prints it, without color.
///
/// The result ends with a newline.
pub fn format_diagnostic(code_name: &str, context: &CallContext, msg: &str) -> String {
    render(EchoKind::Error, code_name, context, msg, false)
}

fn render(kind: EchoKind, code_name: &str, context: &CallContext, msg: &str, colors: bool) -> String {
    let mut out = String::with_capacity(code_name.len() + msg.len() + 64);
    if kind == EchoKind::Fatal {
        out.push_str("Fatal ");
    }
    if colors {
        let _ = write!(out, "{}{code_name}{}", kind.color(), colors::RESET);
    } else {
        out.push_str(code_name);
    }
    if !is_main_thread() {
        out.push_str(" (secondary thread)");
    }
    if context.is_hidden() || context.is_empty() {
        let _ = writeln!(out, ": {msg} [{}]", PROGRAM_NAME.as_str());
    } else {
        let _ = writeln!(
            out,
            ": in {} at line {} of {} -- {msg}",
            context.function(),
            context.line(),
            context.file()
        );
    }
    out
}
