//! Manager configuration.

use crate::echo::{ColorMode, EchoTarget};

/// Configuration for a [`DiagnosticMgr`](crate::DiagnosticMgr).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct DiagnosticConfig {
    /// Where diagnostics go when no delegate handles them.
    pub echo: EchoTarget,
    /// Coloring of the code name in echoed lines.
    pub color: ColorMode,
    /// Keep errors posted outside any error mark in the thread's list.
    ///
    /// When off, such errors are reported and then dropped.
    pub retain_unmarked_errors: bool,
    /// Maintain per-thread crash-log text for pending errors.
    pub crash_log: bool,
}

impl Default for DiagnosticConfig {
    fn default() -> Self {
        DiagnosticConfig {
            echo: EchoTarget::Stderr,
            color: ColorMode::Auto,
            retain_unmarked_errors: true,
            crash_log: true,
        }
    }
}

impl DiagnosticConfig {
    /// Capture echo output in memory, uncolored (for testing).
    pub fn capture() -> Self {
        DiagnosticConfig {
            echo: EchoTarget::Buffer,
            color: ColorMode::Never,
            ..DiagnosticConfig::default()
        }
    }

    #[must_use]
    pub fn with_echo(mut self, echo: EchoTarget) -> Self {
        self.echo = echo;
        self
    }

    #[must_use]
    pub fn with_color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_retain_unmarked_errors(mut self, retain: bool) -> Self {
        self.retain_unmarked_errors = retain;
        self
    }

    #[must_use]
    pub fn with_crash_log(mut self, enabled: bool) -> Self {
        self.crash_log = enabled;
        self
    }
}
