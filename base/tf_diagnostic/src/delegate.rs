//! Delegates intercept diagnostics instead of the default terminal echo.
//!
//! Delegates are invoked outside every internal lock. A diagnostic posted
//! from inside a delegate callback does not reach any delegate; it is
//! echoed directly.

use crate::{CallContext, Error, Status, Warning};

/// Receiver of diagnostics registered with
/// [`DiagnosticMgr::add_delegate`](crate::DiagnosticMgr::add_delegate).
pub trait Delegate: Send + Sync {
    fn issue_error(&self, err: &Error);

    /// Called instead of terminating the process.
    fn issue_fatal_error(&self, context: &CallContext, msg: &str);

    fn issue_status(&self, status: &Status);

    fn issue_warning(&self, warning: &Warning);
}

/// Delegate that turns diagnostics into `tracing` events.
///
/// Errors and fatal errors become `error!` events, warnings `warn!`,
/// statuses `info!`. The target is this crate; fields carry the code and
/// call site.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDelegate;

impl Delegate for TracingDelegate {
    fn issue_error(&self, err: &Error) {
        tracing::error!(
            code = err.diagnostic_code_as_str(),
            serial = err.serial(),
            file = err.source_file(),
            line = err.source_line(),
            function = err.source_function(),
            "{}",
            err.commentary()
        );
    }

    fn issue_fatal_error(&self, context: &CallContext, msg: &str) {
        tracing::error!(
            fatal = true,
            file = context.file(),
            line = context.line(),
            function = context.function(),
            "{msg}"
        );
    }

    fn issue_status(&self, status: &Status) {
        tracing::info!(
            code = status.diagnostic_code_as_str(),
            file = status.source_file(),
            line = status.source_line(),
            function = status.source_function(),
            "{}",
            status.commentary()
        );
    }

    fn issue_warning(&self, warning: &Warning) {
        tracing::warn!(
            code = warning.diagnostic_code_as_str(),
            file = warning.source_file(),
            line = warning.source_line(),
            function = warning.source_function(),
            "{}",
            warning.commentary()
        );
    }
}
