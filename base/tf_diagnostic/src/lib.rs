//! Thread-aware diagnostics: errors, warnings, status messages, and fatal
//! errors posted from anywhere in a process.
//!
//! # Model
//!
//! - Every diagnostic carries a [`DiagnosticCode`], a [`CallContext`], a
//!   commentary string, optional [`DiagnosticInfo`], and a process-wide
//!   serial number.
//! - Errors are kept in a list owned by the thread that posted them.
//!   Warnings and statuses are delivered and forgotten.
//! - Delivery goes to the registered [`Delegate`]s, or to a terminal echo
//!   when there are none. A fatal error with no delegate ends the process.
//! - An [`ErrorMark`] detects and clears the errors posted in a scope. An
//!   [`ErrorTransport`] moves them to another thread.
//!
//! # Posting
//!
//! ```text
//! tf_coding_error!("prim {path} has no parent");
//! tf_error!(code, "could not open {}", layer.identifier());
//! tf_warn!("deprecated field '{name}'");
//! ```
//!
//! The macros capture the call site and post to the process-wide
//! [`DiagnosticMgr::instance`]. Use the manager methods directly to post
//! with a custom code string, payload, or quiet flag, or to target an
//! independent manager.

mod call_context;
mod code;
mod config;
mod delegate;
mod echo;
pub mod errors;
mod mark;
mod mgr;
mod notice;
mod record;
mod tracing_setup;
mod transport;

pub use call_context::{intern, CallContext};
pub use code::{DiagnosticCode, UNKNOWN_CODE_NAME};
pub use config::DiagnosticConfig;
pub use delegate::{Delegate, TracingDelegate};
pub use echo::{format_diagnostic, ColorMode, EchoTarget};
pub use errors::{InitError, RegistryError};
pub use mark::ErrorMark;
pub use mgr::{CrashLogHook, DiagnosticMgr, ErrorPos};
pub use notice::{DiagnosticNotice, Listener, ListenerKey};
pub use record::{DiagnosticBase, DiagnosticInfo, Error, Status, Warning};
pub use tracing_setup::init_tracing;
pub use transport::ErrorTransport;

#[doc(hidden)]
#[macro_export]
macro_rules! __tf_post {
    ($method:ident, $code:expr, $($arg:tt)+) => {{
        let code: $crate::DiagnosticCode = $code;
        $crate::DiagnosticMgr::instance().$method(
            code,
            code.name(),
            $crate::call_context!(),
            ::std::format!($($arg)+),
            ::std::option::Option::None,
            false,
        )
    }};
}

/// Post an error with an explicit code.
#[macro_export]
macro_rules! tf_error {
    ($code:expr, $($arg:tt)+) => {
        $crate::__tf_post!(post_error, $code, $($arg)+)
    };
}

/// Post a `CodingError`: a caller broke an API contract.
#[macro_export]
macro_rules! tf_coding_error {
    ($($arg:tt)+) => {
        $crate::__tf_post!(post_error, $crate::DiagnosticCode::CODING_ERROR, $($arg)+)
    };
}

/// Post a `RuntimeError`: an operation failed for an external reason.
#[macro_export]
macro_rules! tf_runtime_error {
    ($($arg:tt)+) => {
        $crate::__tf_post!(post_error, $crate::DiagnosticCode::RUNTIME_ERROR, $($arg)+)
    };
}

#[macro_export]
macro_rules! tf_warn {
    ($($arg:tt)+) => {
        $crate::__tf_post!(post_warning, $crate::DiagnosticCode::WARNING, $($arg)+)
    };
}

#[macro_export]
macro_rules! tf_status {
    ($($arg:tt)+) => {
        $crate::__tf_post!(post_status, $crate::DiagnosticCode::STATUS, $($arg)+)
    };
}

/// Post a `FatalError`. Unless a delegate intercepts it, the process aborts.
#[macro_export]
macro_rules! tf_fatal_error {
    ($($arg:tt)+) => {
        $crate::DiagnosticMgr::instance().post_fatal(
            &$crate::call_context!(),
            $crate::DiagnosticCode::FATAL_ERROR,
            &::std::format!($($arg)+),
        )
    };
}

/// Post a `FatalCodingError`. Unless a delegate intercepts it, the process
/// aborts.
#[macro_export]
macro_rules! tf_fatal_coding_error {
    ($($arg:tt)+) => {
        $crate::DiagnosticMgr::instance().post_fatal(
            &$crate::call_context!(),
            $crate::DiagnosticCode::FATAL_CODING_ERROR,
            &::std::format!($($arg)+),
        )
    };
}
