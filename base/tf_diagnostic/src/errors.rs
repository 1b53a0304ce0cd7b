//! Errors from the few fallible setup paths.
//!
//! Posting diagnostics never fails; only code registration and explicit
//! singleton initialization can.

use thiserror::Error;

/// Failure to register a diagnostic code name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("diagnostic code names must not be empty")]
    EmptyName,
    #[error("diagnostic code space exhausted after {count} registrations")]
    Exhausted { count: usize },
}

/// Failure to install the process-wide diagnostic manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InitError {
    #[error("the diagnostic manager was already initialized")]
    AlreadyInitialized,
}
