//! Diagnostic codes.
//!
//! A [`DiagnosticCode`] is an open enumeration: a small integer handle whose
//! display name lives in a process-wide table. The built-in categories are
//! associated constants; libraries add their own codes at startup with
//! [`DiagnosticCode::register`].
//!
//! ```text
//! static SMALL: LazyLock<DiagnosticCode> =
//!     LazyLock::new(|| DiagnosticCode::register("SMALL").unwrap_or(DiagnosticCode::RUNTIME_ERROR));
//! tf_error!(*SMALL, "value {} is too small", v);
//! ```

use std::fmt;
use std::sync::LazyLock;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::RegistryError;

/// Name reported for values that were never registered.
pub const UNKNOWN_CODE_NAME: &str = "UnknownDiagnosticCode";

/// Built-in codes and their names, in value order.
const BUILTIN_NAMES: [&str; 8] = [
    "CodingError",
    "FatalCodingError",
    "RuntimeError",
    "FatalError",
    "NonFatalError",
    "Warning",
    "Status",
    "ApplicationExit",
];

/// First value handed out to user registrations.
const FIRST_USER_VALUE: u32 = 64;

/// Category of a diagnostic.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct DiagnosticCode(u32);

impl DiagnosticCode {
    /// Contract violation by calling code.
    pub const CODING_ERROR: DiagnosticCode = DiagnosticCode(0);
    /// Contract violation that cannot be recovered from.
    pub const FATAL_CODING_ERROR: DiagnosticCode = DiagnosticCode(1);
    /// Expected but exceptional runtime condition.
    pub const RUNTIME_ERROR: DiagnosticCode = DiagnosticCode(2);
    /// Unrecoverable failure.
    pub const FATAL_ERROR: DiagnosticCode = DiagnosticCode(3);
    /// Recoverable failure without a more specific category.
    pub const NONFATAL_ERROR: DiagnosticCode = DiagnosticCode(4);
    /// Advisory message.
    pub const WARNING: DiagnosticCode = DiagnosticCode(5);
    /// Informational message.
    pub const STATUS: DiagnosticCode = DiagnosticCode(6);
    /// Orderly but immediate process exit.
    pub const APPLICATION_EXIT: DiagnosticCode = DiagnosticCode(7);

    /// Register a user code, or return the existing code with this name.
    pub fn register(name: &str) -> Result<DiagnosticCode, RegistryError> {
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if let Some(code) = Self::lookup(name) {
            return Ok(code);
        }

        let mut table = REGISTRY.write();
        // Double-check after acquiring the write lock.
        if let Some(&value) = table.by_name.get(name) {
            return Ok(DiagnosticCode(value));
        }
        let value = table.next_value;
        let next = value.checked_add(1).ok_or(RegistryError::Exhausted {
            count: table.names.len(),
        })?;
        let leaked: &'static str = Box::leak(name.to_owned().into_boxed_str());
        table.names.insert(value, leaked);
        table.by_name.insert(leaked, value);
        table.next_value = next;
        tracing::debug!(code = value, name, "registered diagnostic code");
        Ok(DiagnosticCode(value))
    }

    /// Find a code by its registered name.
    pub fn lookup(name: &str) -> Option<DiagnosticCode> {
        REGISTRY
            .read()
            .by_name
            .get(name)
            .copied()
            .map(DiagnosticCode)
    }

    /// Wrap a raw value without registering it.
    pub const fn from_value(value: u32) -> DiagnosticCode {
        DiagnosticCode(value)
    }

    pub const fn value(self) -> u32 {
        self.0
    }

    /// Display name, or [`UNKNOWN_CODE_NAME`] for unregistered values.
    pub fn name(self) -> &'static str {
        if let Some(&name) = BUILTIN_NAMES.get(self.0 as usize) {
            return name;
        }
        REGISTRY
            .read()
            .names
            .get(&self.0)
            .copied()
            .unwrap_or(UNKNOWN_CODE_NAME)
    }

    /// Fatal codes terminate the process when posted without a delegate.
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            DiagnosticCode::FATAL_CODING_ERROR
                | DiagnosticCode::FATAL_ERROR
                | DiagnosticCode::APPLICATION_EXIT
        )
    }

    pub fn is_coding_error(self) -> bool {
        matches!(
            self,
            DiagnosticCode::CODING_ERROR | DiagnosticCode::FATAL_CODING_ERROR
        )
    }

    pub fn is_builtin(self) -> bool {
        (self.0 as usize) < BUILTIN_NAMES.len()
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Registered user codes.
struct CodeTable {
    names: FxHashMap<u32, &'static str>,
    by_name: FxHashMap<&'static str, u32>,
    next_value: u32,
}

static REGISTRY: LazyLock<RwLock<CodeTable>> = LazyLock::new(|| {
    let mut by_name = FxHashMap::default();
    for (value, name) in (0u32..).zip(BUILTIN_NAMES) {
        by_name.insert(name, value);
    }
    RwLock::new(CodeTable {
        names: FxHashMap::default(),
        by_name,
        next_value: FIRST_USER_VALUE,
    })
});
