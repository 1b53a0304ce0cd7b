//! Diagnostic records.
//!
//! [`DiagnosticBase`] carries everything a diagnostic knows about itself;
//! [`Error`], [`Warning`] and [`Status`] wrap it to keep the three kinds
//! apart in delegate signatures. Only the manager builds records, and it
//! assigns the serial number when the record is posted.

use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::{CallContext, DiagnosticCode};

/// Opaque side-channel payload attached to a diagnostic.
#[derive(Clone)]
pub struct DiagnosticInfo(Arc<dyn Any + Send + Sync>);

impl DiagnosticInfo {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        DiagnosticInfo(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn is<T: Any>(&self) -> bool {
        self.0.is::<T>()
    }
}

impl fmt::Debug for DiagnosticInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DiagnosticInfo(..)")
    }
}

/// Data shared by every kind of diagnostic.
#[derive(Clone, Debug)]
pub struct DiagnosticBase {
    context: CallContext,
    commentary: String,
    code: DiagnosticCode,
    code_string: Cow<'static, str>,
    info: Option<DiagnosticInfo>,
    serial: u64,
    quiet: bool,
}

impl DiagnosticBase {
    pub(crate) fn new(
        code: DiagnosticCode,
        code_string: Cow<'static, str>,
        context: CallContext,
        commentary: String,
        info: Option<DiagnosticInfo>,
        quiet: bool,
    ) -> Self {
        DiagnosticBase {
            context,
            commentary,
            code,
            code_string,
            info,
            serial: 0,
            quiet,
        }
    }

    pub fn context(&self) -> &CallContext {
        &self.context
    }

    pub fn source_file(&self) -> &'static str {
        self.context.file()
    }

    pub fn source_line(&self) -> u32 {
        self.context.line()
    }

    pub fn source_function(&self) -> &'static str {
        self.context.function()
    }

    pub fn commentary(&self) -> &str {
        &self.commentary
    }

    /// Append to the commentary, separated by a newline.
    pub fn augment_commentary(&mut self, text: &str) {
        if !self.commentary.is_empty() {
            self.commentary.push('\n');
        }
        self.commentary.push_str(text);
    }

    pub fn diagnostic_code(&self) -> DiagnosticCode {
        self.code
    }

    /// The code name as given by the poster.
    pub fn diagnostic_code_as_str(&self) -> &str {
        &self.code_string
    }

    pub fn info(&self) -> Option<&DiagnosticInfo> {
        self.info.as_ref()
    }

    /// Typed view of the info payload.
    pub fn info_as<T: Any>(&self) -> Option<&T> {
        self.info.as_ref().and_then(DiagnosticInfo::downcast_ref::<T>)
    }

    /// Global order key, assigned when the diagnostic was posted.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    pub(crate) fn set_serial(&mut self, serial: u64) {
        self.serial = serial;
    }

    /// Quiet diagnostics are never echoed to the terminal.
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_fatal(&self) -> bool {
        self.code.is_fatal()
    }

    pub fn is_coding_error(&self) -> bool {
        self.code.is_coding_error()
    }

    pub fn pretty_print_string(&self) -> &str {
        &self.commentary
    }
}

macro_rules! diagnostic_kind {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        pub struct $name {
            base: DiagnosticBase,
        }

        impl $name {
            pub(crate) fn new(base: DiagnosticBase) -> Self {
                $name { base }
            }

            pub fn base(&self) -> &DiagnosticBase {
                &self.base
            }
        }

        impl Deref for $name {
            type Target = DiagnosticBase;

            fn deref(&self) -> &DiagnosticBase {
                &self.base
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut DiagnosticBase {
                &mut self.base
            }
        }
    };
}

diagnostic_kind!(
    /// A failure. Errors are the only diagnostics kept in thread lists.
    Error
);
diagnostic_kind!(
    /// An advisory message; delivered once, never retained.
    Warning
);
diagnostic_kind!(
    /// An informational message; delivered once, never retained.
    Status
);

#[cfg(test)]
mod tests;
