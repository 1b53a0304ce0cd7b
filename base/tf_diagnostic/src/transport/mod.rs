//! Moving errors between threads.
//!
//! Error lists are per-thread, so a worker's errors are invisible to the
//! thread that spawned it. The worker moves them out with
//! [`ErrorMark::transport`](crate::ErrorMark::transport), sends the
//! transport back, and the receiver posts it into its own list:
//!
//! ```text
//! let transport = thread::spawn(|| {
//!     let mut mark = ErrorMark::new();
//!     compose_layer();
//!     mark.transport()
//! }).join()?;
//! transport.post();
//! ```
//!
//! Posted errors get fresh serials from the receiving manager, so they sort
//! after everything already in the receiving thread's list.

use crate::{DiagnosticMgr, Error};

/// A batch of errors detached from any thread's list.
///
/// Not `Clone`: a batch is posted at most once.
///
/// ```compile_fail
/// let transport = tf_diagnostic::ErrorTransport::new();
/// let again = transport.clone();
/// ```
#[derive(Debug, Default)]
pub struct ErrorTransport {
    errors: Vec<Error>,
}

impl ErrorTransport {
    pub fn new() -> Self {
        ErrorTransport::default()
    }

    pub(crate) fn extend(&mut self, errors: Vec<Error>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The carried errors, oldest first.
    pub fn errors(&self) -> &[Error] {
        &self.errors
    }

    pub fn swap(&mut self, other: &mut ErrorTransport) {
        std::mem::swap(&mut self.errors, &mut other.errors);
    }

    /// Append the carried errors to the calling thread's list on the
    /// process-wide manager, leaving this transport empty.
    pub fn post(&mut self) {
        self.post_to(DiagnosticMgr::instance());
    }

    /// Like [`post`](Self::post), for a specific manager.
    ///
    /// The errors are not reported to delegates or echoed again; they were
    /// reported where they were first posted.
    pub fn post_to(&mut self, mgr: &DiagnosticMgr) {
        mgr.splice_errors(std::mem::take(&mut self.errors));
    }
}
