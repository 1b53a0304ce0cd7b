//! Scoped error capture.
//!
//! An [`ErrorMark`] answers "did this block of code post errors?":
//!
//! ```text
//! let mut mark = ErrorMark::new();
//! layer.reload();
//! if !mark.is_clean() {
//!     for err in mark.errors() { ... }
//!     mark.clear();
//! }
//! ```
//!
//! Arming a mark snapshots the manager's serial counter. The mark sees
//! exactly the errors in the calling thread's list whose serial is at or
//! above that snapshot, which is everything the thread posted since. Nested
//! marks need no bookkeeping: an inner mark's range is always a suffix of
//! the outer mark's range.
//!
//! While at least one mark is armed on a thread, errors posted there are
//! not echoed; the mark's owner is expected to handle them. Dropping the
//! last armed mark on a thread with errors still in range echoes them (when
//! no delegate saw them already) before erasing them.

use std::marker::PhantomData;

use crate::{DiagnosticMgr, Error, ErrorPos, ErrorTransport};

/// Captures the errors posted on this thread while it is armed.
///
/// Marks are tied to the thread that created them and cannot be sent to
/// another thread; use [`ErrorTransport`] to move errors instead.
pub struct ErrorMark<'a> {
    mgr: &'a DiagnosticMgr,
    /// Serial threshold while armed.
    mark: Option<u64>,
    _not_send: PhantomData<*const ()>,
}

impl ErrorMark<'static> {
    /// Arm a mark on the process-wide manager.
    pub fn new() -> Self {
        ErrorMark::with_manager(DiagnosticMgr::instance())
    }
}

impl Default for ErrorMark<'static> {
    fn default() -> Self {
        ErrorMark::new()
    }
}

impl<'a> ErrorMark<'a> {
    /// Arm a mark on `mgr`.
    pub fn with_manager(mgr: &'a DiagnosticMgr) -> Self {
        let mut mark = ErrorMark {
            mgr,
            mark: None,
            _not_send: PhantomData,
        };
        mark.set_mark();
        mark
    }

    /// Arm the mark, or move its threshold to now if already armed.
    ///
    /// Errors already in range stay in the thread's list but are no longer
    /// seen by this mark.
    pub fn set_mark(&mut self) {
        if self.mark.is_none() {
            self.mgr.increment_mark_count();
        }
        let threshold = self.mgr.next_serial();
        tracing::trace!(threshold, "error mark set");
        self.mark = Some(threshold);
    }

    pub fn is_armed(&self) -> bool {
        self.mark.is_some()
    }

    /// True if no error in range; always true when unarmed.
    pub fn is_clean(&self) -> bool {
        self.begin().is_end()
    }

    /// First error in range.
    pub fn begin(&self) -> ErrorPos {
        match self.mark {
            Some(threshold) => self.mgr.error_begin_from(threshold),
            None => ErrorPos::END,
        }
    }

    pub fn end(&self) -> ErrorPos {
        ErrorPos::END
    }

    /// Number of errors in range.
    pub fn len(&self) -> usize {
        self.mark
            .map_or(0, |threshold| self.mgr.count_errors_from(threshold))
    }

    pub fn is_empty(&self) -> bool {
        self.is_clean()
    }

    /// Copies of the errors in range, oldest first.
    pub fn errors(&self) -> Vec<Error> {
        if self.mark.is_none() {
            return Vec::new();
        }
        self.mgr.errors_between(self.begin(), self.end())
    }

    /// Erase the errors in range and disarm.
    ///
    /// Returns `true` if any errors were erased. Clearing an unarmed mark
    /// does nothing.
    pub fn clear(&mut self) -> bool {
        if self.mark.is_none() {
            return false;
        }
        let erased = self.mgr.take_errors(self.begin(), self.end());
        self.disarm();
        tracing::trace!(count = erased.len(), "error mark cleared");
        !erased.is_empty()
    }

    /// Move the errors in range onto the end of `transport`.
    ///
    /// The mark stays armed, now clean.
    pub fn transport_to(&mut self, transport: &mut ErrorTransport) {
        if self.mark.is_none() {
            return;
        }
        let errors = self.mgr.take_errors(self.begin(), self.end());
        transport.extend(errors);
    }

    /// Move the errors in range into a new transport.
    pub fn transport(&mut self) -> ErrorTransport {
        let mut transport = ErrorTransport::new();
        self.transport_to(&mut transport);
        transport
    }

    /// Drop the threshold; returns `true` if this was the thread's last mark.
    fn disarm(&mut self) -> bool {
        self.mark = None;
        self.mgr.decrement_mark_count()
    }
}

impl Drop for ErrorMark<'_> {
    fn drop(&mut self) {
        if self.mark.is_none() {
            return;
        }
        let unhandled = self.mgr.take_errors(self.begin(), self.end());
        if self.disarm() && !unhandled.is_empty() {
            self.mgr.report_unhandled(&unhandled);
        }
    }
}
