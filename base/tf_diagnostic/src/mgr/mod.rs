//! The diagnostic manager.
//!
//! [`DiagnosticMgr`] owns the delegate registry, the notice listeners, the
//! global serial counter, and (through thread-local storage) one error list
//! per thread. Every method may be called from any thread at any time.
//!
//! # Delivery
//!
//! | Kind | Delegates registered | No delegates |
//! |---|---|---|
//! | error | appended, then `issue_error` on each | appended, echoed unless quiet or a mark is active |
//! | warning / status | `issue_*` on each | echoed unless quiet |
//! | fatal | `issue_fatal_error` on each, returns | echoed, process terminates |
//!
//! Notice listeners see every delivered diagnostic after the delegates.
//! Delegates and listeners are called on a snapshot taken under the read
//! lock, after the lock is released. A diagnostic posted while the same
//! thread is already inside a delegate or listener is echoed directly and
//! reaches no callback.
//!
//! # Ordering
//!
//! Every posted diagnostic takes the next value of a process-wide atomic
//! counter. Within a thread, serials grow in program order; across threads
//! the serial is the only order there is. Errors moved between threads with
//! an [`ErrorTransport`](crate::ErrorTransport) are renumbered on arrival.

mod thread_state;

use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::echo::{EchoKind, EchoSink};
use crate::errors::InitError;
use crate::notice::{DiagnosticNotice, ListenerKey, NoticeListeners};
use crate::record::DiagnosticBase;
use crate::{
    CallContext, Delegate, DiagnosticCode, DiagnosticConfig, DiagnosticInfo, Error, Status,
    Warning,
};

use thread_state::{discard_state, with_state, ReentryGuard};

/// Receives the calling thread's full pending crash-log text after every
/// change to its error list.
///
/// Diagnostics the hook itself posts update the text but do not call the
/// hook again.
pub type CrashLogHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Source of manager ids, which key the thread-local state.
static NEXT_MGR_ID: AtomicU64 = AtomicU64::new(1);

/// The process-wide manager.
static INSTANCE: OnceLock<DiagnosticMgr> = OnceLock::new();

/// Position in the calling thread's error list.
///
/// Positions are keyed by serial number: erasing other errors never moves
/// a position, and a position whose error was erased behaves like the
/// position of the next remaining error.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct ErrorPos(u64);

impl ErrorPos {
    /// One past the last error.
    pub const END: ErrorPos = ErrorPos(u64::MAX);

    pub fn is_end(self) -> bool {
        self == ErrorPos::END
    }

    /// Serial number of the error at this position; `None` for the end.
    pub fn serial(self) -> Option<u64> {
        (!self.is_end()).then_some(self.0)
    }
}

/// Collects, orders, and dispatches diagnostics.
pub struct DiagnosticMgr {
    id: u64,
    config: DiagnosticConfig,
    delegates: RwLock<Vec<Arc<dyn Delegate>>>,
    listeners: NoticeListeners,
    next_serial: AtomicU64,
    echo: EchoSink,
    crash_log_hook: RwLock<Option<CrashLogHook>>,
}

impl DiagnosticMgr {
    /// Create an independent manager.
    ///
    /// Its thread lists, delegates, and serials are separate from the
    /// process-wide instance.
    pub fn new(config: DiagnosticConfig) -> Self {
        DiagnosticMgr {
            id: NEXT_MGR_ID.fetch_add(1, Ordering::Relaxed),
            echo: EchoSink::new(config.echo, config.color),
            config,
            delegates: RwLock::new(Vec::new()),
            listeners: NoticeListeners::new(),
            next_serial: AtomicU64::new(1),
            crash_log_hook: RwLock::new(None),
        }
    }

    /// Install the process-wide manager with an explicit configuration.
    ///
    /// Fails if the instance already exists, including when an earlier
    /// [`instance`](Self::instance) call created it with the default
    /// configuration.
    pub fn init(config: DiagnosticConfig) -> Result<&'static DiagnosticMgr, InitError> {
        let mut created = false;
        let mgr = INSTANCE.get_or_init(|| {
            created = true;
            DiagnosticMgr::new(config)
        });
        if created {
            Ok(mgr)
        } else {
            Err(InitError::AlreadyInitialized)
        }
    }

    /// The process-wide manager, created with the default configuration on
    /// first use.
    pub fn instance() -> &'static DiagnosticMgr {
        INSTANCE.get_or_init(|| DiagnosticMgr::new(DiagnosticConfig::default()))
    }

    pub fn config(&self) -> &DiagnosticConfig {
        &self.config
    }

    /// Display name of a code.
    pub fn code_name(code: DiagnosticCode) -> &'static str {
        code.name()
    }

    // -- Delegates and listeners --

    pub fn add_delegate(&self, delegate: Arc<dyn Delegate>) {
        let mut delegates = self.delegates.write();
        delegates.push(delegate);
        tracing::debug!(count = delegates.len(), "diagnostic delegate added");
    }

    /// Remove every registration of `delegate`; returns how many there were.
    pub fn remove_delegate(&self, delegate: &Arc<dyn Delegate>) -> usize {
        let mut delegates = self.delegates.write();
        let before = delegates.len();
        delegates.retain(|d| !Arc::ptr_eq(d, delegate));
        let removed = before - delegates.len();
        tracing::debug!(removed, count = delegates.len(), "diagnostic delegate removed");
        removed
    }

    pub fn delegate_count(&self) -> usize {
        self.delegates.read().len()
    }

    /// Register a notice listener.
    pub fn listen(
        &self,
        listener: impl Fn(&DiagnosticNotice<'_>) + Send + Sync + 'static,
    ) -> ListenerKey {
        self.listeners.register(Arc::new(listener))
    }

    pub fn revoke_listener(&self, key: ListenerKey) -> bool {
        self.listeners.revoke(key)
    }

    pub fn set_crash_log_hook(&self, hook: Option<CrashLogHook>) {
        *self.crash_log_hook.write() = hook;
    }

    // -- Posting --

    /// Build an error without posting it, for [`append_error`](Self::append_error).
    pub fn make_error(
        code: DiagnosticCode,
        code_string: impl Into<Cow<'static, str>>,
        context: CallContext,
        commentary: impl Into<String>,
        info: Option<DiagnosticInfo>,
        quiet: bool,
    ) -> Error {
        Error::new(DiagnosticBase::new(
            code,
            code_string.into(),
            context,
            commentary.into(),
            info,
            quiet,
        ))
    }

    /// Post an error from the calling thread.
    pub fn post_error(
        &self,
        code: DiagnosticCode,
        code_string: impl Into<Cow<'static, str>>,
        context: CallContext,
        commentary: impl Into<String>,
        info: Option<DiagnosticInfo>,
        quiet: bool,
    ) {
        let mut err = Self::make_error(code, code_string, context, commentary, info, quiet);
        err.set_serial(self.take_serials(1));
        tracing::trace!(serial = err.serial(), code = %code, "posting error");

        let marked = self.has_active_error_mark();
        if marked || self.config.retain_unmarked_errors {
            self.push_local(err.clone());
        }
        self.report_error(&err, !marked);
    }

    /// Post a warning. Warnings are delivered and then forgotten.
    pub fn post_warning(
        &self,
        code: DiagnosticCode,
        code_string: impl Into<Cow<'static, str>>,
        context: CallContext,
        commentary: impl Into<String>,
        info: Option<DiagnosticInfo>,
        quiet: bool,
    ) {
        let mut warning = Warning::new(DiagnosticBase::new(
            code,
            code_string.into(),
            context,
            commentary.into(),
            info,
            quiet,
        ));
        warning.set_serial(self.take_serials(1));
        self.deliver(
            EchoKind::Warning,
            &warning,
            true,
            |delegate| delegate.issue_warning(&warning),
            &DiagnosticNotice::IssuedWarning(&warning),
        );
    }

    /// Post a status message. Statuses are delivered and then forgotten.
    pub fn post_status(
        &self,
        code: DiagnosticCode,
        code_string: impl Into<Cow<'static, str>>,
        context: CallContext,
        commentary: impl Into<String>,
        info: Option<DiagnosticInfo>,
        quiet: bool,
    ) {
        let mut status = Status::new(DiagnosticBase::new(
            code,
            code_string.into(),
            context,
            commentary.into(),
            info,
            quiet,
        ));
        status.set_serial(self.take_serials(1));
        self.deliver(
            EchoKind::Status,
            &status,
            true,
            |delegate| delegate.issue_status(&status),
            &DiagnosticNotice::IssuedStatus(&status),
        );
    }

    /// Post a fatal error.
    ///
    /// With delegates registered, each receives `issue_fatal_error` and
    /// this returns. Otherwise the message is written to stderr and the
    /// process ends: [`DiagnosticCode::APPLICATION_EXIT`] exits with status
    /// 1, any other code aborts without unwinding.
    pub fn post_fatal(&self, context: &CallContext, code: DiagnosticCode, msg: &str) {
        if let Some(_guard) = ReentryGuard::dispatch() {
            let delegates = self.delegate_snapshot();
            self.listeners
                .send(&DiagnosticNotice::IssuedFatalError { context, msg });
            if !delegates.is_empty() {
                for delegate in &delegates {
                    delegate.issue_fatal_error(context, msg);
                }
                return;
            }
        }
        self.echo.echo_fatal(code.name(), context, msg);
        terminate(code)
    }

    /// Inject an already-built error into the calling thread's list.
    ///
    /// Used by bridges translating foreign exceptions. The error gets a
    /// fresh serial and reaches delegates and listeners, but is never
    /// echoed.
    pub fn append_error(&self, mut err: Error) {
        err.set_serial(self.take_serials(1));
        self.push_local(err.clone());
        self.report_error(&err, false);
    }

    // -- Error list of the calling thread --

    pub fn error_begin(&self) -> ErrorPos {
        self.error_begin_from(0)
    }

    pub fn error_end(&self) -> ErrorPos {
        ErrorPos::END
    }

    pub fn error_at(&self, pos: ErrorPos) -> Option<Error> {
        let serial = pos.serial()?;
        with_state(self.id, |state| state.get(serial).cloned())
    }

    pub fn next_error_pos(&self, pos: ErrorPos) -> ErrorPos {
        let Some(serial) = pos.serial() else {
            return ErrorPos::END;
        };
        with_state(self.id, |state| {
            state
                .first_serial_after(serial)
                .map_or(ErrorPos::END, ErrorPos)
        })
    }

    /// Position before `pos`; `None` at the beginning.
    pub fn prev_error_pos(&self, pos: ErrorPos) -> Option<ErrorPos> {
        with_state(self.id, |state| state.last_serial_before(pos.0).map(ErrorPos))
    }

    /// Copies of the errors in `[first, last)`.
    pub fn errors_between(&self, first: ErrorPos, last: ErrorPos) -> Vec<Error> {
        with_state(self.id, |state| state.clone_range(first.0, last.0))
    }

    /// Copies of every error in the calling thread's list.
    pub fn errors(&self) -> Vec<Error> {
        self.errors_between(ErrorPos(0), ErrorPos::END)
    }

    pub fn error_count(&self) -> usize {
        with_state(self.id, |state| state.len())
    }

    /// Erase one error; returns the position after it.
    pub fn erase_error(&self, pos: ErrorPos) -> ErrorPos {
        let Some(serial) = pos.serial() else {
            return ErrorPos::END;
        };
        self.erase_range(pos, ErrorPos(serial + 1));
        self.next_error_pos(pos)
    }

    /// Erase every error in `[first, last)`; returns `last`.
    pub fn erase_range(&self, first: ErrorPos, last: ErrorPos) -> ErrorPos {
        let removed = self.take_errors(first, last);
        tracing::trace!(count = removed.len(), "erased errors");
        last
    }

    /// Append to the commentary of the error at `pos`.
    pub fn augment_error_commentary(&self, pos: ErrorPos, text: &str) -> bool {
        let Some(serial) = pos.serial() else {
            return false;
        };
        let crash_log = self.config.crash_log;
        let hook = self.log_hook();
        let log = with_state(self.id, |state| {
            let err = state.get_mut(serial)?;
            err.augment_commentary(text);
            if crash_log {
                state.rebuild_log();
            }
            Some(hook.is_some().then(|| state.log_text().to_owned()))
        });
        match log {
            Some(text) => {
                publish_log(hook, text);
                true
            }
            None => false,
        }
    }

    pub fn has_active_error_mark(&self) -> bool {
        with_state(self.id, |state| state.mark_count() > 0)
    }

    /// Crash-log text for the calling thread's pending errors.
    pub fn pending_log_text(&self) -> String {
        with_state(self.id, |state| state.log_text().to_owned())
    }

    /// Echo output captured by a [`EchoTarget::Buffer`](crate::EchoTarget::Buffer) manager.
    pub fn echo_output(&self) -> String {
        self.echo.output()
    }

    pub fn clear_echo_output(&self) {
        self.echo.clear();
    }

    // -- Crate-internal operations for marks and transports --

    /// Serial the next posted diagnostic will get, at least.
    pub(crate) fn next_serial(&self) -> u64 {
        self.next_serial.load(Ordering::SeqCst)
    }

    pub(crate) fn error_begin_from(&self, serial: u64) -> ErrorPos {
        with_state(self.id, |state| {
            state.first_serial_from(serial).map_or(ErrorPos::END, ErrorPos)
        })
    }

    pub(crate) fn count_errors_from(&self, serial: u64) -> usize {
        with_state(self.id, |state| state.count_range(serial, u64::MAX))
    }

    pub(crate) fn increment_mark_count(&self) {
        with_state(self.id, thread_state::ThreadState::increment_marks);
    }

    /// Returns `true` when the calling thread has no marks left.
    pub(crate) fn decrement_mark_count(&self) -> bool {
        with_state(self.id, thread_state::ThreadState::decrement_marks)
    }

    /// Remove `[first, last)` from the calling thread's list.
    pub(crate) fn take_errors(&self, first: ErrorPos, last: ErrorPos) -> Vec<Error> {
        let crash_log = self.config.crash_log;
        let hook = self.log_hook();
        let (removed, log) = with_state(self.id, |state| {
            let removed = state.remove_range(first.0, last.0, crash_log);
            let log = (hook.is_some() && !removed.is_empty())
                .then(|| state.log_text().to_owned());
            (removed, log)
        });
        publish_log(hook, log);
        removed
    }

    /// Move foreign errors into the calling thread's list with fresh,
    /// ascending serials.
    pub(crate) fn splice_errors(&self, errors: Vec<Error>) {
        if errors.is_empty() {
            return;
        }
        let count = errors.len() as u64;
        let first = self.take_serials(count);
        let crash_log = self.config.crash_log;
        let hook = self.log_hook();
        let log = with_state(self.id, |state| {
            for (serial, mut err) in (first..).zip(errors) {
                err.set_serial(serial);
                state.push(err, crash_log);
            }
            hook.is_some().then(|| state.log_text().to_owned())
        });
        tracing::debug!(count, first_serial = first, "spliced transported errors");
        publish_log(hook, log);
    }

    /// Echo errors nobody handled before they are discarded.
    pub(crate) fn report_unhandled(&self, errors: &[Error]) {
        if !self.delegates.read().is_empty() {
            return;
        }
        for err in errors.iter().filter(|err| !err.is_quiet()) {
            self.echo.echo(
                EchoKind::Error,
                err.diagnostic_code_as_str(),
                err.context(),
                err.commentary(),
            );
        }
    }

    // -- Internals --

    /// Reserve `count` consecutive serials; returns the first.
    fn take_serials(&self, count: u64) -> u64 {
        self.next_serial.fetch_add(count, Ordering::SeqCst)
    }

    fn push_local(&self, err: Error) {
        let crash_log = self.config.crash_log;
        let hook = self.log_hook();
        let log = with_state(self.id, |state| {
            state.push(err, crash_log);
            hook.is_some().then(|| state.log_text().to_owned())
        });
        publish_log(hook, log);
    }

    /// The hook to publish to; `None` when the crash log is off or no hook
    /// is set, in which case the text is never copied out.
    fn log_hook(&self) -> Option<CrashLogHook> {
        if !self.config.crash_log {
            return None;
        }
        self.crash_log_hook.read().clone()
    }

    fn delegate_snapshot(&self) -> SmallVec<[Arc<dyn Delegate>; 4]> {
        self.delegates.read().iter().cloned().collect()
    }

    fn report_error(&self, err: &Error, echo: bool) {
        self.deliver(
            EchoKind::Error,
            err,
            echo,
            |delegate| delegate.issue_error(err),
            &DiagnosticNotice::IssuedError(err),
        );
    }

    /// Hand a diagnostic to the delegates (or the echo) and the listeners.
    fn deliver(
        &self,
        kind: EchoKind,
        base: &DiagnosticBase,
        echo: bool,
        issue: impl Fn(&dyn Delegate),
        notice: &DiagnosticNotice<'_>,
    ) {
        let echo = echo && !base.is_quiet();
        let Some(_guard) = ReentryGuard::dispatch() else {
            if echo {
                self.echo_base(kind, base);
            }
            return;
        };

        let delegates = self.delegate_snapshot();
        if delegates.is_empty() {
            if echo {
                self.echo_base(kind, base);
            }
        } else {
            for delegate in &delegates {
                issue(delegate.as_ref());
            }
        }
        self.listeners.send(notice);
    }

    fn echo_base(&self, kind: EchoKind, base: &DiagnosticBase) {
        self.echo.echo(
            kind,
            base.diagnostic_code_as_str(),
            base.context(),
            base.commentary(),
        );
    }
}

impl Drop for DiagnosticMgr {
    fn drop(&mut self) {
        discard_state(self.id);
    }
}

/// Hand the crash-log text to the hook, unless the hook is already running
/// on this thread.
fn publish_log(hook: Option<CrashLogHook>, text: Option<String>) {
    let (Some(hook), Some(text)) = (hook, text) else {
        return;
    };
    if let Some(_guard) = ReentryGuard::log_hook() {
        hook(&text);
    }
}

fn terminate(code: DiagnosticCode) -> ! {
    if code == DiagnosticCode::APPLICATION_EXIT {
        std::process::exit(1);
    }
    std::process::abort()
}
