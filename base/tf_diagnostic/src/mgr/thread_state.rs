//! Per-thread error list, mark count, and crash-log text.
//!
//! Each thread owns one `ThreadState` per manager. The list is keyed by
//! serial number, and a thread only ever inserts serials larger than any it
//! inserted before, so key order, insertion order, and crash-log text order
//! all agree.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::thread::LocalKey;

use rustc_hash::FxHashMap;

use crate::echo::format_diagnostic;
use crate::Error;

thread_local! {
    /// Thread state for every manager this thread has touched, by manager id.
    static THREAD_STATES: RefCell<FxHashMap<u64, ThreadState>> =
        RefCell::new(FxHashMap::default());

    /// Set while this thread is delivering a diagnostic to delegates or
    /// listeners.
    static IN_DISPATCH: Cell<bool> = const { Cell::new(false) };

    /// Set while this thread is running a crash-log hook.
    static IN_LOG_HOOK: Cell<bool> = const { Cell::new(false) };
}

/// Run `f` on this thread's state for manager `id`, creating it on first use.
///
/// `f` must not call back into user code.
pub(crate) fn with_state<R>(id: u64, f: impl FnOnce(&mut ThreadState) -> R) -> R {
    THREAD_STATES.with(|states| f(states.borrow_mut().entry(id).or_default()))
}

/// Drop this thread's state for manager `id`, if any.
pub(crate) fn discard_state(id: u64) {
    let removed = THREAD_STATES
        .try_with(|states| states.borrow_mut().remove(&id))
        .ok()
        .flatten();
    drop(removed);
}

/// Holds one of the thread's reentrancy flags until dropped.
pub(crate) struct ReentryGuard(&'static LocalKey<Cell<bool>>);

impl ReentryGuard {
    /// Guard delegate and listener delivery; `None` if already delivering.
    pub(crate) fn dispatch() -> Option<ReentryGuard> {
        ReentryGuard::enter(&IN_DISPATCH)
    }

    /// Guard a crash-log hook call; `None` if already inside the hook.
    pub(crate) fn log_hook() -> Option<ReentryGuard> {
        ReentryGuard::enter(&IN_LOG_HOOK)
    }

    fn enter(flag: &'static LocalKey<Cell<bool>>) -> Option<ReentryGuard> {
        flag.with(|set| {
            if set.get() {
                None
            } else {
                set.set(true);
                Some(ReentryGuard(flag))
            }
        })
    }
}

impl Drop for ReentryGuard {
    fn drop(&mut self) {
        self.0.with(|set| set.set(false));
    }
}

struct Entry {
    error: Error,
    /// Bytes this error contributes to the crash-log text.
    log_len: usize,
}

#[derive(Default)]
pub(crate) struct ThreadState {
    errors: BTreeMap<u64, Entry>,
    mark_count: usize,
    log_text: String,
}

impl ThreadState {
    pub(crate) fn mark_count(&self) -> usize {
        self.mark_count
    }

    pub(crate) fn increment_marks(&mut self) {
        self.mark_count += 1;
    }

    /// Returns `true` when the count reached zero.
    pub(crate) fn decrement_marks(&mut self) -> bool {
        self.mark_count = self.mark_count.saturating_sub(1);
        self.mark_count == 0
    }

    pub(crate) fn push(&mut self, error: Error, crash_log: bool) {
        let log_len = if crash_log {
            let text = log_entry(&error);
            self.log_text.push_str(&text);
            text.len()
        } else {
            0
        };
        self.errors.insert(error.serial(), Entry { error, log_len });
    }

    pub(crate) fn len(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn first_serial_from(&self, serial: u64) -> Option<u64> {
        self.errors.range(serial..).next().map(|(&key, _)| key)
    }

    pub(crate) fn first_serial_after(&self, serial: u64) -> Option<u64> {
        let start = serial.checked_add(1)?;
        self.first_serial_from(start)
    }

    pub(crate) fn last_serial_before(&self, serial: u64) -> Option<u64> {
        self.errors.range(..serial).next_back().map(|(&key, _)| key)
    }

    pub(crate) fn get(&self, serial: u64) -> Option<&Error> {
        self.errors.get(&serial).map(|entry| &entry.error)
    }

    pub(crate) fn get_mut(&mut self, serial: u64) -> Option<&mut Error> {
        self.errors.get_mut(&serial).map(|entry| &mut entry.error)
    }

    pub(crate) fn count_range(&self, first: u64, last: u64) -> usize {
        if first >= last {
            return 0;
        }
        self.errors.range(first..last).count()
    }

    pub(crate) fn clone_range(&self, first: u64, last: u64) -> Vec<Error> {
        if first >= last {
            return Vec::new();
        }
        self.errors
            .range(first..last)
            .map(|(_, entry)| entry.error.clone())
            .collect()
    }

    /// Remove every error with `first <= serial < last`, in serial order.
    pub(crate) fn remove_range(&mut self, first: u64, last: u64, crash_log: bool) -> Vec<Error> {
        if first >= last {
            return Vec::new();
        }
        let mut removed = self.errors.split_off(&first);
        let mut rest = removed.split_off(&last);
        let was_suffix = rest.is_empty();
        self.errors.append(&mut rest);
        if removed.is_empty() {
            return Vec::new();
        }

        if crash_log {
            if was_suffix {
                let trimmed: usize = removed.values().map(|entry| entry.log_len).sum();
                let keep = self.log_text.len().saturating_sub(trimmed);
                self.log_text.truncate(keep);
            } else {
                self.rebuild_log();
            }
        }
        removed.into_values().map(|entry| entry.error).collect()
    }

    pub(crate) fn log_text(&self) -> &str {
        &self.log_text
    }

    pub(crate) fn rebuild_log(&mut self) {
        self.log_text.clear();
        for entry in self.errors.values_mut() {
            let text = log_entry(&entry.error);
            entry.log_len = text.len();
            self.log_text.push_str(&text);
        }
    }
}

fn log_entry(error: &Error) -> String {
    format_diagnostic(
        error.diagnostic_code_as_str(),
        error.context(),
        error.commentary(),
    )
}
