//! Broadcast notices for diagnostics.
//!
//! Every delivered diagnostic is also broadcast to the manager's notice
//! listeners, for observers that want to see diagnostics without taking
//! over their reporting the way a delegate does. Listeners run after the
//! delegates, outside every internal lock, and are never re-entered from a
//! diagnostic they themselves trigger.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use smallvec::SmallVec;

use crate::{CallContext, Error, Status, Warning};

/// A diagnostic event, borrowed for the duration of the broadcast.
#[derive(Clone, Copy, Debug)]
pub enum DiagnosticNotice<'a> {
    IssuedError(&'a Error),
    IssuedWarning(&'a Warning),
    IssuedStatus(&'a Status),
    IssuedFatalError {
        context: &'a CallContext,
        msg: &'a str,
    },
}

impl DiagnosticNotice<'_> {
    /// Commentary or message carried by the notice.
    pub fn message(&self) -> &str {
        match self {
            DiagnosticNotice::IssuedError(err) => err.commentary(),
            DiagnosticNotice::IssuedWarning(warning) => warning.commentary(),
            DiagnosticNotice::IssuedStatus(status) => status.commentary(),
            DiagnosticNotice::IssuedFatalError { msg, .. } => *msg,
        }
    }
}

/// Handle returned by [`DiagnosticMgr::listen`](crate::DiagnosticMgr::listen).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ListenerKey(u64);

/// Shared notice callback.
pub type Listener = Arc<dyn Fn(&DiagnosticNotice<'_>) + Send + Sync>;

/// Registered listeners, in registration order.
pub(crate) struct NoticeListeners {
    next_key: AtomicU64,
    listeners: RwLock<Vec<(ListenerKey, Listener)>>,
}

impl NoticeListeners {
    pub(crate) fn new() -> Self {
        NoticeListeners {
            next_key: AtomicU64::new(1),
            listeners: RwLock::new(Vec::new()),
        }
    }

    pub(crate) fn register(&self, listener: Listener) -> ListenerKey {
        let key = ListenerKey(self.next_key.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((key, listener));
        key
    }

    /// Returns `false` if the key was not registered.
    pub(crate) fn revoke(&self, key: ListenerKey) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(k, _)| *k != key);
        listeners.len() != before
    }

    pub(crate) fn send(&self, notice: &DiagnosticNotice<'_>) {
        let snapshot: SmallVec<[Listener; 4]> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &snapshot {
            listener(notice);
        }
    }
}
