//! Behavior across threads: serial ordering and error transport.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use tf_diagnostic::{
    CallContext, DiagnosticCode, DiagnosticConfig, DiagnosticMgr, EchoTarget, Error, ErrorMark,
    ErrorTransport,
};

const CTX: CallContext = CallContext::new("worker.rs", "run", 3, "pool::worker::run");

fn silent() -> DiagnosticMgr {
    DiagnosticMgr::new(DiagnosticConfig::default().with_echo(EchoTarget::Silent))
}

fn post(mgr: &DiagnosticMgr, msg: String) {
    mgr.post_error(
        DiagnosticCode::RUNTIME_ERROR,
        "RuntimeError",
        CTX,
        msg,
        None,
        false,
    );
}

fn serials(errors: &[Error]) -> Vec<u64> {
    errors.iter().map(|e| e.serial()).collect()
}

#[test]
fn serials_are_unique_and_ordered_per_thread() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 50;
    let mgr = silent();

    let per_thread: Vec<Vec<u64>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let mgr = &mgr;
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        post(mgr, format!("thread {t} error {i}"));
                    }
                    serials(&mgr.errors())
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut all = HashSet::new();
    for list in &per_thread {
        assert_eq!(list.len(), PER_THREAD);
        assert!(list.windows(2).all(|w| w[0] < w[1]));
        all.extend(list.iter().copied());
    }
    assert_eq!(all.len(), THREADS * PER_THREAD);
    assert_eq!(mgr.error_count(), 0);
}

#[test]
fn transported_errors_get_fresh_serials() {
    let mgr = silent();
    post(&mgr, "receiver's own".to_owned());
    let highest_before = *serials(&mgr.errors()).last().unwrap();

    let (mut transport, sent): (ErrorTransport, Vec<Error>) = std::thread::scope(|scope| {
        scope
            .spawn(|| {
                let mut mark = ErrorMark::with_manager(&mgr);
                post(&mgr, "first".to_owned());
                post(&mgr, "second".to_owned());
                let sent = mark.errors();
                (mark.transport(), sent)
            })
            .join()
            .unwrap()
    });

    let mark = ErrorMark::with_manager(&mgr);
    transport.post_to(&mgr);
    let received = mark.errors();

    assert_eq!(received.len(), sent.len());
    for (got, original) in received.iter().zip(&sent) {
        assert_eq!(got.commentary(), original.commentary());
        assert_eq!(got.diagnostic_code(), original.diagnostic_code());
        assert_eq!(got.context(), original.context());
        assert!(got.serial() > highest_before);
        assert_ne!(got.serial(), original.serial());
    }
    assert!(received[0].serial() < received[1].serial());
    assert_eq!(mgr.error_count(), 3);
}

#[test]
fn global_transport_post() {
    let mut transport = std::thread::spawn(|| {
        let mut mark = ErrorMark::new();
        tf_diagnostic::tf_coding_error!("from worker");
        mark.transport()
    })
    .join()
    .unwrap();

    let mut mark = ErrorMark::new();
    transport.post();
    let errors = mark.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].commentary(), "from worker");
    mark.clear();
}

#[test]
fn marks_are_thread_local() {
    let mgr = silent();
    let mark = ErrorMark::with_manager(&mgr);
    std::thread::scope(|scope| {
        scope.spawn(|| {
            assert!(!mgr.has_active_error_mark());
            post(&mgr, "elsewhere".to_owned());
        });
    });
    assert!(mgr.has_active_error_mark());
    assert!(mark.is_clean());
}
