//! `TracingDelegate` forwards diagnostics as `tracing` events.

#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tf_diagnostic::{
    CallContext, DiagnosticCode, DiagnosticConfig, DiagnosticMgr, TracingDelegate,
};
use tracing_subscriber::fmt::MakeWriter;

const CTX: CallContext = CallContext::new("shader.rs", "compile", 21, "hd::shader::compile");

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().clone()).unwrap()
    }
}

impl io::Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = SharedBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn diagnostics_become_events() {
    let buffer = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();

    let mgr = DiagnosticMgr::new(DiagnosticConfig::capture());
    mgr.add_delegate(Arc::new(TracingDelegate));

    tracing::subscriber::with_default(subscriber, || {
        mgr.post_error(
            DiagnosticCode::RUNTIME_ERROR,
            "RuntimeError",
            CTX,
            "shader failed",
            None,
            false,
        );
        mgr.post_warning(DiagnosticCode::WARNING, "Warning", CTX, "slow path", None, false);
        mgr.post_status(DiagnosticCode::STATUS, "Status", CTX, "compiled", None, false);
        mgr.post_fatal(&CTX, DiagnosticCode::FATAL_ERROR, "gpu lost");
    });

    let logged = buffer.contents();
    let lines: Vec<&str> = logged.lines().collect();
    assert_eq!(lines.len(), 4, "{logged}");
    assert!(lines[0].contains("ERROR") && lines[0].contains("shader failed"));
    assert!(lines[0].contains("code=\"RuntimeError\""));
    assert!(lines[1].contains("WARN") && lines[1].contains("slow path"));
    assert!(lines[2].contains("INFO") && lines[2].contains("compiled"));
    assert!(lines[3].contains("fatal=true") && lines[3].contains("gpu lost"));

    assert_eq!(mgr.echo_output(), "");
}

#[test]
fn init_tracing_is_idempotent() {
    tf_diagnostic::init_tracing();
    tf_diagnostic::init_tracing();
}
