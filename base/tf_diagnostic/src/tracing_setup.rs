//! Subscriber setup for the crate's own `tracing` events.

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a global `tracing` subscriber, once, if `RUST_LOG` is set.
///
/// Hosts that install their own subscriber should not call this. Combined
/// with [`TracingDelegate`](crate::TracingDelegate), it routes diagnostics
/// through the same filtered output as the manager's internal events.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            // Another subscriber may already be installed; keep it.
            let _ = tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .try_init();
        }
    });
}
