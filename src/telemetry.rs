//! Tracing setup for embedding applications.

use tracing_subscriber::EnvFilter;

/// Initialize a global tracing subscriber with an env-filter.
///
/// Falls back to `info` when `RUST_LOG` is unset. Safe to call more than
/// once; later calls are ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
