//! Tracing initialization for keel binaries and tests.

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber.
///
/// The filter is taken from `RUST_LOG` when set, falling back to `info`.
/// Returns an error if a global subscriber has already been installed.
pub fn init_tracing() -> Result<(), SetGlobalDefaultError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}

/// Initializes tracing for tests, ignoring double-initialization.
///
/// Integration tests may call this from multiple test functions; only the
/// first call installs the subscriber.
pub fn init_test_tracing() {
    let _ = init_tracing();
}
