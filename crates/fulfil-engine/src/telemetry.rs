//! Tracing setup for binaries.

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber.
///
/// `RUST_LOG` wins when set; otherwise `default_filter` (for example the
/// configured `FULFIL_LOG_LEVEL`) applies. Calling this twice is harmless:
/// the second call leaves the first subscriber in place.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
