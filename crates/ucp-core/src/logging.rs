//! `tracing` subscriber setup.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber with stderr output.
///
/// `RUST_LOG` takes precedence over `level` when set. Calling this more than
/// once is harmless; later calls are no-ops.
pub fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    let _ = subscriber.try_init();
}
