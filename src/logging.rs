use tracing_subscriber::EnvFilter;

/// Installs the fmt subscriber, filtered by `RUST_LOG` (default `info`).
/// A second call is a no-op.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
