//! Structured logging setup, grounded on the `tracing_subscriber::FmtSubscriber`
//! pattern used across the `chainflip-backend` binaries: an env-filter
//! driven subscriber installed once at process start, with `RUST_LOG`
//! (default `info`) controlling verbosity.

/// Installs the global tracing subscriber. Call once, at the top of
/// `main`, before anything else logs.
pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .ok();
}
