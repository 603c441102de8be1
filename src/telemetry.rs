// src/telemetry.rs

use tracing_subscriber::EnvFilter;

/// Installs the JSON subscriber used by the binary.
///
/// Logs go to stderr; stdout carries the single JSON reply. `RUST_LOG`
/// overrides the default `info` level. Calling this twice is harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
