//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event, with timestamps.
    Json,
    /// Human-readable lines routed through the test harness's capture.
    Test,
}

/// Install the global subscriber. `default_filter` applies when `RUST_LOG`
/// is unset or unparsable.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(format: LogFormat, default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let installed = match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init(),
        LogFormat::Test => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .compact()
            .with_test_writer()
            .try_init(),
    };
    if installed.is_ok() {
        ::tracing::debug!(?format, "tracing initialized");
    }
}
