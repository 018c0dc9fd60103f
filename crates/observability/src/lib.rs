//! Process-wide tracing setup for binaries, tests and benches that use the engine.

/// Initialize process-wide observability (JSON logs, `RUST_LOG` filter,
/// `info` by default).
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init(tracing::LogFormat::Json, "info");
}

/// Compact output captured by the test harness, `warn` unless `RUST_LOG` says otherwise.
pub fn init_for_tests() {
    tracing::init(tracing::LogFormat::Test, "warn");
}

/// Tracing configuration (filters, layers).
pub mod tracing;

pub use tracing::LogFormat;
