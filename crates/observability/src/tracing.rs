//! Tracing/logging initialization.
//!
//! One subscriber per process, configured via `RUST_LOG`. JSON output for
//! deployments, plain text for local runs and tests.

use tracing_subscriber::EnvFilter;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    /// Human-readable lines, for terminals and test output.
    Text,
}

/// Initialize tracing with the default (JSON) format.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    init_with_format(LogFormat::default());
}

/// Initialize tracing with an explicit output format.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init_with_format(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let result = match format {
        LogFormat::Json => builder.json().with_target(false).try_init(),
        LogFormat::Text => builder.try_init(),
    };
    let _ = result;
}
