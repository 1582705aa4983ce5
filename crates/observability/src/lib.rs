//! Shared tracing/logging setup for depot binaries and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use tracing::{LogFormat, init, init_with_format};
