//! Tracing and logging setup shared by the binaries and tests.

/// Tracing configuration (filters, output format).
pub mod tracing;

pub use crate::tracing::{LogFormat, LogSettings, UnknownLogFormat};

/// Initialize process-wide logging from `RUST_LOG` / `LOG_FORMAT`.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init() {
    crate::tracing::init(&LogSettings::from_env());
}
