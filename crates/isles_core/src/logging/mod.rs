//! Logging infrastructure for training runs.
//!
//! This module provides:
//! - A per-run logger with optional file + console callback output
//! - Tail buffer of external tool output for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use isles_core::logging::{LogConfig, RunLogger};
//!
//! let logger = RunLogger::new(
//!     "isles_train",
//!     Some(std::path::Path::new("/tmp/out/train.log")),
//!     LogConfig::default(),
//!     None,
//! ).unwrap();
//!
//! logger.phase("Computing brain masks...");
//! logger.command("python3 -m isles.meta --operation compute_brain_masks");
//! logger.success("Computing brain masks... done");
//! ```

mod run_logger;
mod types;

pub use run_logger::{RunLogger, RunLoggerBuilder};
pub use types::{ConsoleCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG` and falls back to `default_level` otherwise.
/// Call once at startup; later calls are ignored.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_to_filter_works() {
        assert_eq!(level_to_filter_str(LogLevel::Debug), "debug");
        assert_eq!(level_to_filter_str(LogLevel::Warn), "warn");
    }

    #[test]
    fn init_tracing_is_idempotent() {
        init_test_tracing();
        init_tracing(LogLevel::Info);
        init_tracing(LogLevel::Debug);
    }
}
