//! Tracing subscriber configuration for the simulation harness.
//!
//! Log levels follow the core's conventions:
//! - ERROR: inadmissible transitions, unrecoverable failures
//! - WARN: protocol rejections, timeouts, quarantine entries
//! - INFO: session lifecycle, verification results, statistics
//! - DEBUG: per-packet acceptance, flash writes, ACK/NACK emission
//! - TRACE: queue activity, raw dispatch decisions

use tracing_subscriber::EnvFilter;

/// Initialize the subscriber with the given default filter.
///
/// `RUST_LOG` overrides `default_level` when set.
pub fn init(default_level: &str, json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Initialize the subscriber for tests.
///
/// Uses `try_init` to avoid panicking if called multiple times.
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
