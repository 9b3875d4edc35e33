//! Tracing subscriber setup for the binary
//!
//! `RUST_LOG` wins when set; otherwise the configured filter applies.
//! Logs go to stderr so streamed answers on stdout stay clean.

use tracing_subscriber::EnvFilter;

/// Fallback when both RUST_LOG and the configured filter are unusable
const FALLBACK_FILTER: &str = "info";

/// Filter from RUST_LOG, else `configured`, else `info`
pub fn env_filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Install the global subscriber. Repeated calls are ignored.
pub fn init(configured: &str, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("brdbuddy=debug")
    } else {
        env_filter(configured)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
