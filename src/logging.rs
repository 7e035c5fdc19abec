//! Logging setup for the command-line tool.
//!
//! Library code only emits `tracing` events; the binary installs a subscriber
//! writing to stderr so stdout stays free for the run summary.

use std::io;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `verbose` selects `debug` for this
/// crate and the default is `info`.
pub fn init(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("ttl_cache={level},warn")));

    // a second init (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
