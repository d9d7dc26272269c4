//! Logging initialization
//!
//! Uses `tracing` with `tracing-subscriber`. Logs go to stderr so that
//! `--json` output on stdout stays machine-readable. The `RUST_LOG`
//! environment variable overrides the default filter:
//!
//! ```bash
//! RUST_LOG=vibe_fixture_model=debug vibe-corpus --list-groups
//! ```

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the logging subsystem.
///
/// # Arguments
/// * `verbose` - Raise the default level from `warn` to `info`
pub fn init_logging(verbose: bool) {
    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let default_filter = if verbose {
        "vibe_corpus=info,vibe_fixture_model=info"
    } else {
        "vibe_corpus=warn,vibe_fixture_model=warn"
    };
    let filter_layer = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    // A subscriber may already be installed when embedded in another tool.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}
