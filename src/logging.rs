//! Diagnostic logging to stderr
//!
//! stdout carries only the command report, so every log line goes to stderr.

use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// Initialize tracing. `RUST_LOG` wins over `verbose`.
pub fn init_logging(verbose: bool) {
    let default = if verbose {
        "hugo_archive=debug"
    } else {
        "hugo_archive=info"
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // a second init (e.g. from tests) is harmless
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
