//! Logging setup.
//!
//! Interactive sessions get coloured console output; a service started by init
//! logs plain lines to stderr, which the init script appends to its `.err` log.
use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Whether the process is attached to a terminal.
pub fn is_interactive() -> bool {
    io::stderr().is_terminal()
}

/// Builds the filter: an explicit level wins over `RUST_LOG`, default `info`.
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Installs the global subscriber. Later calls are ignored.
pub fn init_logging(level: Option<&str>, interactive: bool) {
    let filter = env_filter(level);

    let _ = if interactive {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_ansi(false)
            .with_target(false)
            .try_init()
    };
}
