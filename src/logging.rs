//! Diagnostic logging setup for the gitbridge binary.

use crate::error::{GitBridgeError, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Filter directive for a `-v` count. `None` defers to `RUST_LOG`.
pub fn verbosity_directive(verbose: u8) -> Option<&'static str> {
    match verbose {
        0 => None,
        1 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Install a stderr subscriber.
///
/// With no `-v`, `RUST_LOG` decides and defaults to `warn`. Any `-v`
/// overrides `RUST_LOG`. stdout is left to command output.
pub fn init(verbose: u8) -> Result<()> {
    let filter_layer = match verbosity_directive(verbose) {
        Some(directive) => EnvFilter::try_new(directive),
        None => EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("warn")),
    }
    .map_err(|e| GitBridgeError::UserError(format!("invalid log filter: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()
        .map_err(|e| GitBridgeError::UserError(format!("failed to initialize logging: {}", e)))
}
