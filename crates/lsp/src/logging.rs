//! Structured logging setup, shared by every binary that embeds this crate.
//!
//! Mirrors the logging bootstrap style used elsewhere in this ecosystem:
//! a `tracing_subscriber` registry writing to stderr, with verbosity taken
//! from an explicit override, then `RUST_LOG`, then a fixed default.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global `tracing` subscriber. Safe to call more than once
/// per process (a second call is a no-op) since embedding applications may
/// each try to install their own.
pub fn init_logging(log_level: Option<&str>) -> Result<(), String> {
    let env_filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let result = tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init();

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            let message = err.to_string();
            if message.contains("already been set") {
                Ok(())
            } else {
                Err(message)
            }
        }
    }
}
