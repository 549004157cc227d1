//! Diagnostic logging setup.
//!
//! The chat TUI owns the terminal, so its diagnostics go to a file named in
//! the config (or nowhere). The relay is a plain server process and logs to
//! stderr. Both honor `RUST_LOG` through an `EnvFilter`.

use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize tracing for the TUI. Without a log file, diagnostics are
/// discarded rather than corrupting the alternate screen.
pub fn init_for_tui(log_file: Option<&Path>) -> Result<(), std::io::Error> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Initialize tracing for the relay server, writing to stderr.
pub fn init_for_server() {
    tracing_subscriber::fmt()
        .with_env_filter(default_filter())
        .with_writer(std::io::stderr)
        .init();
}
