// src/logging.rs

//! Stderr logging through `tracing-subscriber`.
//!
//! `--log-level` wins and applies to watchgraph's own events. Without it,
//! `WATCHGRAPH_LOG` is read as a full filter directive, so
//! `WATCHGRAPH_LOG=watchgraph::scheduler=trace,info` works. An unparsable
//! or missing variable falls back to `info`.
//!
//! Compiler and test-runner output is forwarded through the same
//! subscriber, so stdout only ever carries the dry-run listing.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "WATCHGRAPH_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(level) => EnvFilter::new(directive_for(level)),
        None => EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))
}

/// `--log-level debug` turns up watchgraph only; the notify backend stays
/// at `warn` unless asked for `trace`.
fn directive_for(level: LogLevel) -> String {
    let ours = match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    };
    let notify = if matches!(level, LogLevel::Trace) { "trace" } else { "warn" };
    format!("{ours},watchgraph={ours},notify={notify}")
}
