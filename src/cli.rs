// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `watchgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "watchgraph",
    version,
    about = "Run grouped compile, test and clean commands, and re-run them on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Watchgraph.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Watchgraph.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `WATCHGRAPH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse and validate, print every composite command with its members,
    /// but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Composite or concrete task name to run, e.g. `babel`,
    /// `babel:nrser`, `watch:babel:nrser:src`.
    ///
    /// Without one, every non-watch task runs once.
    #[arg(value_name = "COMMAND")]
    pub command: Option<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_command_and_flags() {
        let args = CliArgs::parse_from(["watchgraph", "--dry-run", "--config", "a.toml", "mocha:unit"]);
        assert!(args.dry_run);
        assert_eq!(args.config, "a.toml");
        assert_eq!(args.command.as_deref(), Some("mocha:unit"));

        let defaults = CliArgs::parse_from(["watchgraph"]);
        assert!(defaults.command.is_none());
        assert!(defaults.log_level.is_none());
    }
}
