// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! NOTE: this expects `clap` to be built with the `derive` feature, e.g.:
//! `clap = { version = "4.5.53", features = ["derive"] }` in `Cargo.toml`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `runnerd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "runnerd",
    version,
    about = "Remote command-execution agent for test orchestration.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Runnerd.toml` in the current working directory. A missing
    /// file means built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Runnerd.toml")]
    pub config: String,

    /// Host or address to bind (overrides the config file).
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Service name or port number to listen on (overrides the config file).
    #[arg(long, value_name = "PORT")]
    pub port: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `RUNNERD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, print the resolved settings, then exit
    /// without binding a socket.
    #[arg(long)]
    pub dry_run: bool,
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
