// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `musashi`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "musashi",
    version,
    about = "Build, lint and serve the style guide asset pipeline.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run, in order. Defaults to `default` when omitted.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// When omitted, `Musashi.toml` in the current working directory is used
    /// if it exists; otherwise the built-in defaults apply.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Override the port of the live-reload server (`serve` task only).
    #[arg(long, value_name = "PORT")]
    pub port: Option<u16>,

    /// List the registered tasks and exit without running anything.
    #[arg(long)]
    pub list: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MUSASHI_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
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
