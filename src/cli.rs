// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `builddag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "builddag",
    version,
    about = "Compile build scripts and assemble the project dependency graph.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Builddag.toml` in the current working directory. A missing
    /// file means all defaults.
    #[arg(long, value_name = "PATH", default_value = "Builddag.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Discover scripts and print their directives, but compile nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running and rebuild the project graph when a script changes.
    #[arg(long)]
    pub watch: bool,

    /// Abort a single compilation after this many seconds.
    #[arg(long, value_name = "SECS")]
    pub compile_timeout: Option<u64>,

    /// Scripts to process instead of discovering them.
    #[arg(value_name = "SCRIPT")]
    pub scripts: Vec<PathBuf>,
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
