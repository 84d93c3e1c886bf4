// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `buildc`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildc",
    version,
    about = "Compile job specs into a dependency-ordered, parallel build and run it.",
    long_about = None
)]
pub struct CliArgs {
    /// Build file (TOML or JSON). May be repeated; files are read in order.
    ///
    /// Default: `buildc.toml` and/or `buildc.json` in the current directory.
    #[arg(long, short = 'f', value_name = "PATH")]
    pub file: Vec<String>,

    /// How to decide whether a target needs rebuilding
    /// (mtime, force, ignore). Overrides `[config].check`.
    #[arg(long, short = 'c', value_name = "MODE")]
    pub check: Option<String>,

    /// Maximum number of jobs running at once inside a parallel stage.
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Degrade lifecycle violations to warnings instead of errors.
    #[arg(long)]
    pub permissive: bool,

    /// Compile and print the stage plan, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDC_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build only these targets and their prerequisites.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,
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
