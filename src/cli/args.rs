//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    benchmark::BenchmarkArgs, cache::CacheCommands, completions::CompletionsArgs,
    compute::ComputeArgs, init::InitArgs, report::ReportCommands,
};

#[derive(Parser)]
#[command(name = "elca")]
#[command(author, version, about = "Building life cycle assessment")]
#[command(long_about = "Computes the environmental impact of building projects from plain YAML files and keeps the results in an incremental SQLite cache.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Only log errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug details
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Workspace root (default: auto-detect by finding .elca/)
    #[arg(long, short = 'C', global = true)]
    pub root: Option<PathBuf>,
}

impl GlobalOpts {
    /// Log level from the flags, falling back to the configured one
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            configured
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new eLCA workspace
    Init(InitArgs),

    /// Compute projects and update the cache
    Compute(ComputeArgs),

    /// Inspect and maintain the result cache
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Result tables per variant
    #[command(subcommand)]
    Report(ReportCommands),

    /// Rate a variant against a benchmark version
    Benchmark(BenchmarkArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable tables
    #[default]
    Auto,
    /// YAML format
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
}
