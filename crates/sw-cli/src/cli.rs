//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand, ValueEnum};

/// scanwatch - find the full table scans that hurt, and script their fixes
#[derive(Parser, Debug)]
#[command(name = "scanwatch")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration file
    #[arg(
        short,
        long,
        global = true,
        env = "SCANWATCH_CONFIG",
        default_value = sw_core::config::CONFIG_FILE_NAME
    )]
    pub config: String,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter scanwatch.yml
    Init(InitArgs),

    /// Run one detection cycle
    Run(RunArgs),

    /// Run detection cycles on the configured schedule until interrupted
    Watch(WatchArgs),

    /// List remediation records, most urgent first
    Ls(LsArgs),

    /// Mark a remediation as applied
    Resolve(ResolveArgs),

    /// Write an HTML report of the ledger's remediation records
    Report(ReportArgs),
}

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Name recorded in the configuration
    #[arg(short, long, default_value = "scanwatch")]
    pub name: String,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Reconcile the ledger but do not write any scripts
    #[arg(long)]
    pub dry_run: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: RunOutput,
}

/// Run output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutput {
    /// Human-readable summary
    Text,
    /// Full run summary as JSON
    Json,
}

/// Arguments for the watch command
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Run a cycle immediately instead of waiting for the first slot
    #[arg(long)]
    pub now: bool,
}

/// Arguments for the ls command
#[derive(Args, Debug)]
pub struct LsArgs {
    /// Only show records in these states (comma-separated)
    #[arg(short, long, value_enum, value_delimiter = ',')]
    pub status: Vec<StatusFilter>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: LsOutput,
}

/// Record states accepted by `ls --status`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    New,
    Recurring,
    Resolved,
}

/// Ls output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LsOutput {
    /// Aligned table
    Table,
    /// JSON array of records
    Json,
}

/// Arguments for the resolve command
#[derive(Args, Debug)]
pub struct ResolveArgs {
    /// Query id, or an unambiguous prefix of one (as shown by `ls`)
    pub query_id: String,
}

/// Arguments for the report command
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Include records already marked resolved
    #[arg(long)]
    pub all: bool,

    /// Report path (defaults to <target_dir>/fts_report.html)
    #[arg(long)]
    pub out: Option<String>,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
