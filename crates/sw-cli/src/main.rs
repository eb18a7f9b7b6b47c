//! scanwatch CLI - recurring full-table-scan detection

use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use cli::Cli;
use commands::common::ExitCode;
use commands::{init, ls, report, resolve, run, watch};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result: Result<()> = match &cli.command {
        cli::Commands::Init(args) => init::execute(args, &cli.global).await,
        cli::Commands::Run(args) => run::execute(args, &cli.global).await,
        cli::Commands::Watch(args) => watch::execute(args, &cli.global).await,
        cli::Commands::Ls(args) => ls::execute(args, &cli.global).await,
        cli::Commands::Resolve(args) => resolve::execute(args, &cli.global).await,
        cli::Commands::Report(args) => report::execute(args, &cli.global).await,
    };

    if let Err(err) = result {
        if let Some(ExitCode(code)) = err.downcast_ref::<ExitCode>() {
            std::process::exit(*code);
        }
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}
