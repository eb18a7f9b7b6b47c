//! Run command implementation - one detection cycle

use anyhow::{Context, Result};
use sw_engine::EngineError;

use crate::cli::{GlobalArgs, RunArgs, RunOutput};
use crate::commands::common::{
    build_runner, load_config, report_summary, shutdown_on_ctrl_c, ExitCode, EXIT_RUN_IN_PROGRESS,
};

/// Execute the run command
pub(crate) async fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let runner = build_runner(&config, args.dry_run)?;
    let shutdown = shutdown_on_ctrl_c();

    let summary = match runner.run_cycle(&shutdown).await {
        Ok(summary) => summary,
        Err(err @ EngineError::RunInProgress { .. }) => {
            eprintln!("Skipped: {}", err);
            return Err(ExitCode(EXIT_RUN_IN_PROGRESS).into());
        }
        Err(err) => return Err(err).context("Detection cycle failed"),
    };

    report_summary(&config, &summary, args.output == RunOutput::Json)
}
