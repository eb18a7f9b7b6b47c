//! Watch command implementation - scheduled detection cycles

use anyhow::{Context, Result};
use chrono::Utc;
use sw_core::next_run_after;
use sw_core::schedule::until_next_run;
use sw_engine::EngineError;

use crate::cli::{GlobalArgs, WatchArgs};
use crate::commands::common::{
    build_runner, load_config, report_summary, shutdown_on_ctrl_c, sleep_or_shutdown,
};

/// Execute the watch command
pub(crate) async fn execute(args: &WatchArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let anchor = config
        .schedule
        .anchor_time()
        .context("Invalid schedule anchor")?;
    let interval = config.schedule.interval_hours;
    let runner = build_runner(&config, false)?;
    let shutdown = shutdown_on_ctrl_c();

    log::info!(
        "Watching every {}h from {} UTC (Ctrl-C to stop)",
        interval,
        anchor.format("%H:%M")
    );

    let mut run_now = args.now;
    loop {
        if !run_now {
            let now = Utc::now();
            log::info!("Next run at {}", next_run_after(now, interval, anchor).to_rfc3339());
            if !sleep_or_shutdown(until_next_run(now, interval, anchor), &shutdown).await {
                break;
            }
        }
        run_now = false;

        match runner.run_cycle(&shutdown).await {
            Ok(summary) => {
                if let Err(e) = report_summary(&config, &summary, false) {
                    log::warn!("Could not record run results: {:#}", e);
                }
            }
            Err(EngineError::Cancelled) => break,
            // Everything else is retried at the next slot
            Err(e) => log::error!("{}", e),
        }
        if shutdown.is_cancelled() {
            break;
        }
    }

    log::info!("Watch stopped");
    Ok(())
}
