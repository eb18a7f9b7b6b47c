//! Report command implementation - HTML report from the ledger

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::PathBuf;
use sw_core::{Config, RemediationRecord};
use sw_script::{FtsReport, ReportRenderer, REPORT_FILE};

use crate::cli::{GlobalArgs, ReportArgs};
use crate::commands::common::{load_config, open_ledger, sort_by_urgency};

/// Execute the report command
pub(crate) async fn execute(args: &ReportArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let ledger = open_ledger(&config)?;
    let records = ledger.list().await.context("Failed to read the ledger")?;
    let records = select(records, args.all);

    let path = report_path(&config, args.out.as_deref());
    let report = FtsReport {
        generated_at: Utc::now(),
        run_id: None,
        records: &records,
        schemas: Vec::new(),
    };
    ReportRenderer::new()
        .and_then(|renderer| renderer.write(&report, &path))
        .with_context(|| format!("Failed to write {}", path.display()))?;
    println!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Open records, or every record with `all`, most urgent first
pub(crate) fn select(records: Vec<RemediationRecord>, all: bool) -> Vec<RemediationRecord> {
    let mut selected: Vec<RemediationRecord> =
        records.into_iter().filter(|r| all || !r.is_resolved()).collect();
    sort_by_urgency(&mut selected);
    selected
}

/// `--out` as given, else the report file in the target directory
pub(crate) fn report_path(config: &Config, out: Option<&str>) -> PathBuf {
    match out {
        Some(out) => PathBuf::from(out),
        None => config.target_dir().join(REPORT_FILE),
    }
}
