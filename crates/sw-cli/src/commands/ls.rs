//! Ls command implementation - list ledger records

use anyhow::{Context, Result};
use sw_core::{RemediationRecord, RemediationStatus};

use crate::cli::{GlobalArgs, LsArgs, LsOutput, StatusFilter};
use crate::commands::common::{load_config, open_ledger, print_records, sort_by_urgency};

/// Execute the ls command
pub(crate) async fn execute(args: &LsArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let ledger = open_ledger(&config)?;
    let records = ledger.list().await.context("Failed to read the ledger")?;
    let records = select(records, &args.status);

    match args.output {
        LsOutput::Json => {
            let json = serde_json::to_string_pretty(&records)
                .context("Failed to serialize records")?;
            println!("{}", json);
        }
        LsOutput::Table if records.is_empty() => println!("No remediation records"),
        LsOutput::Table => {
            print_records(&records);
            println!("\n{} records", records.len());
        }
    }
    Ok(())
}

/// Filter by status (empty filter keeps everything) and sort by urgency
pub(crate) fn select(records: Vec<RemediationRecord>, filter: &[StatusFilter]) -> Vec<RemediationRecord> {
    let mut selected: Vec<RemediationRecord> = records
        .into_iter()
        .filter(|r| filter.is_empty() || filter.iter().any(|f| matches_status(*f, r.status)))
        .collect();
    sort_by_urgency(&mut selected);
    selected
}

fn matches_status(filter: StatusFilter, status: RemediationStatus) -> bool {
    matches!(
        (filter, status),
        (StatusFilter::New, RemediationStatus::New)
            | (StatusFilter::Recurring, RemediationStatus::Recurring)
            | (StatusFilter::Resolved, RemediationStatus::ResolvedPendingVerification)
    )
}
