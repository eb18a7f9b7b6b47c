//! Resolve command implementation - the "remediation applied" signal

use anyhow::{Context, Result};
use sw_core::{QueryId, RemediationRecord};

use crate::cli::{GlobalArgs, ResolveArgs};
use crate::commands::common::{load_config, open_ledger};

/// Execute the resolve command
pub(crate) async fn execute(args: &ResolveArgs, global: &GlobalArgs) -> Result<()> {
    let config = load_config(global)?;
    let ledger = open_ledger(&config)?;
    let records = ledger.list().await.context("Failed to read the ledger")?;
    let query_id = match_query_id(&records, &args.query_id)?;

    let record = ledger
        .mark_resolved(&query_id)
        .await
        .with_context(|| format!("Failed to resolve {}", query_id))?;
    println!(
        "{} is now {} (seen {} times)",
        record.query_id.short(12),
        record.status,
        record.occurrence_count
    );
    Ok(())
}

/// The single record id equal to, or starting with, `wanted`
pub(crate) fn match_query_id(records: &[RemediationRecord], wanted: &str) -> Result<QueryId> {
    let wanted = wanted.trim().to_lowercase();
    if wanted.is_empty() {
        anyhow::bail!("Query id cannot be empty");
    }
    if let Some(exact) = records.iter().find(|r| r.query_id.as_str() == wanted) {
        return Ok(exact.query_id.clone());
    }

    let matches: Vec<&QueryId> = records
        .iter()
        .map(|r| &r.query_id)
        .filter(|id| id.as_str().starts_with(&wanted))
        .collect();
    match matches.as_slice() {
        [] => anyhow::bail!("No remediation record matches '{}'", wanted),
        [only] => Ok((*only).clone()),
        many => anyhow::bail!(
            "'{}' matches {} records; use a longer prefix",
            wanted,
            many.len()
        ),
    }
}
