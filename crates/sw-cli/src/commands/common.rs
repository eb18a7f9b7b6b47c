//! Shared utilities for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sw_core::{Config, LedgerKind, RemediationRecord, SourceKind};
use sw_db::{DuckDbTelemetry, SnapshotSource};
use sw_engine::{shutdown_channel, CycleRunner, RunSummary, Shutdown};
use sw_ledger::{DuckDbLedgerStore, FileLedgerStore, Ledger, RemediationLedgerStore};
use sw_script::{DirectorySink, ReportRenderer, REPORT_FILE};

use crate::cli::GlobalArgs;

/// Written to the target directory after every cycle
pub(crate) const RUN_RESULTS_FILE: &str = "run_results.json";

/// Exit code for a run skipped because another run holds the lease
pub(crate) const EXIT_RUN_IN_PROGRESS: i32 = 2;

/// Error type representing a non-zero process exit code.
///
/// Use `return Err(ExitCode(N).into())` instead of `std::process::exit(N)`
/// so that destructors run before the process ends.
#[derive(Debug)]
pub(crate) struct ExitCode(pub(crate) i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Control flow only; the message was already printed.
        write!(f, "")
    }
}

impl std::error::Error for ExitCode {}

/// Load `--config`, falling back to defaults when the file does not exist
pub(crate) fn load_config(global: &GlobalArgs) -> Result<Config> {
    let path = Path::new(&global.config);
    let config = Config::load_or_default(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    log::debug!("Using configuration '{}'", config.name);
    Ok(config)
}

/// Open the configured ledger store
pub(crate) fn open_store(config: &Config) -> Result<Arc<dyn RemediationLedgerStore>> {
    let path = config.ledger_path();
    let store: Arc<dyn RemediationLedgerStore> = match config.ledger.kind {
        LedgerKind::File => Arc::new(FileLedgerStore::new(&path)),
        LedgerKind::DuckDb => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            Arc::new(
                DuckDbLedgerStore::open(&path)
                    .with_context(|| format!("Failed to open ledger {}", path.display()))?,
            )
        }
    };
    Ok(store)
}

/// Ledger over the configured store, for commands outside a cycle
pub(crate) fn open_ledger(config: &Config) -> Result<Ledger> {
    Ok(Ledger::new(
        open_store(config)?,
        config.engine.adapter_timeout(),
        config.engine.conflict_retries,
    ))
}

/// Wire the configured source, ledger and script directory into a runner
pub(crate) fn build_runner(config: &Config, dry_run: bool) -> Result<CycleRunner> {
    let store = open_store(config)?;
    let source_path = config.source_path();
    let engine = config.engine.clone();
    let runner = match config.source.kind {
        SourceKind::DuckDb => {
            let source = DuckDbTelemetry::open(&source_path).with_context(|| {
                format!("Failed to open telemetry database {}", source_path.display())
            })?;
            CycleRunner::from_source(Arc::new(source), store, engine)?
        }
        SourceKind::Snapshot => {
            let source = SnapshotSource::load(&source_path).with_context(|| {
                format!("Failed to load telemetry snapshot {}", source_path.display())
            })?;
            CycleRunner::from_source(Arc::new(source), store, engine)?
        }
    };
    Ok(runner
        .with_sink(Arc::new(DirectorySink::new(config.scripts_dir())))
        .with_dry_run(dry_run))
}

/// A shutdown signal fired by Ctrl-C
pub(crate) fn shutdown_on_ctrl_c() -> Shutdown {
    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping");
            trigger.trigger();
        }
    });
    shutdown
}

/// Serialize `data` as pretty-printed JSON and write it to `path`.
///
/// Creates any missing parent directories before writing.
pub(crate) fn write_json_results<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create target directory")?;
    }
    let json = serde_json::to_string_pretty(data).context("Failed to serialize results")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Write `run_results.json` and the HTML report, then print the summary
pub(crate) fn report_summary(config: &Config, summary: &RunSummary, json: bool) -> Result<()> {
    let target = config.target_dir();
    write_json_results(&target.join(RUN_RESULTS_FILE), summary)?;
    let report_path = target.join(REPORT_FILE);
    ReportRenderer::new()
        .and_then(|renderer| renderer.write(&summary.report(), &report_path))
        .with_context(|| format!("Failed to write {}", report_path.display()))?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(summary).context("Failed to serialize run summary")?
        );
    } else {
        print_summary(summary);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Run {} ({:.1}s){}",
        summary.run_id,
        summary.duration_secs(),
        if summary.dry_run { " [dry run]" } else { "" }
    );
    if summary.first_run {
        println!("  First run: ledger was empty");
    }
    println!(
        "  {} candidates: {} new, {} recurring ({} regressed), {} resolved",
        summary.candidates, summary.new, summary.recurring, summary.regressed, summary.resolved
    );
    println!(
        "  Tiers: {} T1, {} T2 | {} clean, {} degraded",
        summary.t1, summary.t2, summary.clean, summary.degraded
    );
    if summary.dry_run {
        println!("  {} scripts would be written", summary.to_emit.len());
    } else {
        println!(
            "  {} scripts written, {} failed",
            summary.emitted, summary.emit_failures
        );
    }

    if !summary.to_emit.is_empty() {
        println!();
        print_records(&summary.to_emit);
    }

    if !summary.schema_load.is_empty() {
        println!();
        let rows: Vec<Vec<String>> = summary
            .schema_load
            .iter()
            .map(|load| {
                vec![
                    load.schema.clone(),
                    load.class.to_string(),
                    load.queries.to_string(),
                    load.executions.to_string(),
                    format!("{:.2}", load.elapsed_seconds),
                ]
            })
            .collect();
        print_table(&["SCHEMA", "LOAD", "QUERIES", "EXECUTIONS", "ELAPSED_S"], &rows);
    }
}

/// Print records as a table, in the order given
pub(crate) fn print_records(records: &[RemediationRecord]) {
    let rows: Vec<Vec<String>> = records.iter().map(record_row).collect();
    print_table(
        &["QUERY_ID", "TIER", "PRIORITY", "IMPROVE%", "STATUS", "SEEN", "FIX"],
        &rows,
    );
}

fn record_row(record: &RemediationRecord) -> Vec<String> {
    let fix = match &record.remediation {
        sw_core::Remediation::CreateIndex { table, columns } => {
            format!("index {} ({})", table, columns.join(", "))
        }
        sw_core::Remediation::Refactor => "refactor".to_string(),
    };
    vec![
        record.query_id.short(12).to_string(),
        record.tier.to_string(),
        record.priority.to_string(),
        format!("{:.1}", record.improvement_pct),
        record.status.to_string(),
        record.occurrence_count.to_string(),
        if record.degraded {
            format!("{fix} [degraded]")
        } else {
            fix
        },
    ]
}

/// Most urgent first: priority, then improvement, then id
pub(crate) fn sort_by_urgency(records: &mut [RemediationRecord]) {
    records.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.improvement_pct.total_cmp(&a.improvement_pct))
            .then_with(|| a.query_id.cmp(&b.query_id))
    });
}

/// Calculate column widths for a table given headers and row data.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a left-aligned table with a dashed separator under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);
    let render = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    println!("{}", render(headers.to_vec()));
    let separators: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", render(separators.iter().map(String::as_str).collect()));
    for row in rows {
        println!("{}", render(row.iter().map(String::as_str).collect()));
    }
}

/// Wait for `duration` or until shutdown, whichever comes first.
///
/// Returns false when interrupted.
pub(crate) async fn sleep_or_shutdown(duration: Duration, shutdown: &Shutdown) -> bool {
    tokio::select! {
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
