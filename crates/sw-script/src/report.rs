//! HTML full-table-scan report
//!
//! One page per run: records grouped by tier, most urgent first, followed
//! by the schema load table. Record text is HTML-escaped by the template
//! environment.

use crate::error::ScriptResult;
use crate::renderer::describe_table;
use crate::sink::write_atomic;
use chrono::{DateTime, Utc};
use minijinja::{context, Environment};
use serde::Serialize;
use std::path::Path;
use sw_core::{Remediation, RemediationRecord, Tier};

/// Default report file name under the target directory
pub const REPORT_FILE: &str = "fts_report.html";

/// One schema row of the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSchema {
    pub schema: String,
    pub class: String,
    pub queries: usize,
    pub executions: u64,
    pub elapsed_seconds: f64,
}

/// Everything the report shows
#[derive(Debug, Clone)]
pub struct FtsReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub run_id: Option<&'a str>,
    /// Rendered in the order given within each tier
    pub records: &'a [RemediationRecord],
    pub schemas: Vec<ReportSchema>,
}

#[derive(Serialize)]
struct TierGroup {
    tier: &'static str,
    queries: Vec<QueryRow>,
}

#[derive(Serialize)]
struct QueryRow {
    id: String,
    priority: u8,
    improvement: String,
    status: String,
    occurrences: u64,
    fix: String,
    degraded: bool,
    tables: Vec<String>,
    sql: String,
}

#[derive(Serialize)]
struct SchemaRow<'a> {
    schema: &'a str,
    class: &'a str,
    queries: usize,
    executions: u64,
    elapsed: String,
}

/// Renders [`FtsReport`]s with the embedded HTML template
pub struct ReportRenderer {
    env: Environment<'static>,
}

impl ReportRenderer {
    pub fn new() -> ScriptResult<Self> {
        let mut env = Environment::new();
        // The `.html` name turns on HTML auto-escaping.
        env.add_template("report.html", include_str!("templates/report.html.j2"))?;
        Ok(Self { env })
    }

    pub fn render(&self, report: &FtsReport<'_>) -> ScriptResult<String> {
        let groups: Vec<TierGroup> = [Tier::T1, Tier::T2]
            .into_iter()
            .map(|tier| TierGroup {
                tier: tier.as_str(),
                queries: report
                    .records
                    .iter()
                    .filter(|r| r.tier == tier)
                    .map(query_row)
                    .collect(),
            })
            .filter(|group| !group.queries.is_empty())
            .collect();
        let schemas: Vec<SchemaRow<'_>> = report
            .schemas
            .iter()
            .map(|s| SchemaRow {
                schema: &s.schema,
                class: &s.class,
                queries: s.queries,
                executions: s.executions,
                elapsed: format!("{:.2}", s.elapsed_seconds),
            })
            .collect();

        Ok(self.env.get_template("report.html")?.render(context! {
            generated_at => report.generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
            run_id => report.run_id,
            groups => groups,
            schemas => schemas,
        })?)
    }

    /// Render `report` and write it to `path`, creating parent directories
    pub fn write(&self, report: &FtsReport<'_>, path: &Path) -> ScriptResult<()> {
        let html = self.render(report)?;
        write_atomic(path, &html)?;
        log::info!("Wrote report {}", path.display());
        Ok(())
    }
}

fn query_row(record: &RemediationRecord) -> QueryRow {
    QueryRow {
        id: record.query_id.short(12).to_string(),
        priority: record.priority,
        improvement: format!("{:.1}", record.improvement_pct),
        status: record.status.to_string(),
        occurrences: record.occurrence_count,
        fix: describe_fix(&record.remediation),
        degraded: record.degraded,
        tables: record.tables.iter().map(describe_table).collect(),
        sql: record.sample_sql.trim().to_string(),
    }
}

fn describe_fix(remediation: &Remediation) -> String {
    match remediation {
        Remediation::CreateIndex { table, columns } => {
            format!("CREATE INDEX on {} ({})", table, columns.join(", "))
        }
        Remediation::Refactor => "Refactor".to_string(),
    }
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
