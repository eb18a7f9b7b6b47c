//! Script rendering

use crate::error::ScriptResult;
use minijinja::{context, Environment};
use sw_core::{Remediation, RemediationRecord, TableInfo};

/// Longest identifier every supported engine accepts
const MAX_IDENTIFIER_LEN: usize = 30;

/// Renders remediation scripts from embedded templates
pub struct ScriptRenderer {
    env: Environment<'static>,
}

impl ScriptRenderer {
    /// Create a renderer with the built-in templates
    pub fn new() -> ScriptResult<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template("header.sql", include_str!("templates/header.sql.j2"))?;
        env.add_template("index.sql", include_str!("templates/index.sql.j2"))?;
        env.add_template("refactor.sql", include_str!("templates/refactor.sql.j2"))?;
        env.add_filter("sql_comment", sql_comment);
        env.add_function("index_name", |table: String, columns: Vec<String>| {
            index_name(&table, &columns)
        });
        Ok(Self { env })
    }

    /// Render the script for a record
    pub fn render(&self, record: &RemediationRecord) -> ScriptResult<String> {
        let tables: Vec<String> = record.tables.iter().map(describe_table).collect();
        let header = context! {
            query_id => record.query_id.as_str(),
            tier => record.tier.as_str(),
            priority => record.priority,
            improvement => format!("{:.1}", record.improvement_pct),
            occurrences => record.occurrence_count,
            first_seen => record.first_seen.format("%Y-%m-%d %H:%M UTC").to_string(),
            last_seen => record.last_seen.format("%Y-%m-%d %H:%M UTC").to_string(),
            schema => record.schema.as_deref(),
            degraded => record.degraded,
            tables => tables,
            sample_sql => record.sample_sql.trim(),
        };

        let rendered = match &record.remediation {
            Remediation::CreateIndex { table, columns } => self
                .env
                .get_template("index.sql")?
                .render(context! { table => table, columns => columns, ..header })?,
            Remediation::Refactor => self.env.get_template("refactor.sql")?.render(header)?,
        };
        Ok(rendered)
    }
}

/// Deterministic artifact file name: `{tier}_{kind}_{query_id[..12]}.sql`.
///
/// Re-emitting a record overwrites its previous script; sinks use
/// [`script_file_suffix`] to drop scripts written under an older tier or kind.
pub fn script_file_name(record: &RemediationRecord) -> String {
    format!(
        "{}_{}_{}",
        record.tier,
        record.remediation.kind(),
        script_file_suffix(record)
    )
}

/// Part of the file name shared by every script of a query
pub fn script_file_suffix(record: &RemediationRecord) -> String {
    format!("{}.sql", record.query_id.short(12))
}

/// Index name `idx_<table>_<columns>`, lower-cased, truncated to 30 characters.
pub fn index_name(table: &str, columns: &[String]) -> String {
    let bare = table.rsplit('.').next().unwrap_or(table);
    let mut name = format!("idx_{}", sanitize(bare));
    for column in columns {
        name.push('_');
        name.push_str(&sanitize(column));
    }
    name.truncate(MAX_IDENTIFIER_LEN);
    name.trim_end_matches('_').to_string()
}

fn sanitize(ident: &str) -> String {
    ident
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

fn sql_comment(value: String) -> String {
    value
        .lines()
        .map(|line| format!("--   {}", line.trim_end()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn describe_table(info: &TableInfo) -> String {
    let size = match info.size_bytes {
        Some(bytes) => format_bytes(bytes),
        None => "unknown size".to_string(),
    };
    match &info.ambiguous {
        Some(reason) => format!("{} ({}, {}; {})", info.key, info.tier, size, reason),
        None => format!("{} ({}, {})", info.key, info.tier, size),
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
#[path = "renderer_test.rs"]
mod tests;
