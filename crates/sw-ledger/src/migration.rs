//! Schema migration runner for the DuckDB ledger store.

use crate::ddl::MIGRATIONS;
use crate::error::{LedgerError, LedgerResult};
use duckdb::Connection;

fn ensure_version_table(conn: &Connection) -> LedgerResult<()> {
    conn.execute_batch(
        "CREATE SCHEMA IF NOT EXISTS sw_ledger;
         CREATE TABLE IF NOT EXISTS sw_ledger.schema_version (
             version    INTEGER NOT NULL,
             applied_at TIMESTAMP NOT NULL DEFAULT now()
         );",
    )
    .map_err(|e| LedgerError::MigrationError(format!("failed to create schema_version: {e}")))
}

fn current_version(conn: &Connection) -> LedgerResult<i32> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM sw_ledger.schema_version",
        [],
        |row| row.get(0),
    )
    .map_err(|e| LedgerError::MigrationError(format!("failed to read schema version: {e}")))
}

/// Apply every migration newer than the recorded schema version.
pub fn run_migrations(conn: &Connection) -> LedgerResult<()> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        log::debug!("Applying ledger migration v{:03}", migration.version);
        conn.execute_batch(migration.sql).map_err(|e| {
            LedgerError::MigrationError(format!("v{:03} failed: {e}", migration.version))
        })?;
        conn.execute(
            "INSERT INTO sw_ledger.schema_version (version) VALUES (?)",
            duckdb::params![migration.version],
        )
        .map_err(|e| {
            LedgerError::MigrationError(format!("failed to record v{:03}: {e}", migration.version))
        })?;
    }
    Ok(())
}
