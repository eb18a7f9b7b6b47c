//! DuckDB ledger store.
//!
//! Compare-and-swap runs inside a `BEGIN` / `COMMIT` transaction: the stored
//! version is read, checked and replaced before anyone else can touch the row.

use crate::error::{LedgerError, LedgerResult};
use crate::migration::run_migrations;
use crate::store::{check_lease, check_version, PendingWrite, RemediationLedgerStore, RunLease};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sw_core::{QueryId, RemediationRecord, RunStamp};

/// Ledger store backed by a DuckDB database
pub struct DuckDbLedgerStore {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbLedgerStore {
    /// Open (or create) the ledger database at `path` and run pending migrations.
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| LedgerError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|e| {
            LedgerError::PersistenceUnavailable(format!("{e}: {}", path.display()))
        })?;
        Self::from_connection(conn)
    }

    /// In-memory ledger with all migrations applied.
    pub fn open_memory() -> LedgerResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| LedgerError::PersistenceUnavailable(e.to_string()))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> LedgerResult<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn with_conn<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&Connection) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| LedgerError::Internal(e.to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| LedgerError::Internal(e.to_string()))?
    }
}

/// Execute `body` within a transaction, rolling back on error.
fn transaction<F, T>(conn: &Connection, body: F) -> LedgerResult<T>
where
    F: FnOnce(&Connection) -> LedgerResult<T>,
{
    conn.execute_batch("BEGIN TRANSACTION")
        .map_err(|e| LedgerError::PersistenceUnavailable(format!("BEGIN failed: {e}")))?;

    let result = body(conn);
    match &result {
        Ok(_) => {
            if let Err(commit_err) = conn.execute_batch("COMMIT") {
                let _ = conn.execute_batch("ROLLBACK");
                return Err(LedgerError::PersistenceUnavailable(format!(
                    "COMMIT failed: {commit_err}"
                )));
            }
        }
        Err(_) => {
            let _ = conn.execute_batch("ROLLBACK");
        }
    }
    result
}

fn stored_version(conn: &Connection, query_id: &str) -> LedgerResult<Option<u64>> {
    let mut stmt = conn.prepare("SELECT version FROM sw_ledger.remediations WHERE query_id = ?")?;
    let mut rows = stmt.query(params![query_id])?;
    let version = match rows.next()? {
        Some(row) => Some(row.get::<_, i64>(0)? as u64),
        None => None,
    };
    Ok(version)
}

fn put_sync(conn: &Connection, record: &RemediationRecord, expected: Option<u64>) -> LedgerResult<()> {
    transaction(conn, |conn| write_record(conn, record, expected))
}

fn put_all_sync(conn: &Connection, writes: &[PendingWrite]) -> LedgerResult<()> {
    transaction(conn, |conn| {
        for write in writes {
            write_record(conn, &write.record, write.expected_version)?;
        }
        Ok(())
    })
}

/// Check the stored version and write the row. Callers own the transaction.
fn write_record(conn: &Connection, record: &RemediationRecord, expected: Option<u64>) -> LedgerResult<()> {
    let json = serde_json::to_string(record)?;
    let id = record.query_id.as_str();
    let found = stored_version(conn, id)?;
    check_version(&record.query_id, expected, found)?;
    match found {
        None => {
            conn.execute(
                "INSERT INTO sw_ledger.remediations
                    (query_id, version, status, tier, priority, occurrence_count, last_seen, record_json)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    id,
                    record.version as i64,
                    record.status.as_str(),
                    record.tier.as_str(),
                    i32::from(record.priority),
                    record.occurrence_count as i64,
                    record.last_seen.to_rfc3339(),
                    json,
                ],
            )?;
        }
        Some(current) => {
            conn.execute(
                "UPDATE sw_ledger.remediations
                 SET version = ?, status = ?, tier = ?, priority = ?,
                     occurrence_count = ?, last_seen = ?, record_json = ?
                 WHERE query_id = ? AND version = ?",
                params![
                    record.version as i64,
                    record.status.as_str(),
                    record.tier.as_str(),
                    i32::from(record.priority),
                    record.occurrence_count as i64,
                    record.last_seen.to_rfc3339(),
                    json,
                    id,
                    current as i64,
                ],
            )?;
        }
    }
    Ok(())
}

fn get_sync(conn: &Connection, query_id: &str) -> LedgerResult<Option<RemediationRecord>> {
    let mut stmt =
        conn.prepare("SELECT record_json FROM sw_ledger.remediations WHERE query_id = ?")?;
    let mut rows = stmt.query(params![query_id])?;
    let json: Option<String> = match rows.next()? {
        Some(row) => Some(row.get(0)?),
        None => None,
    };
    Ok(json.map(|j| serde_json::from_str(&j)).transpose()?)
}

fn list_sync(conn: &Connection) -> LedgerResult<Vec<RemediationRecord>> {
    let mut stmt =
        conn.prepare("SELECT record_json FROM sw_ledger.remediations ORDER BY query_id")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    let mut records = Vec::new();
    for json in rows {
        records.push(serde_json::from_str(&json?)?);
    }
    Ok(records)
}

fn current_lease(conn: &Connection) -> LedgerResult<Option<RunLease>> {
    let mut stmt = conn.prepare("SELECT run_id, started_at FROM sw_ledger.run_lease LIMIT 1")?;
    let mut rows = stmt.query([])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let run_id: String = row.get(0)?;
    let started_at: String = row.get(1)?;
    let started_at = DateTime::parse_from_rfc3339(&started_at)
        .map_err(|e| LedgerError::Internal(format!("bad lease timestamp '{started_at}': {e}")))?
        .with_timezone(&Utc);
    Ok(Some(RunLease { run_id, started_at }))
}

fn begin_run_sync(
    conn: &Connection,
    run: &RunStamp,
    stale_after: Duration,
) -> LedgerResult<Option<RunLease>> {
    transaction(conn, |conn| {
        let replaced = check_lease(current_lease(conn)?.as_ref(), run, stale_after)?;
        conn.execute("DELETE FROM sw_ledger.run_lease", [])?;
        conn.execute(
            "INSERT INTO sw_ledger.run_lease (run_id, started_at) VALUES (?, ?)",
            params![run.run_id, run.started_at.to_rfc3339()],
        )?;
        Ok(replaced)
    })
}

#[async_trait]
impl RemediationLedgerStore for DuckDbLedgerStore {
    async fn get(&self, query_id: &QueryId) -> LedgerResult<Option<RemediationRecord>> {
        let id = query_id.to_string();
        self.with_conn(move |conn| get_sync(conn, &id)).await
    }

    async fn put(
        &self,
        record: &RemediationRecord,
        expected_version: Option<u64>,
    ) -> LedgerResult<()> {
        let record = record.clone();
        self.with_conn(move |conn| put_sync(conn, &record, expected_version))
            .await
    }

    async fn put_all(&self, writes: &[PendingWrite]) -> LedgerResult<()> {
        let writes = writes.to_vec();
        self.with_conn(move |conn| put_all_sync(conn, &writes)).await
    }

    async fn list(&self) -> LedgerResult<Vec<RemediationRecord>> {
        self.with_conn(list_sync).await
    }

    async fn try_begin_run(
        &self,
        run: &RunStamp,
        stale_after: Duration,
    ) -> LedgerResult<Option<RunLease>> {
        let run = run.clone();
        self.with_conn(move |conn| begin_run_sync(conn, &run, stale_after))
            .await
    }

    async fn end_run(&self, run_id: &str) -> LedgerResult<()> {
        let run_id = run_id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "DELETE FROM sw_ledger.run_lease WHERE run_id = ?",
                params![run_id],
            )?;
            Ok(())
        })
        .await
    }

    fn store_type(&self) -> &'static str {
        "duckdb"
    }
}
