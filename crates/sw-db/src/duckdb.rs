//! DuckDB telemetry adapter

use crate::error::{DbError, DbResult};
use crate::traits::{QueryStatsSource, TableMetadataSource};
use async_trait::async_trait;
use duckdb::{params, Connection};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};
use sw_core::{QueryRecord, RawQueryStats};

/// DDL for the telemetry tables
pub const TELEMETRY_DDL: &str = include_str!("telemetry.sql");

/// Statements whose plan contains a full table access, or that force one
/// through a FULL hint.
const CANDIDATES_SQL: &str = "
SELECT s.sql_id, s.sql_text, s.parsing_schema, s.executions, s.elapsed_us
FROM sql_stats s
WHERE EXISTS (
        SELECT 1 FROM sql_plan p
        WHERE p.sql_id = s.sql_id
          AND upper(p.operation) = 'TABLE ACCESS'
          AND upper(coalesce(p.options, '')) = 'FULL')
   OR upper(s.sql_text) LIKE '%/*+ FULL(%'
ORDER BY s.elapsed_us DESC, s.sql_id";

const SIZE_SQL: &str = "
SELECT COUNT(*), CAST(SUM(bytes) AS BIGINT)
FROM segments
WHERE upper(segment_name) = upper(?)
  AND upper(segment_type) = 'TABLE'
  AND (CAST(? AS VARCHAR) IS NULL OR upper(owner) = upper(?))";

const INDEX_SQL: &str = "
SELECT DISTINCT upper(column_name)
FROM index_columns
WHERE upper(table_name) = upper(?)
  AND (CAST(? AS VARCHAR) IS NULL OR upper(table_owner) = upper(?))
ORDER BY 1";

/// Reads query statistics and table metadata from a DuckDB database
pub struct DuckDbTelemetry {
    conn: Arc<Mutex<Connection>>,
}

impl DuckDbTelemetry {
    /// Create a new in-memory database with the telemetry tables
    pub fn in_memory() -> DbResult<Self> {
        let conn =
            Connection::open_in_memory().map_err(|e| DbError::ConnectionError(e.to_string()))?;
        conn.execute_batch(TELEMETRY_DDL)?;
        Ok(Self::wrap(conn))
    }

    /// Open an existing telemetry database
    pub fn open(path: &Path) -> DbResult<Self> {
        if !path.exists() {
            return Err(DbError::ConnectionError(format!(
                "telemetry database {} does not exist",
                path.display()
            )));
        }
        let conn = Connection::open(path)
            .map_err(|e| DbError::ConnectionError(format!("{}: {}", path.display(), e)))?;
        Ok(Self::wrap(conn))
    }

    fn wrap(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create any missing telemetry tables
    pub async fn create_schema(&self) -> DbResult<()> {
        self.execute_batch(TELEMETRY_DDL).await
    }

    /// Execute multiple SQL statements (fixtures, imports)
    pub async fn execute_batch(&self, sql: &str) -> DbResult<()> {
        let sql = sql.to_string();
        self.with_conn(move |conn| conn.execute_batch(&sql).map_err(DbError::from))
            .await
    }

    /// Run `f` against the connection on the blocking pool so a caller's
    /// timeout is not held up by a slow query.
    async fn with_conn<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|e| DbError::MutexPoisoned(e.to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| DbError::Internal(e.to_string()))?
    }
}

fn fetch_candidates_sync(conn: &Connection) -> DbResult<Vec<QueryRecord>> {
    let mut stmt = conn.prepare(CANDIDATES_SQL)?;
    let rows = stmt.query_map([], |row| {
        Ok(RawQueryStats {
            source_id: row.get::<_, Option<String>>(0)?,
            sql_text: row.get(1)?,
            schema: row.get(2)?,
            executions: row.get::<_, i64>(3)?.max(0) as u64,
            elapsed_us: row.get::<_, i64>(4)?.max(0) as u64,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(QueryRecord::from_raw(row?));
    }
    Ok(records)
}

fn size_of_sync(conn: &Connection, schema: Option<&str>, table: &str) -> DbResult<Option<u64>> {
    let (count, bytes): (i64, Option<i64>) = conn.query_row(
        SIZE_SQL,
        params![table, schema, schema],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    if count == 0 {
        return Err(DbError::TableNotFound(qualified(schema, table)));
    }
    Ok(bytes.map(|b| b.max(0) as u64))
}

fn known_indexes_sync(
    conn: &Connection,
    schema: Option<&str>,
    table: &str,
) -> DbResult<Option<BTreeSet<String>>> {
    let catalog: i64 = conn.query_row(
        "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'index_columns'",
        [],
        |row| row.get(0),
    )?;
    if catalog == 0 {
        return Ok(None);
    }

    let mut stmt = conn.prepare(INDEX_SQL)?;
    let rows = stmt.query_map(params![table, schema, schema], |row| row.get::<_, String>(0))?;
    let mut columns = BTreeSet::new();
    for column in rows {
        columns.insert(column?);
    }
    Ok(Some(columns))
}

fn qualified(schema: Option<&str>, table: &str) -> String {
    match schema {
        Some(s) => format!("{}.{}", s, table),
        None => table.to_string(),
    }
}

#[async_trait]
impl QueryStatsSource for DuckDbTelemetry {
    async fn fetch_current_fts_candidates(&self) -> DbResult<Vec<QueryRecord>> {
        let records = self.with_conn(fetch_candidates_sync).await?;
        log::debug!("DuckDB telemetry returned {} FTS candidates", records.len());
        Ok(records)
    }

    fn source_type(&self) -> &'static str {
        "duckdb"
    }
}

#[async_trait]
impl TableMetadataSource for DuckDbTelemetry {
    async fn size_of(&self, schema: Option<&str>, table: &str) -> DbResult<Option<u64>> {
        let schema = schema.map(str::to_string);
        let table = table.to_string();
        self.with_conn(move |conn| size_of_sync(conn, schema.as_deref(), &table))
            .await
    }

    async fn known_indexes(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> DbResult<Option<BTreeSet<String>>> {
        let schema = schema.map(str::to_string);
        let table = table.to_string();
        self.with_conn(move |conn| known_indexes_sync(conn, schema.as_deref(), &table))
            .await
    }
}

#[cfg(test)]
#[path = "duckdb_test.rs"]
mod tests;
