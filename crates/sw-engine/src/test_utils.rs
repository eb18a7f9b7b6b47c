//! Shared fixtures for engine unit tests

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use sw_core::{QueryRecord, RawQueryStats};
use sw_db::{DbError, DbResult, Snapshot, SnapshotSource, SnapshotTable, TableMetadataSource};

pub(crate) const MIB: u64 = 1024 * 1024;
pub(crate) const GIB: u64 = 1024 * MIB;

pub(crate) fn query(sql: &str, schema: Option<&str>, executions: u64, elapsed_us: u64) -> QueryRecord {
    QueryRecord::from_raw(RawQueryStats {
        source_id: None,
        sql_text: sql.to_string(),
        schema: schema.map(str::to_string),
        executions,
        elapsed_us,
    })
}

pub(crate) fn table(schema: &str, name: &str, size: Option<u64>, indexes: Option<&[&str]>) -> SnapshotTable {
    SnapshotTable {
        schema: Some(schema.to_string()),
        name: name.to_string(),
        size_bytes: size,
        indexes: indexes.map(|cols| cols.iter().map(|c| c.to_string()).collect()),
    }
}

pub(crate) fn source(tables: Vec<SnapshotTable>) -> SnapshotSource {
    SnapshotSource::new(Snapshot {
        queries: Vec::new(),
        tables,
    })
}

/// Metadata source whose behaviour depends on the table name
pub(crate) struct ScriptedMetadata {
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub delay: Duration,
}

impl ScriptedMetadata {
    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            delay,
        }
    }
}

#[async_trait]
impl TableMetadataSource for ScriptedMetadata {
    async fn size_of(&self, _schema: Option<&str>, table: &str) -> DbResult<Option<u64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = if table == "SLOW" {
            Duration::from_secs(3600)
        } else {
            self.delay
        };
        tokio::time::sleep(delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match table {
            "GONE" => Err(DbError::TableNotFound(table.to_string())),
            "BROKEN" => Err(DbError::ExecutionError("syntax error".to_string())),
            "DOWN" => Err(DbError::ConnectionError("listener refused".to_string())),
            "UNSIZED" => Ok(None),
            _ => Ok(Some(MIB)),
        }
    }

    async fn known_indexes(
        &self,
        _schema: Option<&str>,
        _table: &str,
    ) -> DbResult<Option<BTreeSet<String>>> {
        Ok(None)
    }
}
