//! Telemetry source traits

use crate::error::DbResult;
use async_trait::async_trait;
use std::collections::BTreeSet;
use sw_core::QueryRecord;

/// Supplies the queries flagged as full-table-scan candidates this run.
#[async_trait]
pub trait QueryStatsSource: Send + Sync {
    /// Current candidates. An empty `Ok` means no scans were found; an
    /// `Err` is fatal for the run.
    async fn fetch_current_fts_candidates(&self) -> DbResult<Vec<QueryRecord>>;

    /// Source type identifier for logging
    fn source_type(&self) -> &'static str;
}

/// Answers size and index questions about individual tables.
#[async_trait]
pub trait TableMetadataSource: Send + Sync {
    /// Size in bytes. `Ok(None)` means the table exists but its size is
    /// unknown; a missing table is `DbError::TableNotFound`.
    async fn size_of(&self, schema: Option<&str>, table: &str) -> DbResult<Option<u64>>;

    /// Indexed columns, or `Ok(None)` when the source cannot tell.
    async fn known_indexes(
        &self,
        _schema: Option<&str>,
        _table: &str,
    ) -> DbResult<Option<BTreeSet<String>>> {
        Ok(None)
    }
}

/// A source that provides both query statistics and table metadata
pub trait TelemetrySource: QueryStatsSource + TableMetadataSource {}

impl<T: QueryStatsSource + TableMetadataSource> TelemetrySource for T {}
