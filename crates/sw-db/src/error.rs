//! Error types for sw-db

use thiserror::Error;

/// Telemetry adapter errors
#[derive(Error, Debug)]
pub enum DbError {
    /// Connection error (D001)
    #[error("[D001] Telemetry connection failed: {0}")]
    ConnectionError(String),

    /// Query execution error (D002)
    #[error("[D002] Telemetry query failed: {0}")]
    ExecutionError(String),

    /// Table not found (D003)
    #[error("[D003] Table not found: {0}")]
    TableNotFound(String),

    /// Snapshot file could not be read or parsed (D004)
    #[error("[D004] Invalid snapshot {path}: {message}")]
    SnapshotError { path: String, message: String },

    /// Mutex poisoned (D005)
    #[error("[D005] Telemetry mutex poisoned: {0}")]
    MutexPoisoned(String),

    /// Blocking task failed to complete (D006)
    #[error("[D006] Internal telemetry error: {0}")]
    Internal(String),
}

impl DbError {
    /// True when the source as a whole is unreachable, as opposed to a
    /// failure scoped to a single table or statement.
    pub fn is_connection_level(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionError(_) | DbError::MutexPoisoned(_) | DbError::Internal(_)
        )
    }
}

/// Result type alias for DbError
pub type DbResult<T> = Result<T, DbError>;

impl From<duckdb::Error> for DbError {
    fn from(err: duckdb::Error) -> Self {
        // duckdb::Error has no structured catalog variants; match the message
        // narrowly so function or type errors are not reported as missing tables.
        let msg = err.to_string();
        if msg.contains("Table with name")
            || msg.contains("Table or view with name")
            || (msg.contains("Catalog Error") && msg.contains("Table") && msg.contains("not found"))
        {
            DbError::TableNotFound(msg)
        } else {
            DbError::ExecutionError(msg)
        }
    }
}
