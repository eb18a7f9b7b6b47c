//! Error types for the remediation ledger.

use thiserror::Error;

/// Ledger errors.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The store could not be read or written (L001).
    #[error("[L001] Ledger unavailable: {0}")]
    PersistenceUnavailable(String),

    /// Compare-and-swap failed: the record changed underneath us (L002).
    #[error("[L002] Conflicting update for {query_id}: expected version {expected:?}, found {found:?}")]
    ConflictingUpdate {
        query_id: String,
        expected: Option<u64>,
        found: Option<u64>,
    },

    /// No record with this id (L003).
    #[error("[L003] No remediation record for query {0}")]
    NotFound(String),

    /// Another run holds the lease (L004).
    #[error("[L004] Run {run_id} already in progress since {started_at}")]
    RunInProgress { run_id: String, started_at: String },

    /// A store call exceeded the adapter timeout (L005).
    #[error("[L005] Ledger {operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: f64,
    },

    /// File store IO failure (L006).
    #[error("[L006] Ledger file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    /// Record (de)serialization failure (L007).
    #[error("[L007] Ledger JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema migration failed (L008).
    #[error("[L008] Ledger migration failed: {0}")]
    MigrationError(String),

    /// DuckDB driver error with preserved source chain (L009).
    #[error("[L009] Ledger DuckDB error")]
    DuckDb(#[source] duckdb::Error),

    /// Lock poisoning or a failed blocking task (L010).
    #[error("[L010] Internal ledger error: {0}")]
    Internal(String),

    /// The record's status does not allow the requested change (L011).
    #[error("[L011] Cannot mark {query_id} {to}: record is {from}")]
    InvalidTransition {
        query_id: String,
        from: String,
        to: &'static str,
    },
}

/// Result type alias for [`LedgerError`].
pub type LedgerResult<T> = Result<T, LedgerError>;

impl From<duckdb::Error> for LedgerError {
    fn from(err: duckdb::Error) -> Self {
        LedgerError::DuckDb(err)
    }
}
