//! Error types for sw-engine

use sw_db::DbError;
use sw_ledger::LedgerError;
use sw_script::ScriptError;
use thiserror::Error;

/// Run-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Stats or metadata adapter unreachable (R001)
    #[error("[R001] Telemetry source unavailable: {0}")]
    SourceUnavailable(String),

    /// A table without usable metadata (R002). Recovered by treating the
    /// table as T2 of unknown size; surfaced in logs only.
    #[error("[R002] Could not resolve table {table}: {reason}")]
    ResolutionAmbiguous { table: String, reason: String },

    /// Ledger read or write failed (R003)
    #[error("[R003] Ledger unavailable: {0}")]
    PersistenceUnavailable(String),

    /// Script rendering could not be set up (R004)
    #[error("[R004] Script error: {0}")]
    Script(#[from] ScriptError),

    /// Another run holds the ledger lease (R005)
    #[error("[R005] Run {run_id} is already in progress (started {started_at})")]
    RunInProgress { run_id: String, started_at: String },

    /// Shutdown was requested mid-run (R006)
    #[error("[R006] Run cancelled")]
    Cancelled,

    /// A lookup task failed to complete (R007)
    #[error("[R007] Internal engine error: {0}")]
    Internal(String),
}

/// Result type alias for EngineError
pub type EngineResult<T> = Result<T, EngineError>;

impl From<LedgerError> for EngineError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::RunInProgress { run_id, started_at } => {
                EngineError::RunInProgress { run_id, started_at }
            }
            other => EngineError::PersistenceUnavailable(other.to_string()),
        }
    }
}

impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        EngineError::SourceUnavailable(err.to_string())
    }
}
