//! Ledger store trait and the run lease shared by every store

use crate::error::{LedgerError, LedgerResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use sw_core::{QueryId, RemediationRecord, RunStamp};

/// Marker that a run is in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLease {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
}

impl RunLease {
    pub fn for_run(run: &RunStamp) -> Self {
        Self {
            run_id: run.run_id.clone(),
            started_at: run.started_at,
        }
    }

    /// True once the lease is at least `stale_after` old as of `now`
    pub fn is_stale(&self, now: DateTime<Utc>, stale_after: Duration) -> bool {
        match chrono::Duration::from_std(stale_after) {
            Ok(window) => now - self.started_at >= window,
            Err(_) => false,
        }
    }
}

/// Decide whether `run` may take the lease given the `current` holder.
///
/// Returns the stale lease being taken over, if any.
pub(crate) fn check_lease(
    current: Option<&RunLease>,
    run: &RunStamp,
    stale_after: Duration,
) -> LedgerResult<Option<RunLease>> {
    match current {
        None => Ok(None),
        Some(lease) if lease.run_id == run.run_id => Ok(None),
        Some(lease) if lease.is_stale(run.started_at, stale_after) => Ok(Some(lease.clone())),
        Some(lease) => Err(LedgerError::RunInProgress {
            run_id: lease.run_id.clone(),
            started_at: lease.started_at.to_rfc3339(),
        }),
    }
}

/// One record of a batch commit and the version it expects to replace
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub record: RemediationRecord,

    /// `None` when the record must not exist yet
    pub expected_version: Option<u64>,
}

/// Check a compare-and-swap precondition against the stored version.
pub(crate) fn check_version(
    query_id: &QueryId,
    expected: Option<u64>,
    found: Option<u64>,
) -> LedgerResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(LedgerError::ConflictingUpdate {
            query_id: query_id.to_string(),
            expected,
            found,
        })
    }
}

/// Durable storage for remediation records.
///
/// Implementations must make `put` atomic: the write succeeds only if the
/// stored version still equals `expected_version` (`None` = no record yet).
#[async_trait]
pub trait RemediationLedgerStore: Send + Sync {
    /// Fetch a record by id
    async fn get(&self, query_id: &QueryId) -> LedgerResult<Option<RemediationRecord>>;

    /// Write `record` if the stored version matches `expected_version`,
    /// otherwise fail with `ConflictingUpdate`.
    async fn put(
        &self,
        record: &RemediationRecord,
        expected_version: Option<u64>,
    ) -> LedgerResult<()>;

    /// Write a batch of records atomically. Every write's version check is
    /// made before anything is stored; one failed check stores nothing.
    /// Record ids within a batch must be distinct.
    async fn put_all(&self, writes: &[PendingWrite]) -> LedgerResult<()>;

    /// Every record, in no particular order
    async fn list(&self) -> LedgerResult<Vec<RemediationRecord>>;

    /// Take the ledger-wide run lease. Fails with `RunInProgress` while a
    /// fresh lease is held by another run; returns the stale lease that was
    /// replaced, if any.
    async fn try_begin_run(
        &self,
        run: &RunStamp,
        stale_after: Duration,
    ) -> LedgerResult<Option<RunLease>>;

    /// Release the lease if `run_id` holds it
    async fn end_run(&self, run_id: &str) -> LedgerResult<()>;

    /// Store type identifier for logging
    fn store_type(&self) -> &'static str;
}
