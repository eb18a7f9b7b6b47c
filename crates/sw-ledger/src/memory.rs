//! In-memory ledger store, for tests and dry runs

use crate::error::{LedgerError, LedgerResult};
use crate::store::{check_lease, check_version, PendingWrite, RemediationLedgerStore, RunLease};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use sw_core::{QueryId, RemediationRecord, RunStamp};

#[derive(Default)]
struct State {
    records: HashMap<QueryId, RemediationRecord>,
    lease: Option<RunLease>,
}

/// Ledger store that lives for the lifetime of the process
#[derive(Default)]
pub struct MemoryLedgerStore {
    state: Mutex<State>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with existing records
    pub fn with_records(records: impl IntoIterator<Item = RemediationRecord>) -> Self {
        let state = State {
            records: records
                .into_iter()
                .map(|r| (r.query_id.clone(), r))
                .collect(),
            lease: None,
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> LedgerResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|e| LedgerError::Internal(e.to_string()))
    }
}

#[async_trait]
impl RemediationLedgerStore for MemoryLedgerStore {
    async fn get(&self, query_id: &QueryId) -> LedgerResult<Option<RemediationRecord>> {
        Ok(self.lock()?.records.get(query_id).cloned())
    }

    async fn put(
        &self,
        record: &RemediationRecord,
        expected_version: Option<u64>,
    ) -> LedgerResult<()> {
        let mut state = self.lock()?;
        let found = state.records.get(&record.query_id).map(|r| r.version);
        check_version(&record.query_id, expected_version, found)?;
        state
            .records
            .insert(record.query_id.clone(), record.clone());
        Ok(())
    }

    async fn put_all(&self, writes: &[PendingWrite]) -> LedgerResult<()> {
        let mut state = self.lock()?;
        for write in writes {
            let found = state.records.get(&write.record.query_id).map(|r| r.version);
            check_version(&write.record.query_id, write.expected_version, found)?;
        }
        for write in writes {
            state
                .records
                .insert(write.record.query_id.clone(), write.record.clone());
        }
        Ok(())
    }

    async fn list(&self) -> LedgerResult<Vec<RemediationRecord>> {
        Ok(self.lock()?.records.values().cloned().collect())
    }

    async fn try_begin_run(
        &self,
        run: &RunStamp,
        stale_after: Duration,
    ) -> LedgerResult<Option<RunLease>> {
        let mut state = self.lock()?;
        let replaced = check_lease(state.lease.as_ref(), run, stale_after)?;
        state.lease = Some(RunLease::for_run(run));
        Ok(replaced)
    }

    async fn end_run(&self, run_id: &str) -> LedgerResult<()> {
        let mut state = self.lock()?;
        if state.lease.as_ref().is_some_and(|l| l.run_id == run_id) {
            state.lease = None;
        }
        Ok(())
    }

    fn store_type(&self) -> &'static str {
        "memory"
    }
}
