//! Reconciliation of computed assessments against the durable ledger

use crate::error::{LedgerError, LedgerResult};
use crate::store::{PendingWrite, RemediationLedgerStore, RunLease};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use sw_core::{Assessment, QueryId, RemediationRecord, RemediationStatus, RunStamp};

/// What reconciling an assessment did to its record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// No record existed; created as `NEW`
    Created,
    /// Seen again in a new run; occurrence count incremented
    Recounted,
    /// Was resolved pending verification and showed up again
    Regressed,
    /// Already counted this run; only computed fields were refreshed
    Refreshed,
}

/// Outcome of a reconcile
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub record: RemediationRecord,
    pub transition: Transition,

    /// An artifact should be (re)emitted for this record
    pub needs_artifact: bool,
}

/// Compute the next state of a record. Pure: no IO, no clock.
pub fn apply(
    existing: Option<&RemediationRecord>,
    assessment: Assessment,
    run: &RunStamp,
) -> Reconciled {
    let Some(prev) = existing else {
        return Reconciled {
            record: RemediationRecord::first_detection(assessment, run),
            transition: Transition::Created,
            needs_artifact: true,
        };
    };

    let mut record = prev.clone();
    record.version = prev.version + 1;

    let tier_changed = prev.tier != assessment.tier;
    let fix_changed = prev.remediation != assessment.remediation;
    record.refresh_from(assessment);

    let transition = if prev.last_run_id == run.run_id {
        Transition::Refreshed
    } else {
        record.occurrence_count = prev.occurrence_count.saturating_add(1);
        record.last_seen = run.started_at.max(prev.last_seen);
        record.last_run_id = run.run_id.clone();
        let regressed = prev.status == RemediationStatus::ResolvedPendingVerification;
        record.status = RemediationStatus::Recurring;
        if regressed {
            Transition::Regressed
        } else {
            Transition::Recounted
        }
    };

    let needs_artifact = transition == Transition::Regressed
        || tier_changed
        || fix_changed
        || prev.artifact_pending;
    record.artifact_pending = needs_artifact;

    Reconciled {
        record,
        transition,
        needs_artifact,
    }
}

/// Apply a run's assessments on top of `existing`, producing the outcomes in
/// input order and one write per distinct query.
fn stage(
    existing: &HashMap<QueryId, RemediationRecord>,
    assessments: &[Assessment],
    run: &RunStamp,
) -> (Vec<Reconciled>, Vec<PendingWrite>) {
    let mut outcomes = Vec::with_capacity(assessments.len());
    let mut writes: Vec<PendingWrite> = Vec::with_capacity(assessments.len());
    let mut positions: HashMap<&QueryId, usize> = HashMap::new();

    for assessment in assessments {
        let id = &assessment.query_id;
        match positions.get(id) {
            Some(&pos) => {
                let outcome = apply(Some(&writes[pos].record), assessment.clone(), run);
                writes[pos].record = outcome.record.clone();
                outcomes.push(outcome);
            }
            None => {
                let prev = existing.get(id);
                let outcome = apply(prev, assessment.clone(), run);
                positions.insert(id, writes.len());
                writes.push(PendingWrite {
                    record: outcome.record.clone(),
                    expected_version: prev.map(|r| r.version),
                });
                outcomes.push(outcome);
            }
        }
    }
    (outcomes, writes)
}

/// Versioned, compare-and-swap access to remediation records
pub struct Ledger {
    store: Arc<dyn RemediationLedgerStore>,
    timeout: Duration,
    conflict_retries: u32,
}

impl Ledger {
    pub fn new(store: Arc<dyn RemediationLedgerStore>, timeout: Duration, conflict_retries: u32) -> Self {
        Self {
            store,
            timeout,
            conflict_retries,
        }
    }

    pub fn store_type(&self) -> &'static str {
        self.store.store_type()
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = LedgerResult<T>>,
    ) -> LedgerResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::Timeout {
                operation,
                seconds: self.timeout.as_secs_f64(),
            }),
        }
    }

    pub async fn get(&self, query_id: &QueryId) -> LedgerResult<Option<RemediationRecord>> {
        self.bounded("get", self.store.get(query_id)).await
    }

    pub async fn list(&self) -> LedgerResult<Vec<RemediationRecord>> {
        self.bounded("list", self.store.list()).await
    }

    /// Take the run lease, logging any stale lease that was replaced
    pub async fn begin_run(&self, run: &RunStamp, stale_after: Duration) -> LedgerResult<()> {
        let replaced: Option<RunLease> = self
            .bounded("begin_run", self.store.try_begin_run(run, stale_after))
            .await?;
        if let Some(stale) = replaced {
            log::warn!(
                "Taking over stale run lease held by {} since {}",
                stale.run_id,
                stale.started_at
            );
        }
        Ok(())
    }

    pub async fn end_run(&self, run: &RunStamp) -> LedgerResult<()> {
        self.bounded("end_run", self.store.end_run(&run.run_id)).await
    }

    /// Record a detection. Conflicting writes are retried with a fresh read;
    /// any failure that survives the retries is `PersistenceUnavailable`.
    pub async fn reconcile(
        &self,
        assessment: Assessment,
        run: &RunStamp,
    ) -> LedgerResult<Reconciled> {
        let query_id = assessment.query_id.clone();
        let outcome = self
            .with_cas(&query_id, |existing| {
                Ok(Some(apply(existing, assessment.clone(), run)))
            })
            .await?;
        outcome.ok_or_else(|| LedgerError::Internal(format!("no record produced for {query_id}")))
    }

    /// Record every detection of a run in one atomic commit.
    ///
    /// Either all records are written or none are, so a run that fails here
    /// can be retried without counting anything twice. Conflicts re-read the
    /// ledger and restage the whole batch.
    pub async fn reconcile_all(
        &self,
        assessments: Vec<Assessment>,
        run: &RunStamp,
    ) -> LedgerResult<Vec<Reconciled>> {
        if assessments.is_empty() {
            return Ok(Vec::new());
        }

        for attempt in 0..=self.conflict_retries {
            let existing: HashMap<QueryId, RemediationRecord> = self
                .list()
                .await
                .map_err(unavailable)?
                .into_iter()
                .map(|r| (r.query_id.clone(), r))
                .collect();
            let (outcomes, writes) = stage(&existing, &assessments, run);

            match self.bounded("put_all", self.store.put_all(&writes)).await {
                Ok(()) => return Ok(outcomes),
                Err(LedgerError::ConflictingUpdate { query_id, .. }) => {
                    log::warn!(
                        "Conflicting update on {} while committing run {} (attempt {}/{}), retrying",
                        query_id,
                        run.run_id,
                        attempt + 1,
                        self.conflict_retries + 1
                    );
                }
                Err(e) => return Err(unavailable(e)),
            }
        }
        Err(LedgerError::PersistenceUnavailable(format!(
            "gave up committing run {} after {} conflicting updates",
            run.run_id,
            self.conflict_retries + 1
        )))
    }

    /// External signal that a remediation was applied.
    ///
    /// Accepted from `RECURRING` only; a no-op on an already resolved record.
    pub async fn mark_resolved(&self, query_id: &QueryId) -> LedgerResult<RemediationRecord> {
        let outcome = self
            .with_cas(query_id, |existing| {
                let prev = existing.ok_or_else(|| LedgerError::NotFound(query_id.to_string()))?;
                match prev.status {
                    RemediationStatus::ResolvedPendingVerification => return Ok(None),
                    RemediationStatus::New => {
                        return Err(LedgerError::InvalidTransition {
                            query_id: query_id.to_string(),
                            from: prev.status.to_string(),
                            to: RemediationStatus::ResolvedPendingVerification.as_str(),
                        })
                    }
                    RemediationStatus::Recurring => {}
                }
                let mut record = prev.clone();
                record.status = RemediationStatus::ResolvedPendingVerification;
                record.version = prev.version + 1;
                Ok(Some(Reconciled {
                    record,
                    transition: Transition::Refreshed,
                    needs_artifact: false,
                }))
            })
            .await?;

        match outcome {
            Some(done) => {
                log::info!("Marked {} resolved pending verification", query_id.short(12));
                Ok(done.record)
            }
            None => self
                .get(query_id)
                .await?
                .ok_or_else(|| LedgerError::NotFound(query_id.to_string())),
        }
    }

    /// Clear the pending-artifact flag once the sink accepted the script
    pub async fn mark_emitted(&self, query_id: &QueryId) -> LedgerResult<()> {
        self.with_cas(query_id, |existing| {
            let prev = existing.ok_or_else(|| LedgerError::NotFound(query_id.to_string()))?;
            if !prev.artifact_pending {
                return Ok(None);
            }
            let mut record = prev.clone();
            record.artifact_pending = false;
            record.version = prev.version + 1;
            Ok(Some(Reconciled {
                record,
                transition: Transition::Refreshed,
                needs_artifact: false,
            }))
        })
        .await
        .map(|_| ())
    }

    /// Read, compute, compare-and-swap, retrying on conflict.
    ///
    /// `compute` returns `None` when no write is needed.
    async fn with_cas<F>(&self, query_id: &QueryId, compute: F) -> LedgerResult<Option<Reconciled>>
    where
        F: Fn(Option<&RemediationRecord>) -> LedgerResult<Option<Reconciled>>,
    {
        for attempt in 0..=self.conflict_retries {
            let existing = self.get(query_id).await.map_err(unavailable)?;
            let Some(next) = compute(existing.as_ref())? else {
                return Ok(None);
            };
            let expected = existing.as_ref().map(|r| r.version);

            match self.bounded("put", self.store.put(&next.record, expected)).await {
                Ok(()) => return Ok(Some(next)),
                Err(LedgerError::ConflictingUpdate { .. }) => {
                    log::warn!(
                        "Conflicting update on {} (attempt {}/{}), retrying",
                        query_id.short(12),
                        attempt + 1,
                        self.conflict_retries + 1
                    );
                }
                Err(e) => return Err(unavailable(e)),
            }
        }
        Err(LedgerError::PersistenceUnavailable(format!(
            "gave up on {} after {} conflicting updates",
            query_id,
            self.conflict_retries + 1
        )))
    }
}

fn unavailable(err: LedgerError) -> LedgerError {
    match err {
        e @ (LedgerError::PersistenceUnavailable(_)
        | LedgerError::NotFound(_)
        | LedgerError::InvalidTransition { .. }
        | LedgerError::RunInProgress { .. }) => e,
        other => LedgerError::PersistenceUnavailable(other.to_string()),
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
