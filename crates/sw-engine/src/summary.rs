//! Per-run outcome reporting

use crate::workload::SchemaLoad;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sw_core::{RemediationRecord, RemediationStatus, RunStamp, Tier};
use sw_ledger::{Reconciled, Transition};
use sw_script::{FtsReport, ReportSchema};

/// What one cycle did
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// The ledger held no records when the run started
    pub first_run: bool,
    pub dry_run: bool,

    /// Distinct candidates after merging duplicate rows
    pub candidates: usize,

    pub new: usize,
    pub recurring: usize,

    /// Subset of `recurring` that had been marked resolved
    pub regressed: usize,

    /// Records in the resolved state when the run finished
    pub resolved: usize,

    pub clean: usize,
    pub degraded: usize,
    pub t1: usize,
    pub t2: usize,

    pub emitted: usize,
    pub emit_failures: usize,

    /// Records that required an artifact this run, in priority order
    pub to_emit: Vec<RemediationRecord>,

    pub schema_load: Vec<SchemaLoad>,
}

impl RunSummary {
    pub(crate) fn start(run: &RunStamp, first_run: bool, dry_run: bool) -> Self {
        Self {
            run_id: run.run_id.clone(),
            started_at: run.started_at,
            finished_at: run.started_at,
            first_run,
            dry_run,
            candidates: 0,
            new: 0,
            recurring: 0,
            regressed: 0,
            resolved: 0,
            clean: 0,
            degraded: 0,
            t1: 0,
            t2: 0,
            emitted: 0,
            emit_failures: 0,
            to_emit: Vec::new(),
            schema_load: Vec::new(),
        }
    }

    /// Count one reconcile outcome
    pub(crate) fn record(&mut self, outcome: &Reconciled) {
        let record = &outcome.record;
        match outcome.transition {
            Transition::Created => self.new += 1,
            Transition::Recounted => self.recurring += 1,
            Transition::Regressed => {
                self.recurring += 1;
                self.regressed += 1;
            }
            Transition::Refreshed if record.status == RemediationStatus::New => self.new += 1,
            Transition::Refreshed => self.recurring += 1,
        }
        match record.tier {
            Tier::T1 => self.t1 += 1,
            Tier::T2 => self.t2 += 1,
        }
        if record.degraded {
            self.degraded += 1;
        } else {
            self.clean += 1;
        }
        if outcome.needs_artifact {
            self.to_emit.push(record.clone());
        }
    }

    /// Order owed artifacts by priority, then improvement
    pub(crate) fn prioritize(&mut self) {
        self.to_emit.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.improvement_pct.total_cmp(&a.improvement_pct))
                .then_with(|| a.query_id.cmp(&b.query_id))
        });
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Utc::now();
    }

    /// Records reconciled this run
    pub fn processed(&self) -> usize {
        self.new + self.recurring
    }

    /// HTML report view of this run: the records owed an artifact and the schema load
    pub fn report(&self) -> FtsReport<'_> {
        FtsReport {
            generated_at: self.finished_at,
            run_id: Some(&self.run_id),
            records: &self.to_emit,
            schemas: self
                .schema_load
                .iter()
                .map(|load| ReportSchema {
                    schema: load.schema.clone(),
                    class: load.class.to_string(),
                    queries: load.queries,
                    executions: load.executions,
                    elapsed_seconds: load.elapsed_seconds,
                })
                .collect(),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.finished_at - self.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}
