//! Remediation records: the durable, per-query outcome of detection

use crate::query::QueryId;
use crate::run::RunStamp;
use crate::table::{TableInfo, Tier};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a remediation record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RemediationStatus {
    /// Detected for the first time
    New,
    /// Detected again in a later run
    Recurring,
    /// An operator reported the fix as applied; awaiting confirmation
    ResolvedPendingVerification,
}

impl RemediationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RemediationStatus::New => "NEW",
            RemediationStatus::Recurring => "RECURRING",
            RemediationStatus::ResolvedPendingVerification => "RESOLVED_PENDING_VERIFICATION",
        }
    }
}

impl fmt::Display for RemediationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RemediationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NEW" => Ok(RemediationStatus::New),
            "RECURRING" => Ok(RemediationStatus::Recurring),
            "RESOLVED_PENDING_VERIFICATION" | "RESOLVED" => {
                Ok(RemediationStatus::ResolvedPendingVerification)
            }
            other => Err(format!("unknown remediation status '{}'", other)),
        }
    }
}

/// Suggested fix for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Remediation {
    /// Index the predicate columns of the dominant table
    CreateIndex { table: String, columns: Vec<String> },
    /// No index would help; the statement itself needs rework
    Refactor,
}

impl Remediation {
    /// Short label used in script file names
    pub fn kind(&self) -> &'static str {
        match self {
            Remediation::CreateIndex { .. } => "index",
            Remediation::Refactor => "refactor",
        }
    }
}

/// Everything the engine computed for a query in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub query_id: QueryId,
    pub tier: Tier,
    pub priority: u8,
    pub improvement_pct: f64,
    pub tables: Vec<TableInfo>,
    pub remediation: Remediation,

    /// True when any table fell back to the conservative default
    pub degraded: bool,

    pub sample_sql: String,
    pub schema: Option<String>,
    pub executions: u64,
    pub elapsed_us: u64,
}

/// Durable per-query record owned by the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationRecord {
    pub query_id: QueryId,
    pub tier: Tier,
    pub priority: u8,
    pub improvement_pct: f64,
    pub tables: Vec<TableInfo>,

    /// Number of runs in which the query was detected
    pub occurrence_count: u64,

    pub status: RemediationStatus,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,

    /// Optimistic-concurrency version, bumped on every write
    pub version: u64,

    /// Run that last counted this record
    pub last_run_id: String,

    pub sample_sql: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub remediation: Remediation,
    #[serde(default)]
    pub degraded: bool,

    /// An artifact is owed and has not yet been accepted by the sink
    #[serde(default)]
    pub artifact_pending: bool,

    #[serde(default)]
    pub executions: u64,
    #[serde(default)]
    pub elapsed_us: u64,
}

impl RemediationRecord {
    /// First detection of a query
    pub fn first_detection(assessment: Assessment, run: &RunStamp) -> Self {
        Self {
            query_id: assessment.query_id,
            tier: assessment.tier,
            priority: assessment.priority,
            improvement_pct: assessment.improvement_pct,
            tables: assessment.tables,
            occurrence_count: 1,
            status: RemediationStatus::New,
            first_seen: run.started_at,
            last_seen: run.started_at,
            version: 1,
            last_run_id: run.run_id.clone(),
            sample_sql: assessment.sample_sql,
            schema: assessment.schema,
            remediation: assessment.remediation,
            degraded: assessment.degraded,
            artifact_pending: true,
            executions: assessment.executions,
            elapsed_us: assessment.elapsed_us,
        }
    }

    /// Overwrite the computed fields with a fresh assessment. Identity,
    /// history and status are left alone.
    pub fn refresh_from(&mut self, assessment: Assessment) {
        self.tier = assessment.tier;
        self.priority = assessment.priority;
        self.improvement_pct = assessment.improvement_pct;
        self.tables = assessment.tables;
        self.sample_sql = assessment.sample_sql;
        self.schema = assessment.schema;
        self.remediation = assessment.remediation;
        self.degraded = assessment.degraded;
        self.executions = assessment.executions;
        self.elapsed_us = assessment.elapsed_us;
    }

    pub fn is_resolved(&self) -> bool {
        self.status == RemediationStatus::ResolvedPendingVerification
    }
}

#[cfg(test)]
#[path = "remediation_test.rs"]
mod tests;
