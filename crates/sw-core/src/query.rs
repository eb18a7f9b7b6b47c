//! Query identity and per-run execution statistics

use crate::newtype_string::define_id;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use sw_sql::{ColumnRef, TableRef};

define_id! {
    /// Stable identity of a query: SHA-256 hex of its normalized text.
    pub struct QueryId;
}

impl QueryId {
    /// Identity of a statement, computed from its raw text
    pub fn of_sql(sql: &str) -> Self {
        Self(sw_sql::query_fingerprint(&sw_sql::normalize_sql(sql)))
    }
}

/// One row of execution statistics as a telemetry source reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawQueryStats {
    /// Native identifier in the source system (e.g. an Oracle `sql_id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    /// Statement text as captured
    pub sql_text: String,

    /// Parsing schema of the session that ran the statement
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Executions observed this run
    #[serde(default)]
    pub executions: u64,

    /// Cumulative elapsed time, in microseconds
    #[serde(default)]
    pub elapsed_us: u64,
}

/// A flagged query, normalized and annotated for classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRecord {
    pub query_id: QueryId,
    pub sql_text: String,
    pub normalized_text: String,
    pub executions: u64,
    pub elapsed_us: u64,
    pub schema: Option<String>,

    /// Tables after FROM/JOIN, in order of first appearance
    pub tables: Vec<TableRef>,

    /// Columns compared in the WHERE clause, with their owning table when known
    pub predicate_columns: Vec<ColumnRef>,

    /// Native ids of every source row merged into this record
    #[serde(default)]
    pub source_ids: Vec<String>,
}

impl QueryRecord {
    /// Normalize a raw statistics row
    pub fn from_raw(raw: RawQueryStats) -> Self {
        let shape = sw_sql::analyze(&raw.sql_text);
        let schema = raw
            .schema
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());
        Self {
            query_id: QueryId(shape.fingerprint),
            sql_text: raw.sql_text,
            normalized_text: shape.normalized,
            executions: raw.executions,
            elapsed_us: raw.elapsed_us,
            schema,
            tables: shape.tables,
            predicate_columns: shape.predicate_columns,
            source_ids: raw.source_id.into_iter().collect(),
        }
    }

    /// Schema to look a referenced table up in: the parsing schema, or the
    /// table's own qualifier when the query has none.
    pub fn lookup_schema(&self, table: &TableRef) -> Option<String> {
        self.schema.clone().or_else(|| table.schema.clone())
    }

    /// Fold another capture of the same statement into this one
    pub fn merge(&mut self, other: QueryRecord) {
        debug_assert_eq!(self.query_id, other.query_id);
        self.executions = self.executions.saturating_add(other.executions);
        self.elapsed_us = self.elapsed_us.saturating_add(other.elapsed_us);
        if self.schema.is_none() {
            self.schema = other.schema;
        }
        for id in other.source_ids {
            if !self.source_ids.contains(&id) {
                self.source_ids.push(id);
            }
        }
    }

    /// Elapsed time in seconds
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_us as f64 / 1_000_000.0
    }
}

/// Merge records sharing a `query_id`, keeping first-seen order.
///
/// Sources commonly report one row per child cursor; those rows normalize to
/// the same identity and are summed here.
pub fn merge_duplicates(records: Vec<QueryRecord>) -> Vec<QueryRecord> {
    let mut merged: Vec<QueryRecord> = Vec::with_capacity(records.len());
    let mut index: HashMap<QueryId, usize> = HashMap::new();
    for record in records {
        match index.get(&record.query_id) {
            Some(&pos) => merged[pos].merge(record),
            None => {
                index.insert(record.query_id.clone(), merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
