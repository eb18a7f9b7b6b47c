//! Per-schema workload classification

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use sw_core::QueryRecord;

const LOW_EXECUTIONS: u64 = 10;
const REGULAR_EXECUTIONS: u64 = 100;
const LOW_SECONDS: f64 = 1.0;
const REGULAR_SECONDS: f64 = 60.0;

/// Schema for candidates with neither a parsing schema nor a qualifier
pub const UNKNOWN_SCHEMA: &str = "(unknown)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WorkloadClass {
    Low,
    Regular,
    Heavy,
}

impl WorkloadClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadClass::Low => "LOW",
            WorkloadClass::Regular => "REGULAR",
            WorkloadClass::Heavy => "HEAVY",
        }
    }

    fn of(executions: u64, seconds: f64) -> Self {
        if executions < LOW_EXECUTIONS || seconds < LOW_SECONDS {
            WorkloadClass::Low
        } else if executions < REGULAR_EXECUTIONS || seconds < REGULAR_SECONDS {
            WorkloadClass::Regular
        } else {
            WorkloadClass::Heavy
        }
    }
}

impl fmt::Display for WorkloadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full-scan load attributed to one schema this run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaLoad {
    pub schema: String,
    pub queries: usize,
    pub executions: u64,
    pub elapsed_seconds: f64,
    pub class: WorkloadClass,
}

/// Group candidates by schema and classify each group, sorted by schema.
///
/// A query counts toward its parsing schema, or toward every distinct
/// qualifier of its tables when it has none.
pub fn classify_schemas(queries: &[QueryRecord]) -> Vec<SchemaLoad> {
    let mut totals: BTreeMap<String, (usize, u64, u64)> = BTreeMap::new();
    for query in queries {
        for schema in schemas_of(query) {
            let entry = totals.entry(schema).or_default();
            entry.0 += 1;
            entry.1 = entry.1.saturating_add(query.executions);
            entry.2 = entry.2.saturating_add(query.elapsed_us);
        }
    }

    totals
        .into_iter()
        .map(|(schema, (count, executions, elapsed_us))| {
            let elapsed_seconds = elapsed_us as f64 / 1_000_000.0;
            SchemaLoad {
                schema,
                queries: count,
                executions,
                elapsed_seconds,
                class: WorkloadClass::of(executions, elapsed_seconds),
            }
        })
        .collect()
}

fn schemas_of(query: &QueryRecord) -> Vec<String> {
    if let Some(schema) = &query.schema {
        return vec![schema.clone()];
    }
    let mut schemas: Vec<String> = query.tables.iter().filter_map(|t| t.schema.clone()).collect();
    schemas.sort();
    schemas.dedup();
    if schemas.is_empty() {
        schemas.push(UNKNOWN_SCHEMA.to_string());
    }
    schemas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::query;

    #[test]
    fn test_thresholds() {
        assert_eq!(WorkloadClass::of(5, 500.0), WorkloadClass::Low);
        assert_eq!(WorkloadClass::of(5_000, 0.5), WorkloadClass::Low);
        assert_eq!(WorkloadClass::of(50, 500.0), WorkloadClass::Regular);
        assert_eq!(WorkloadClass::of(5_000, 30.0), WorkloadClass::Regular);
        assert_eq!(WorkloadClass::of(100, 60.0), WorkloadClass::Heavy);
    }

    #[test]
    fn test_groups_by_schema() {
        let queries = vec![
            query("SELECT * FROM orders", Some("APP"), 80, 40_000_000),
            query("SELECT * FROM items", Some("APP"), 70, 30_000_000),
            query("SELECT * FROM hr.staff", None, 3, 10),
            query("SELECT 1 FROM dual", None, 1, 1),
        ];
        let loads = classify_schemas(&queries);
        let names: Vec<&str> = loads.iter().map(|l| l.schema.as_str()).collect();
        assert_eq!(names, vec!["(unknown)", "APP", "HR"]);

        let app = &loads[1];
        assert_eq!(app.queries, 2);
        assert_eq!(app.executions, 150);
        assert_eq!(app.elapsed_seconds, 70.0);
        assert_eq!(app.class, WorkloadClass::Heavy);
        assert_eq!(loads[2].class, WorkloadClass::Low);
    }
}
