//! Static telemetry snapshot loaded from a YAML or JSON file
//!
//! Useful for offline analysis of an exported capture, and as a fixture
//! source in tests.

use crate::error::{DbError, DbResult};
use crate::traits::{QueryStatsSource, TableMetadataSource};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use sw_core::{QueryRecord, RawQueryStats};

/// On-disk snapshot layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    /// Statements flagged as full-scan candidates
    #[serde(default)]
    pub queries: Vec<RawQueryStats>,

    /// Table metadata
    #[serde(default)]
    pub tables: Vec<SnapshotTable>,
}

/// Metadata for one table in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotTable {
    #[serde(default)]
    pub schema: Option<String>,
    pub name: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,

    /// Indexed columns; omit when unknown
    #[serde(default)]
    pub indexes: Option<Vec<String>>,
}

impl SnapshotTable {
    fn matches(&self, schema: Option<&str>, table: &str) -> bool {
        if !self.name.eq_ignore_ascii_case(table) {
            return false;
        }
        match (schema, self.schema.as_deref()) {
            (Some(wanted), Some(have)) => wanted.eq_ignore_ascii_case(have),
            _ => true,
        }
    }
}

/// Telemetry source backed by an in-memory snapshot
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    snapshot: Snapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Load a snapshot file. `.json` files are parsed as JSON, anything else
    /// as YAML.
    pub fn load(path: &Path) -> DbResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DbError::ConnectionError(format!("cannot read snapshot {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&content).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&content).map_err(|e| e.to_string())
        };
        let snapshot = parsed.map_err(|message| DbError::SnapshotError {
            path: path.display().to_string(),
            message,
        })?;
        Ok(Self::new(snapshot))
    }

    fn find(&self, schema: Option<&str>, table: &str) -> DbResult<&SnapshotTable> {
        self.snapshot
            .tables
            .iter()
            .find(|t| t.matches(schema, table))
            .ok_or_else(|| {
                DbError::TableNotFound(match schema {
                    Some(s) => format!("{}.{}", s, table),
                    None => table.to_string(),
                })
            })
    }
}

#[async_trait]
impl QueryStatsSource for SnapshotSource {
    async fn fetch_current_fts_candidates(&self) -> DbResult<Vec<QueryRecord>> {
        Ok(self
            .snapshot
            .queries
            .iter()
            .cloned()
            .map(QueryRecord::from_raw)
            .collect())
    }

    fn source_type(&self) -> &'static str {
        "snapshot"
    }
}

#[async_trait]
impl TableMetadataSource for SnapshotSource {
    async fn size_of(&self, schema: Option<&str>, table: &str) -> DbResult<Option<u64>> {
        Ok(self.find(schema, table)?.size_bytes)
    }

    async fn known_indexes(
        &self,
        schema: Option<&str>,
        table: &str,
    ) -> DbResult<Option<BTreeSet<String>>> {
        let entry = self.find(schema, table)?;
        Ok(entry
            .indexes
            .as_ref()
            .map(|cols| cols.iter().map(|c| c.to_uppercase()).collect()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT: &str = r#"
queries:
  - source_id: q1
    sql_text: "SELECT * FROM small_tbl"
    schema: app
    executions: 5
    elapsed_us: 1000
  - sql_text: "SELECT * FROM big_tbl WHERE created_at > :1"
    executions: 500
    elapsed_us: 90000000
tables:
  - schema: APP
    name: SMALL_TBL
    size_bytes: 2097152
    indexes: []
  - name: BIG_TBL
    size_bytes: 16106127360
"#;

    fn source() -> SnapshotSource {
        SnapshotSource::new(serde_yaml::from_str(SNAPSHOT).unwrap())
    }

    #[tokio::test]
    async fn test_candidates() {
        let records = source().fetch_current_fts_candidates().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].source_ids, vec!["q1"]);
        assert_eq!(records[1].predicate_columns[0].name, "CREATED_AT");
    }

    #[tokio::test]
    async fn test_size_lookup() {
        let src = source();
        assert_eq!(src.size_of(Some("app"), "small_tbl").await.unwrap(), Some(2097152));
        assert_eq!(src.size_of(Some("ANY"), "BIG_TBL").await.unwrap(), Some(16106127360));
        assert!(matches!(
            src.size_of(Some("OTHER"), "SMALL_TBL").await,
            Err(DbError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_indexes_signal() {
        let src = source();
        assert_eq!(
            src.known_indexes(Some("APP"), "SMALL_TBL").await.unwrap(),
            Some(BTreeSet::new())
        );
        assert_eq!(src.known_indexes(None, "BIG_TBL").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_load_json_and_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("snap.yml");
        std::fs::write(&yaml_path, SNAPSHOT).unwrap();
        assert_eq!(SnapshotSource::load(&yaml_path).unwrap().source_type(), "snapshot");

        let json_path = dir.path().join("snap.json");
        let json = serde_json::to_string(&source().snapshot).unwrap();
        std::fs::write(&json_path, json).unwrap();
        let loaded = SnapshotSource::load(&json_path).unwrap();
        assert_eq!(loaded.snapshot.tables.len(), 2);
    }

    #[test]
    fn test_load_rejects_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        std::fs::write(&path, "querys: []").unwrap();
        let err = SnapshotSource::load(&path).unwrap_err();
        assert!(err.to_string().contains("[D004]"));
    }

    #[test]
    fn test_load_missing_file_is_connection_error() {
        let err = SnapshotSource::load(Path::new("/nonexistent/snap.yml")).unwrap_err();
        assert!(err.is_connection_level());
    }
}
