//! Table metadata and size tiers

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Size tier. `T1 < T2`, so the tier of a query is the max over its tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Small table, below the threshold
    T1,
    /// Large table, at or above the threshold, or of unknown size
    T2,
}

impl Tier {
    /// Tier for a table size. Unknown sizes are large.
    pub fn for_size(size_bytes: Option<u64>, threshold_bytes: u64) -> Self {
        match size_bytes {
            Some(size) if size < threshold_bytes => Tier::T1,
            _ => Tier::T2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::T1 => "T1",
            Tier::T2 => "T2",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lookup identity of a table: `(schema, table_name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub name: String,
}

impl TableKey {
    pub fn new(schema: Option<String>, name: impl Into<String>) -> Self {
        Self {
            schema,
            name: name.into(),
        }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A resolved table, cached for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// Lookup identity
    #[serde(flatten)]
    pub key: TableKey,

    /// Size in bytes; `None` when the source could not say
    pub size_bytes: Option<u64>,

    pub tier: Tier,

    /// Indexed columns, when the source reports them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_indexes: Option<BTreeSet<String>>,

    /// Why resolution fell back to the conservative default, if it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ambiguous: Option<String>,
}

impl TableInfo {
    /// A table the metadata source answered for
    pub fn resolved(
        key: TableKey,
        size_bytes: Option<u64>,
        known_indexes: Option<BTreeSet<String>>,
        threshold_bytes: u64,
    ) -> Self {
        Self {
            key,
            size_bytes,
            tier: Tier::for_size(size_bytes, threshold_bytes),
            known_indexes,
            ambiguous: None,
        }
    }

    /// A table without usable metadata: unknown size, `T2`
    pub fn ambiguous(key: TableKey, reason: impl Into<String>) -> Self {
        Self {
            key,
            size_bytes: None,
            tier: Tier::T2,
            known_indexes: None,
            ambiguous: Some(reason.into()),
        }
    }

    /// True when this entry is a fallback rather than real metadata
    pub fn is_degraded(&self) -> bool {
        self.ambiguous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundary() {
        let threshold = 10 * 1024 * 1024;
        assert_eq!(Tier::for_size(Some(threshold - 1), threshold), Tier::T1);
        assert_eq!(Tier::for_size(Some(threshold), threshold), Tier::T2);
        assert_eq!(Tier::for_size(None, threshold), Tier::T2);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(Tier::T1 < Tier::T2);
        assert_eq!([Tier::T1, Tier::T2, Tier::T1].into_iter().max(), Some(Tier::T2));
    }

    #[test]
    fn test_ambiguous_is_t2() {
        let info = TableInfo::ambiguous(TableKey::new(None, "GHOST"), "table not found");
        assert_eq!(info.tier, Tier::T2);
        assert!(info.is_degraded());
        assert_eq!(info.key.to_string(), "GHOST");
    }

    #[test]
    fn test_table_info_serializes_flat() {
        let info = TableInfo::resolved(
            TableKey::new(Some("HR".to_string()), "EMP"),
            Some(42),
            None,
            100,
        );
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["schema"], "HR");
        assert_eq!(json["name"], "EMP");
        assert_eq!(json["tier"], "T1");
        assert!(json.get("ambiguous").is_none());
    }
}
