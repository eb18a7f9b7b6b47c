//! Table resolution and size-tier classification

use crate::error::{EngineError, EngineResult};
use crate::shutdown::Shutdown;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use sw_core::{QueryRecord, TableInfo, TableKey, Tier};
use sw_db::TableMetadataSource;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Tables resolved during one run. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct TableCatalog {
    tables: HashMap<TableKey, TableInfo>,
}

impl TableCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: TableInfo) {
        self.tables.insert(info.key.clone(), info);
    }

    pub fn get(&self, key: &TableKey) -> Option<&TableInfo> {
        self.tables.get(key)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Number of tables that fell back to the conservative default
    pub fn degraded_count(&self) -> usize {
        self.tables.values().filter(|t| t.is_degraded()).count()
    }
}

/// Tier decision for one query
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub tier: Tier,

    /// One entry per referenced table, in query order
    pub tables: Vec<TableInfo>,

    /// Some table had no usable metadata, or no table was found at all
    pub degraded: bool,
}

/// Distinct lookup keys across `queries`, in first-seen order
pub fn table_keys(queries: &[QueryRecord]) -> Vec<TableKey> {
    let mut seen = BTreeSet::new();
    let mut keys = Vec::new();
    for query in queries {
        for table in &query.tables {
            let key = TableKey::new(query.lookup_schema(table), table.name.clone());
            if seen.insert(key.clone()) {
                keys.push(key);
            }
        }
    }
    keys
}

/// Resolve every key against the metadata source.
///
/// At most `concurrency_limit` lookups run at once and each call is bounded
/// by `timeout`. A missing table, a failed statement or a timeout degrades
/// that table to T2; a connection-level failure aborts the whole batch as
/// `SourceUnavailable`. Shutdown abandons in-flight lookups.
pub async fn resolve_tables(
    source: Arc<dyn TableMetadataSource>,
    keys: Vec<TableKey>,
    threshold_bytes: u64,
    concurrency_limit: usize,
    timeout: Duration,
    shutdown: &Shutdown,
) -> EngineResult<TableCatalog> {
    let mut catalog = TableCatalog::new();
    if keys.is_empty() {
        return Ok(catalog);
    }

    let semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
    let mut lookups = JoinSet::new();
    for key in keys {
        let source = Arc::clone(&source);
        let semaphore = Arc::clone(&semaphore);
        lookups.spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Err(EngineError::Cancelled),
            };
            lookup_table(source.as_ref(), key, threshold_bytes, timeout).await
        });
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                lookups.abort_all();
                log::warn!("Shutdown requested, abandoning {} table lookups", lookups.len());
                return Err(EngineError::Cancelled);
            }
            joined = lookups.join_next() => {
                let Some(joined) = joined else { break };
                let info = joined.map_err(|e| EngineError::Internal(e.to_string()))??;
                catalog.insert(info);
            }
        }
    }

    log::debug!(
        "Resolved {} tables ({} degraded)",
        catalog.len(),
        catalog.degraded_count()
    );
    Ok(catalog)
}

async fn lookup_table(
    source: &dyn TableMetadataSource,
    key: TableKey,
    threshold_bytes: u64,
    timeout: Duration,
) -> EngineResult<TableInfo> {
    let schema = key.schema.as_deref();
    let size = match tokio::time::timeout(timeout, source.size_of(schema, &key.name)).await {
        Ok(Ok(size)) => size,
        Ok(Err(e)) if e.is_connection_level() => return Err(e.into()),
        Ok(Err(e)) => return Ok(ambiguous(key, e.to_string())),
        Err(_) => {
            let reason = format!("size lookup timed out after {}s", timeout.as_secs_f64());
            return Ok(ambiguous(key, reason));
        }
    };

    let indexes = match tokio::time::timeout(timeout, source.known_indexes(schema, &key.name)).await
    {
        Ok(Ok(indexes)) => indexes,
        Ok(Err(e)) if e.is_connection_level() => return Err(e.into()),
        Ok(Err(e)) => {
            log::debug!("No index information for {key}: {e}");
            None
        }
        Err(_) => {
            log::debug!("Index lookup for {key} timed out");
            None
        }
    };

    Ok(TableInfo::resolved(key, size, indexes, threshold_bytes))
}

fn ambiguous(key: TableKey, reason: String) -> TableInfo {
    let err = EngineError::ResolutionAmbiguous {
        table: key.to_string(),
        reason: reason.clone(),
    };
    log::warn!("{err}; treating it as T2");
    TableInfo::ambiguous(key, reason)
}

/// Tier of a query: `T1` only when every referenced table is below the
/// threshold. A query with no extractable table is `T2` and degraded.
pub fn classify(query: &QueryRecord, catalog: &TableCatalog) -> Classification {
    if query.tables.is_empty() {
        return Classification {
            tier: Tier::T2,
            tables: Vec::new(),
            degraded: true,
        };
    }

    let tables: Vec<TableInfo> = query
        .tables
        .iter()
        .map(|table| {
            let key = TableKey::new(query.lookup_schema(table), table.name.clone());
            match catalog.get(&key) {
                Some(info) => info.clone(),
                None => TableInfo::ambiguous(key, "not resolved this run"),
            }
        })
        .collect();

    let tier = tables.iter().map(|t| t.tier).max().unwrap_or(Tier::T2);
    let degraded = tables.iter().any(TableInfo::is_degraded);
    Classification {
        tier,
        tables,
        degraded,
    }
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
