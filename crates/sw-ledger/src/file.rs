//! JSON file ledger store
//!
//! The whole ledger is one JSON document. Every mutation runs under a lock
//! file, re-reads the document, applies the change and writes it back with
//! write-to-temp-then-rename, so a crash never leaves a torn file.

use crate::error::{LedgerError, LedgerResult};
use crate::store::{check_lease, check_version, PendingWrite, RemediationLedgerStore, RunLease};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use sw_core::{QueryId, RemediationRecord, RunStamp};

/// Current document format
const FORMAT_VERSION: u32 = 1;

/// How long to wait for another process to release the lock file
const LOCK_WAIT: Duration = Duration::from_secs(5);
const LOCK_POLL: Duration = Duration::from_millis(20);

/// A lock file older than this is assumed abandoned by a crashed process
const LOCK_STALE: Duration = Duration::from_secs(60);

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerDocument {
    #[serde(default)]
    format_version: u32,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    lease: Option<RunLease>,
    #[serde(default)]
    records: BTreeMap<String, RemediationRecord>,
}

/// Ledger store persisted as a single JSON file
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    path: Arc<PathBuf>,
}

impl FileLedgerStore {
    /// Use the ledger at `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&LedgerDocument) -> T + Send + 'static,
        T: Send + 'static,
    {
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || load(&path).map(|doc| f(&doc)))
            .await
            .map_err(|e| LedgerError::Internal(e.to_string()))?
    }

    async fn update<T, F>(&self, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&mut LedgerDocument) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || {
            let _lock = LockFile::acquire(&path)?;
            let mut doc = load(&path)?;
            let out = f(&mut doc)?;
            doc.format_version = FORMAT_VERSION;
            doc.updated_at = Some(Utc::now());
            save(&path, &doc)?;
            Ok(out)
        })
        .await
        .map_err(|e| LedgerError::Internal(e.to_string()))?
    }
}

fn io_err(path: &Path, source: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn load(path: &Path) -> LedgerResult<LedgerDocument> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(serde_json::from_str(&content)?),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(LedgerDocument::default()),
        Err(e) => Err(io_err(path, e)),
    }
}

/// Write via a PID-suffixed temp file and rename
fn save(path: &Path, doc: &LedgerDocument) -> LedgerResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    let temp_path = path.with_extension(format!("json.{}.tmp", std::process::id()));
    let json = serde_json::to_string_pretty(doc)?;
    std::fs::write(&temp_path, json).map_err(|e| io_err(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        io_err(path, e)
    })
}

/// Exclusive lock held as `<ledger>.lock`, removed on drop
struct LockFile {
    path: PathBuf,
}

impl LockFile {
    fn acquire(ledger: &Path) -> LedgerResult<Self> {
        let path = ledger.with_extension("lock");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }

        let deadline = SystemTime::now() + LOCK_WAIT;
        loop {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(_) => return Ok(Self { path }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if lock_is_stale(&path) {
                        log::warn!("Removing abandoned ledger lock {}", path.display());
                        let _ = std::fs::remove_file(&path);
                        continue;
                    }
                    if SystemTime::now() >= deadline {
                        return Err(LedgerError::PersistenceUnavailable(format!(
                            "ledger lock {} held by another process",
                            path.display()
                        )));
                    }
                    std::thread::sleep(LOCK_POLL);
                }
                Err(e) => return Err(io_err(&path, e)),
            }
        }
    }
}

fn lock_is_stale(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age >= LOCK_STALE)
}

impl Drop for LockFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[async_trait]
impl RemediationLedgerStore for FileLedgerStore {
    async fn get(&self, query_id: &QueryId) -> LedgerResult<Option<RemediationRecord>> {
        let key = query_id.to_string();
        self.read(move |doc| doc.records.get(&key).cloned()).await
    }

    async fn put(
        &self,
        record: &RemediationRecord,
        expected_version: Option<u64>,
    ) -> LedgerResult<()> {
        let record = record.clone();
        self.update(move |doc| {
            let key = record.query_id.to_string();
            let found = doc.records.get(&key).map(|r| r.version);
            check_version(&record.query_id, expected_version, found)?;
            doc.records.insert(key, record);
            Ok(())
        })
        .await
    }

    async fn put_all(&self, writes: &[PendingWrite]) -> LedgerResult<()> {
        let writes = writes.to_vec();
        self.update(move |doc| {
            for write in &writes {
                let found = doc
                    .records
                    .get(write.record.query_id.as_str())
                    .map(|r| r.version);
                check_version(&write.record.query_id, write.expected_version, found)?;
            }
            for write in writes {
                doc.records
                    .insert(write.record.query_id.to_string(), write.record);
            }
            Ok(())
        })
        .await
    }

    async fn list(&self) -> LedgerResult<Vec<RemediationRecord>> {
        self.read(|doc| doc.records.values().cloned().collect())
            .await
    }

    async fn try_begin_run(
        &self,
        run: &RunStamp,
        stale_after: Duration,
    ) -> LedgerResult<Option<RunLease>> {
        let run = run.clone();
        self.update(move |doc| {
            let replaced = check_lease(doc.lease.as_ref(), &run, stale_after)?;
            doc.lease = Some(RunLease::for_run(&run));
            Ok(replaced)
        })
        .await
    }

    async fn end_run(&self, run_id: &str) -> LedgerResult<()> {
        let run_id = run_id.to_string();
        self.update(move |doc| {
            if doc.lease.as_ref().is_some_and(|l| l.run_id == run_id) {
                doc.lease = None;
            }
            Ok(())
        })
        .await
    }

    fn store_type(&self) -> &'static str {
        "file"
    }
}

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;
