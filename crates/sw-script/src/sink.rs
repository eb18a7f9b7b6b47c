//! Artifact sinks

use crate::error::{ScriptError, ScriptResult};
use crate::renderer::{script_file_name, script_file_suffix};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use sw_core::RemediationRecord;

/// Destination for generated remediation scripts
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Publish a script for `record`, returning where it went
    async fn emit(&self, record: &RemediationRecord, script_text: &str) -> ScriptResult<String>;
}

/// Writes each script to `<dir>/<tier>_<kind>_<id>.sql`. A script written
/// under an older tier or kind for the same query is removed.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Write through a sibling temp file and rename into place
pub(crate) fn write_atomic(path: &Path, contents: &str) -> ScriptResult<()> {
    let io_err = |p: &Path, source| ScriptError::Io {
        path: p.display().to_string(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("out");
    let temp_path = path.with_extension(format!("{}.{}.tmp", extension, std::process::id()));
    std::fs::write(&temp_path, contents).map_err(|e| io_err(&temp_path, e))?;
    std::fs::rename(&temp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        io_err(path, e)
    })
}

/// Remove scripts for the same query left behind under another name
fn remove_superseded(dir: &Path, current: &str, suffix: &str) -> ScriptResult<usize> {
    let entries = std::fs::read_dir(dir).map_err(|e| ScriptError::Io {
        path: dir.display().to_string(),
        source: e,
    })?;
    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name != current && name.ends_with(suffix) {
            std::fs::remove_file(entry.path()).map_err(|e| ScriptError::Io {
                path: entry.path().display().to_string(),
                source: e,
            })?;
            log::debug!("Removed superseded script {}", name);
            removed += 1;
        }
    }
    Ok(removed)
}

#[async_trait]
impl ArtifactSink for DirectorySink {
    async fn emit(&self, record: &RemediationRecord, script_text: &str) -> ScriptResult<String> {
        let name = script_file_name(record);
        let suffix = format!("_{}", script_file_suffix(record));
        let path = self.dir.join(&name);
        let contents = script_text.to_string();
        let (dir, target) = (self.dir.clone(), path.clone());
        tokio::task::spawn_blocking(move || {
            write_atomic(&target, &contents)?;
            remove_superseded(&dir, &name, &suffix)
        })
        .await
        .map_err(|e| ScriptError::Internal(e.to_string()))??;
        log::info!("Wrote script {}", path.display());
        Ok(path.display().to_string())
    }
}
