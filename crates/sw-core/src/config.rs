//! Configuration types and parsing for scanwatch.yml

use crate::error::{CoreError, CoreResult};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "scanwatch.yml";

/// Highest priority the scorer may ever assign
pub const PRIORITY_CEILING: u8 = 10;

/// Upper bound accepted for `engine.adapter_timeout_seconds` (one day)
pub const MAX_ADAPTER_TIMEOUT_SECS: f64 = 86_400.0;

/// Starter configuration written by `scanwatch init`
pub const SAMPLE_CONFIG: &str = r#"name: scanwatch

engine:
  # Tables at or above this size are T2 (large)
  t1_t2_threshold_bytes: 10485760
  max_priority: 10
  concurrency_limit: 8
  adapter_timeout_seconds: 30
  conflict_retries: 3
  run_lease_seconds: 21600

source:
  type: duckdb
  path: telemetry.duckdb

ledger:
  type: file
  path: target/ledger.json

output:
  scripts_dir: output/generated_scripts
  target_dir: target

schedule:
  interval_hours: 6
  anchor: "00:00"
"#;

/// Main configuration from scanwatch.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Deployment name, used in logs and run results
    pub name: String,

    /// Decision engine tuning
    #[serde(default)]
    pub engine: EngineConfig,

    /// Where query telemetry and table metadata come from
    #[serde(default)]
    pub source: SourceConfig,

    /// Where remediation records are kept between runs
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,

    /// Recurring schedule for `scanwatch watch`
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Directory relative paths are resolved against
    #[serde(skip)]
    base_dir: PathBuf,
}

/// Decision engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Size boundary between T1 and T2 tables, in bytes
    #[serde(default = "default_threshold")]
    pub t1_t2_threshold_bytes: u64,

    /// Upper clamp for priority scores (1..=10)
    #[serde(default = "default_max_priority")]
    pub max_priority: u8,

    /// Maximum concurrent table-metadata lookups
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Bound on every adapter and ledger call; fractions are allowed
    #[serde(default = "default_adapter_timeout")]
    pub adapter_timeout_seconds: f64,

    /// Compare-and-swap retries before giving up on a record
    #[serde(default = "default_conflict_retries")]
    pub conflict_retries: u32,

    /// Age after which an abandoned run lease may be taken over
    #[serde(default = "default_run_lease")]
    pub run_lease_seconds: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            t1_t2_threshold_bytes: default_threshold(),
            max_priority: default_max_priority(),
            concurrency_limit: default_concurrency_limit(),
            adapter_timeout_seconds: default_adapter_timeout(),
            conflict_retries: default_conflict_retries(),
            run_lease_seconds: default_run_lease(),
        }
    }
}

impl EngineConfig {
    /// Adapter timeout as a `Duration`. A value that cannot be one (never
    /// the case after validation) falls back to the default.
    pub fn adapter_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.adapter_timeout_seconds)
            .ok()
            .filter(|d| !d.is_zero())
            .unwrap_or_else(|| Duration::from_secs_f64(default_adapter_timeout()))
    }

    /// Run lease staleness window as a `Duration`
    pub fn run_lease(&self) -> Duration {
        Duration::from_secs(self.run_lease_seconds)
    }
}

/// Telemetry source type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// DuckDB database holding telemetry tables
    #[default]
    DuckDb,
    /// YAML or JSON snapshot file
    Snapshot,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::DuckDb => write!(f, "duckdb"),
            SourceKind::Snapshot => write!(f, "snapshot"),
        }
    }
}

/// Telemetry source configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    /// Source type
    #[serde(rename = "type", default)]
    pub kind: SourceKind,

    /// Database or snapshot path
    #[serde(default = "default_source_path")]
    pub path: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: SourceKind::default(),
            path: default_source_path(),
        }
    }
}

/// Ledger store type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    /// Single JSON document
    #[default]
    File,
    /// DuckDB table
    DuckDb,
}

impl std::fmt::Display for LedgerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerKind::File => write!(f, "file"),
            LedgerKind::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Store type
    #[serde(rename = "type", default)]
    pub kind: LedgerKind,

    /// Store path
    #[serde(default = "default_ledger_path")]
    pub path: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            kind: LedgerKind::default(),
            path: default_ledger_path(),
        }
    }
}

/// Output locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory generated scripts are written to
    #[serde(default = "default_scripts_dir")]
    pub scripts_dir: String,

    /// Directory for run results
    #[serde(default = "default_target_dir")]
    pub target_dir: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            scripts_dir: default_scripts_dir(),
            target_dir: default_target_dir(),
        }
    }
}

/// Schedule configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Hours between runs
    #[serde(default = "default_interval_hours")]
    pub interval_hours: u32,

    /// Time of day (UTC, `HH:MM`) the schedule is aligned to
    #[serde(default = "default_anchor")]
    pub anchor: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_hours: default_interval_hours(),
            anchor: default_anchor(),
        }
    }
}

impl ScheduleConfig {
    /// Parse the anchor time
    pub fn anchor_time(&self) -> CoreResult<NaiveTime> {
        NaiveTime::parse_from_str(&self.anchor, "%H:%M").map_err(|e| CoreError::ConfigInvalid {
            message: format!("schedule.anchor '{}' is not HH:MM: {}", self.anchor, e),
        })
    }
}

fn default_threshold() -> u64 {
    10 * 1024 * 1024
}

fn default_max_priority() -> u8 {
    PRIORITY_CEILING
}

fn default_concurrency_limit() -> usize {
    8
}

fn default_adapter_timeout() -> f64 {
    30.0
}

fn default_conflict_retries() -> u32 {
    3
}

fn default_run_lease() -> u64 {
    6 * 60 * 60
}

fn default_source_path() -> String {
    "telemetry.duckdb".to_string()
}

fn default_ledger_path() -> String {
    "target/ledger.json".to_string()
}

fn default_scripts_dir() -> String {
    "output/generated_scripts".to_string()
}

fn default_target_dir() -> String {
    "target".to_string()
}

fn default_interval_hours() -> u32 {
    6
}

fn default_anchor() -> String {
    "00:00".to_string()
}

impl Config {
    /// Configuration with every default, rooted at `base_dir`
    pub fn with_defaults(name: impl Into<String>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            engine: EngineConfig::default(),
            source: SourceConfig::default(),
            ledger: LedgerConfig::default(),
            output: OutputConfig::default(),
            schedule: ScheduleConfig::default(),
            base_dir: base_dir.into(),
        }
    }

    /// Load and validate configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config = Self::parse(&content).map_err(|e| match e {
            CoreError::ConfigParseError { message, .. } => CoreError::ConfigParseError {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults rooted
    /// at the file's directory.
    pub fn load_or_default(path: &Path) -> CoreResult<Self> {
        if path.exists() {
            return Self::load(path);
        }
        log::debug!(
            "No config at {}, using built-in defaults",
            path.display()
        );
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::with_defaults("scanwatch", base_dir))
    }

    /// Parse and validate YAML text. Relative paths resolve against the
    /// current directory.
    pub fn parse(yaml: &str) -> CoreResult<Self> {
        let config: Config =
            serde_yaml::from_str(yaml).map_err(|e| CoreError::ConfigParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return invalid("name cannot be empty");
        }
        let engine = &self.engine;
        if engine.t1_t2_threshold_bytes == 0 {
            return invalid("engine.t1_t2_threshold_bytes must be positive");
        }
        if !(1..=PRIORITY_CEILING).contains(&engine.max_priority) {
            return invalid(format!(
                "engine.max_priority must be between 1 and {}, got {}",
                PRIORITY_CEILING, engine.max_priority
            ));
        }
        if engine.concurrency_limit == 0 {
            return invalid("engine.concurrency_limit must be positive");
        }
        let timeout = engine.adapter_timeout_seconds;
        if !(timeout.is_finite() && timeout > 0.0 && timeout <= MAX_ADAPTER_TIMEOUT_SECS) {
            return invalid(format!(
                "engine.adapter_timeout_seconds must be above 0 and at most {}, got {}",
                MAX_ADAPTER_TIMEOUT_SECS, timeout
            ));
        }
        if engine.run_lease_seconds == 0 {
            return invalid("engine.run_lease_seconds must be positive");
        }
        if self.schedule.interval_hours == 0 {
            return invalid("schedule.interval_hours must be positive");
        }
        self.schedule.anchor_time()?;
        Ok(())
    }

    /// Resolve a configured path against the config file's directory
    pub fn resolve(&self, path: &str) -> PathBuf {
        let p = Path::new(path);
        if p.is_absolute() {
            p.to_path_buf()
        } else {
            self.base_dir.join(p)
        }
    }

    /// Absolute telemetry source path
    pub fn source_path(&self) -> PathBuf {
        self.resolve(&self.source.path)
    }

    /// Absolute ledger path
    pub fn ledger_path(&self) -> PathBuf {
        self.resolve(&self.ledger.path)
    }

    /// Absolute scripts directory
    pub fn scripts_dir(&self) -> PathBuf {
        self.resolve(&self.output.scripts_dir)
    }

    /// Absolute target directory
    pub fn target_dir(&self) -> PathBuf {
        self.resolve(&self.output.target_dir)
    }
}

fn invalid<T>(message: impl Into<String>) -> CoreResult<T> {
    Err(CoreError::ConfigInvalid {
        message: message.into(),
    })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
