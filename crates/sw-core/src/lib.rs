//! sw-core - Core library for scanwatch
//!
//! Shared data model (queries, tables, remediation records), configuration
//! parsing and schedule arithmetic used by every other scanwatch crate.

pub mod config;
pub mod error;
mod newtype_string;
pub mod query;
pub mod remediation;
pub mod run;
pub mod schedule;
pub mod table;

pub use config::{Config, EngineConfig, LedgerKind, SourceKind};
pub use error::{CoreError, CoreResult};
pub use query::{merge_duplicates, QueryId, QueryRecord, RawQueryStats};
pub use remediation::{Assessment, Remediation, RemediationRecord, RemediationStatus};
pub use run::RunStamp;
pub use schedule::next_run_after;
pub use sw_sql::{ColumnRef, TableRef};
pub use table::{TableInfo, TableKey, Tier};
