//! sw-db - Telemetry adapters for scanwatch
//!
//! This crate provides the `QueryStatsSource` and `TableMetadataSource`
//! traits and two implementations: a DuckDB database holding telemetry
//! tables, and a static snapshot file.

pub mod duckdb;
pub mod error;
pub mod snapshot;
pub mod traits;

pub use crate::duckdb::DuckDbTelemetry;
pub use error::{DbError, DbResult};
pub use snapshot::{Snapshot, SnapshotSource, SnapshotTable};
pub use traits::{QueryStatsSource, TableMetadataSource, TelemetrySource};
