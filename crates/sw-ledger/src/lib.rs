//! Remediation ledger for scanwatch.
//!
//! The ledger owns every [`RemediationRecord`](sw_core::RemediationRecord)
//! across runs. Records are versioned and written with compare-and-swap, so
//! the same rules hold for the in-memory, JSON file and DuckDB stores.

pub mod ddl;
pub mod duckdb;
pub mod error;
pub mod file;
pub mod ledger;
pub mod memory;
pub mod migration;
pub mod store;
#[cfg(test)]
mod testing;

pub use crate::duckdb::DuckDbLedgerStore;
pub use error::{LedgerError, LedgerResult};
pub use file::FileLedgerStore;
pub use ledger::{Ledger, Reconciled, Transition};
pub use memory::MemoryLedgerStore;
pub use store::{PendingWrite, RemediationLedgerStore, RunLease};
