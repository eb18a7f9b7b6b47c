//! sw-engine - Decision engine for scanwatch
//!
//! Turns full-scan candidates and table metadata into classified, scored
//! and deduplicated remediation records. [`CycleRunner`] composes the
//! stages into one run.

pub mod classifier;
pub mod cycle;
pub mod error;
pub mod estimator;
pub mod priority;
pub mod shutdown;
pub mod summary;
#[cfg(test)]
pub(crate) mod test_utils;
pub mod workload;

pub use classifier::{classify, resolve_tables, table_keys, Classification, TableCatalog};
pub use cycle::{assess, CycleRunner};
pub use error::{EngineError, EngineResult};
pub use estimator::{elapsed_shares, estimate, Estimate};
pub use priority::score;
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use summary::RunSummary;
pub use workload::{classify_schemas, SchemaLoad, WorkloadClass};
