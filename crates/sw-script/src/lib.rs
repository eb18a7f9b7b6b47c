//! sw-script - Remediation scripts for scanwatch
//!
//! Renders `CREATE INDEX` and refactor scripts from remediation records
//! with minijinja, and hands them to an [`ArtifactSink`]. [`ReportRenderer`]
//! writes the HTML summary page for a run.

pub mod error;
pub mod renderer;
pub mod report;
pub mod sink;

pub use error::{ScriptError, ScriptResult};
pub use renderer::{index_name, script_file_name, script_file_suffix, ScriptRenderer};
pub use report::{FtsReport, ReportRenderer, ReportSchema, REPORT_FILE};
pub use sink::{ArtifactSink, DirectorySink};
