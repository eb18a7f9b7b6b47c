//! sw-sql - SQL text layer for scanwatch
//!
//! This crate turns raw statement text captured from query telemetry into the
//! pieces the decision engine needs: a whitespace- and case-insensitive
//! normalized form, a stable fingerprint of that form, the tables referenced
//! after `FROM`/`JOIN`, and the columns filtered in the `WHERE` clause.
//!
//! Extraction is token based (sqlparser's tokenizer) rather than a full parse,
//! because telemetry views routinely truncate long statements.

pub mod error;
pub mod extractor;
pub mod lexer;
pub mod normalize;

pub use error::SqlError;
pub use extractor::{extract_predicate_columns, extract_tables, ColumnRef, TableRef};
pub use normalize::{analyze, normalize_sql, query_fingerprint, SqlShape};
