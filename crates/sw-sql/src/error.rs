//! Error types for sw-sql

use thiserror::Error;

/// SQL text processing errors
#[derive(Error, Debug)]
pub enum SqlError {
    /// Tokenizer rejected the statement text (S001)
    #[error("[S001] SQL tokenize error: {0}")]
    TokenizeError(String),

    /// Empty SQL (S002)
    #[error("[S002] SQL is empty")]
    EmptySql,
}

/// Result type alias for SqlError
pub type SqlResult<T> = Result<T, SqlError>;
