//! Statement normalization and fingerprinting
//!
//! Two captures of the same statement that differ only in whitespace, comments,
//! letter case or a trailing semicolon normalize to the same text, and
//! therefore to the same fingerprint. The fingerprint is the durable identity
//! of a query across runs.

use crate::extractor::{predicate_columns_from_tokens, scan_tables, ColumnRef, TableRef};
use crate::lexer::significant_tokens;
use sha2::{Digest, Sha256};
use sqlparser::tokenizer::Token;

/// Everything derived from a single statement's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlShape {
    /// Normalized statement text
    pub normalized: String,

    /// SHA-256 hex digest of `normalized`
    pub fingerprint: String,

    /// Tables referenced after FROM/JOIN, in order of first appearance
    pub tables: Vec<TableRef>,

    /// Columns compared in the WHERE clause (before the first ORDER BY)
    pub predicate_columns: Vec<ColumnRef>,

    /// False when the tokenizer rejected the text and only whitespace
    /// normalization was applied
    pub tokenized: bool,
}

/// Normalize, fingerprint and extract in one tokenizer pass.
pub fn analyze(sql: &str) -> SqlShape {
    match significant_tokens(sql) {
        Ok(tokens) => {
            let normalized = render_tokens(&tokens);
            let scan = scan_tables(&tokens);
            SqlShape {
                fingerprint: query_fingerprint(&normalized),
                normalized,
                predicate_columns: predicate_columns_from_tokens(&tokens, &scan),
                tables: scan.tables,
                tokenized: true,
            }
        }
        Err(e) => {
            log::debug!("Falling back to whitespace normalization: {e}");
            let normalized = collapse_whitespace(sql);
            SqlShape {
                fingerprint: query_fingerprint(&normalized),
                normalized,
                tables: Vec::new(),
                predicate_columns: Vec::new(),
                tokenized: false,
            }
        }
    }
}

/// Normalize statement text.
pub fn normalize_sql(sql: &str) -> String {
    match significant_tokens(sql) {
        Ok(tokens) => render_tokens(&tokens),
        Err(_) => collapse_whitespace(sql),
    }
}

/// Compute the SHA-256 fingerprint of normalized text
pub fn query_fingerprint(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn render_tokens(tokens: &[Token]) -> String {
    let mut end = tokens.len();
    while end > 0 && matches!(tokens[end - 1], Token::SemiColon) {
        end -= 1;
    }

    let mut out = String::new();
    for token in &tokens[..end] {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&token.to_string());
    }
    out.to_uppercase()
}

fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(';')
        .to_uppercase()
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
