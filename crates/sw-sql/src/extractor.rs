//! Table and predicate-column extraction from tokenized SQL
//!
//! This is not a parser. Tables are the identifiers following `FROM`/`JOIN`
//! (including comma-separated `FROM` lists), and predicate columns are
//! identifiers compared in the `WHERE` clause, attributed to a table through
//! their alias or qualifier. Anything the scanner cannot make sense of is
//! skipped rather than rejected.

use crate::error::SqlResult;
use crate::lexer::{bare_upper, ident_value, is_keyword, significant_tokens, word_at};
use serde::{Deserialize, Serialize};
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::Token;
use std::fmt;

/// Functions whose argument syntax uses `FROM` without naming a table
const FROM_FUNCTIONS: &[&str] = &["EXTRACT", "TRIM", "SUBSTRING", "OVERLAY", "POSITION"];

/// Pseudo-tables that never hold data worth indexing
const PSEUDO_TABLES: &[&str] = &["DUAL"];

/// Words that can precede a comparison without being a column
const NON_COLUMN_WORDS: &[&str] = &[
    "AND", "OR", "NOT", "NULL", "END", "THEN", "ELSE", "WHEN", "CASE", "EXISTS", "SELECT",
    "TRUE", "FALSE", "PRIOR", "ROWNUM",
];

/// A table referenced by a statement, as written (modulo identifier folding)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    /// Schema qualifier, when the statement spelled one out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Bare table name
    pub name: String,
}

impl TableRef {
    /// Create a table reference
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.into(),
        }
    }

    /// `schema.name` when qualified, otherwise `name`
    pub fn qualified(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// A column compared in a WHERE clause
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Table the column belongs to, when the statement makes that
    /// unambiguous: an alias or table qualifier naming exactly one
    /// referenced table, or a single-table statement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableRef>,

    /// Bare column name
    pub name: String,
}

impl ColumnRef {
    pub fn new(table: Option<TableRef>, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(t) => write!(f, "{}.{}", t, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Tables of a statement together with the aliases bound to them
#[derive(Debug, Default, Clone)]
pub(crate) struct TableScan {
    pub(crate) tables: Vec<TableRef>,
    aliases: Vec<(String, TableRef)>,
}

impl TableScan {
    /// Table named by the qualifier parts in front of a column
    fn owner(&self, qualifier: &[String]) -> Option<TableRef> {
        let Some(last) = qualifier.last() else {
            return match self.tables.as_slice() {
                [only] => Some(only.clone()),
                _ => None,
            };
        };

        if qualifier.len() == 1 {
            let bound: Vec<&TableRef> = self
                .aliases
                .iter()
                .filter(|(alias, _)| alias == last)
                .map(|(_, t)| t)
                .collect();
            if let Some(first) = bound.first() {
                return bound.iter().all(|t| t == first).then(|| (*first).clone());
            }
        }

        let schema = qualifier.len().checked_sub(2).map(|i| &qualifier[i]);
        let mut matches = self.tables.iter().filter(|t| {
            &t.name == last
                && match (schema, &t.schema) {
                    (Some(wanted), Some(actual)) => wanted == actual,
                    _ => true,
                }
        });
        match (matches.next(), matches.next()) {
            (Some(found), None) => Some(found.clone()),
            _ => None,
        }
    }
}

/// Extract the tables referenced by `sql`, in order of first appearance
pub fn extract_tables(sql: &str) -> SqlResult<Vec<TableRef>> {
    let tokens = significant_tokens(sql)?;
    Ok(scan_tables(&tokens).tables)
}

/// Extract the columns compared in the WHERE clause of `sql`
pub fn extract_predicate_columns(sql: &str) -> SqlResult<Vec<ColumnRef>> {
    let tokens = significant_tokens(sql)?;
    let scan = scan_tables(&tokens);
    Ok(predicate_columns_from_tokens(&tokens, &scan))
}

pub(crate) fn scan_tables(tokens: &[Token]) -> TableScan {
    let ctes = cte_names(tokens);
    let mut scan = TableScan::default();
    // Word preceding each open parenthesis, innermost last
    let mut paren_owners: Vec<Option<String>> = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            Token::LParen => {
                let owner = i.checked_sub(1).and_then(|p| bare_upper(&tokens[p]));
                paren_owners.push(owner);
                i += 1;
            }
            Token::RParen => {
                paren_owners.pop();
                i += 1;
            }
            tok if is_keyword(tok, Keyword::FROM) || is_keyword(tok, Keyword::JOIN) => {
                let inside_function = paren_owners
                    .last()
                    .and_then(|owner| owner.as_deref())
                    .is_some_and(|owner| FROM_FUNCTIONS.contains(&owner));
                if inside_function {
                    i += 1;
                    continue;
                }
                let allow_list = is_keyword(tok, Keyword::FROM);
                i = read_table_list(tokens, i + 1, allow_list, &ctes, &mut scan);
            }
            _ => i += 1,
        }
    }

    scan
}

/// Read `name [alias] [, name [alias]]*` starting at `start`.
///
/// Returns the index of the first token not consumed.
fn read_table_list(
    tokens: &[Token],
    start: usize,
    allow_list: bool,
    ctes: &[String],
    scan: &mut TableScan,
) -> usize {
    let mut i = start;
    loop {
        let Some((table, next)) = read_object_name(tokens, i) else {
            return i;
        };
        let (alias, next) = read_alias(tokens, next);
        i = next;

        let excluded = (table.schema.is_none() && ctes.contains(&table.name))
            || PSEUDO_TABLES.contains(&table.name.as_str());
        if !excluded {
            if let Some(alias) = alias {
                scan.aliases.push((alias, table.clone()));
            }
            if !scan.tables.contains(&table) {
                scan.tables.push(table);
            }
        }

        if allow_list && matches!(tokens.get(i), Some(Token::Comma)) {
            i += 1;
            continue;
        }
        return i;
    }
}

/// Read a dotted object name. Table functions such as `TABLE(...)` are not
/// object names and yield `None`.
fn read_object_name(tokens: &[Token], start: usize) -> Option<(TableRef, usize)> {
    let mut parts = vec![ident_value(word_at(tokens, start)?)];
    let mut i = start + 1;
    while matches!(tokens.get(i), Some(Token::Period)) {
        let Some(word) = word_at(tokens, i + 1) else {
            break;
        };
        parts.push(ident_value(word));
        i += 2;
    }

    if matches!(tokens.get(i), Some(Token::LParen)) {
        return None;
    }

    let name = parts.pop()?;
    let schema = parts.pop();
    Some((TableRef { schema, name }, i))
}

/// Read an optional `[AS] alias`, returning it and the next index
fn read_alias(tokens: &[Token], i: usize) -> (Option<String>, usize) {
    match tokens.get(i) {
        Some(tok) if is_keyword(tok, Keyword::AS) => match word_at(tokens, i + 1) {
            Some(word) => (Some(ident_value(word)), i + 2),
            None => (None, i + 1),
        },
        Some(Token::Word(w)) if w.keyword == Keyword::NoKeyword || w.quote_style.is_some() => {
            (Some(ident_value(w)), i + 1)
        }
        _ => (None, i),
    }
}

/// Names bound by a leading `WITH` clause
fn cte_names(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    let Some(with_idx) = tokens.iter().position(|t| is_keyword(t, Keyword::WITH)) else {
        return names;
    };

    let mut i = with_idx + 1;
    if tokens
        .get(i)
        .and_then(bare_upper)
        .is_some_and(|w| w == "RECURSIVE")
    {
        i += 1;
    }

    while let Some(word) = word_at(tokens, i) {
        names.push(ident_value(word));
        i += 1;
        if matches!(tokens.get(i), Some(Token::LParen)) {
            i = skip_balanced(tokens, i);
        }
        if !tokens.get(i).is_some_and(|t| is_keyword(t, Keyword::AS)) {
            break;
        }
        i += 1;
        if !matches!(tokens.get(i), Some(Token::LParen)) {
            break;
        }
        i = skip_balanced(tokens, i);
        if !matches!(tokens.get(i), Some(Token::Comma)) {
            break;
        }
        i += 1;
    }

    names
}

/// Given the index of an open parenthesis, return the index just past its
/// matching close (or the end of input).
fn skip_balanced(tokens: &[Token], open: usize) -> usize {
    let mut depth = 0usize;
    for (offset, tok) in tokens[open..].iter().enumerate() {
        match tok {
            Token::LParen => depth += 1,
            Token::RParen => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return open + offset + 1;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

pub(crate) fn predicate_columns_from_tokens(tokens: &[Token], scan: &TableScan) -> Vec<ColumnRef> {
    let Some(where_idx) = tokens.iter().position(|t| is_keyword(t, Keyword::WHERE)) else {
        return Vec::new();
    };
    let end = (where_idx + 1..tokens.len())
        .find(|&i| {
            is_keyword(&tokens[i], Keyword::ORDER)
                && tokens.get(i + 1).is_some_and(|t| is_keyword(t, Keyword::BY))
        })
        .unwrap_or(tokens.len());

    let mut columns = Vec::new();
    let mut i = where_idx + 1;
    while i < end {
        let Some((qualifier, name, next)) = read_column(tokens, i) else {
            i += 1;
            continue;
        };
        if next < end && starts_comparison(tokens, next) {
            let column = ColumnRef::new(scan.owner(&qualifier), name);
            if !columns.contains(&column) {
                columns.push(column);
            }
        }
        i = next;
    }
    columns
}

/// Read a possibly-qualified column reference, split into its qualifier
/// parts and the column name
fn read_column(tokens: &[Token], start: usize) -> Option<(Vec<String>, String, usize)> {
    let first = word_at(tokens, start)?;
    if first.quote_style.is_none() && NON_COLUMN_WORDS.contains(&first.value.to_uppercase().as_str())
    {
        return None;
    }

    let mut parts = vec![ident_value(first)];
    let mut i = start + 1;
    while matches!(tokens.get(i), Some(Token::Period)) {
        let Some(word) = word_at(tokens, i + 1) else {
            break;
        };
        parts.push(ident_value(word));
        i += 2;
    }

    if matches!(tokens.get(i), Some(Token::LParen)) {
        return None;
    }
    let name = parts.pop()?;
    Some((parts, name, i))
}

fn starts_comparison(tokens: &[Token], i: usize) -> bool {
    match &tokens[i] {
        Token::Eq | Token::Neq | Token::Lt | Token::Gt | Token::LtEq | Token::GtEq => true,
        tok => match bare_upper(tok).as_deref() {
            Some("IN" | "LIKE" | "ILIKE" | "BETWEEN" | "IS") => true,
            Some("NOT") => tokens
                .get(i + 1)
                .and_then(bare_upper)
                .is_some_and(|w| matches!(w.as_str(), "IN" | "LIKE" | "BETWEEN")),
            _ => false,
        },
    }
}

#[cfg(test)]
#[path = "extractor_test.rs"]
mod tests;
