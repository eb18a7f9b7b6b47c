//! Tokenizing wrapper around sqlparser's tokenizer

use crate::error::{SqlError, SqlResult};
use sqlparser::dialect::GenericDialect;
use sqlparser::keywords::Keyword;
use sqlparser::tokenizer::{Token, Tokenizer, Word};

/// Tokenize SQL text, dropping whitespace and comments.
///
/// Telemetry views truncate long statements, often in the middle of a string
/// literal or comment. When the tokenizer rejects the text, the trailing
/// unbalanced quote or comment is closed and tokenizing is retried once.
pub fn significant_tokens(sql: &str) -> SqlResult<Vec<Token>> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(SqlError::EmptySql);
    }

    let dialect = GenericDialect {};
    match Tokenizer::new(&dialect, sql).tokenize() {
        Ok(tokens) => Ok(strip_insignificant(tokens)),
        Err(first) => {
            let repaired = close_truncated_text(sql);
            if repaired == sql {
                return Err(SqlError::TokenizeError(first.to_string()));
            }
            Tokenizer::new(&dialect, &repaired)
                .tokenize()
                .map(strip_insignificant)
                .map_err(|_| SqlError::TokenizeError(first.to_string()))
        }
    }
}

fn strip_insignificant(tokens: Vec<Token>) -> Vec<Token> {
    tokens
        .into_iter()
        .filter(|t| !matches!(t, Token::Whitespace(_) | Token::EOF))
        .collect()
}

fn close_truncated_text(sql: &str) -> String {
    let mut repaired = sql.to_string();
    if let Some(open) = sql.rfind("/*") {
        if sql.rfind("*/").map_or(true, |close| close < open) {
            repaired.push_str(" */");
            return repaired;
        }
    }
    for quote in ['\'', '"'] {
        if sql.chars().filter(|c| *c == quote).count() % 2 == 1 {
            repaired.push(quote);
        }
    }
    repaired
}

/// Borrow the word at `idx`, if that token is a word.
pub(crate) fn word_at(tokens: &[Token], idx: usize) -> Option<&Word> {
    match tokens.get(idx) {
        Some(Token::Word(w)) => Some(w),
        _ => None,
    }
}

/// True when the token is the given keyword.
pub(crate) fn is_keyword(token: &Token, keyword: Keyword) -> bool {
    matches!(token, Token::Word(w) if w.keyword == keyword && w.quote_style.is_none())
}

/// Identifier value with Oracle-style folding: unquoted names are upper-cased,
/// quoted names keep their exact spelling.
pub(crate) fn ident_value(word: &Word) -> String {
    if word.quote_style.is_some() {
        word.value.clone()
    } else {
        word.value.to_uppercase()
    }
}

/// Upper-cased value of an unquoted word, for matching against word lists.
pub(crate) fn bare_upper(token: &Token) -> Option<String> {
    match token {
        Token::Word(w) if w.quote_style.is_none() => Some(w.value.to_uppercase()),
        _ => None,
    }
}
