// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Syntax inspection
//!
//! What the grammar allows at the cursor, independently of the semantic
//! model. A grammar-driven caller builds a [`SyntaxInspection`] directly;
//! otherwise [`SyntaxInspection::from_text`] predicts it from the nearest
//! keyword before the cursor. Strings, comments and the word being typed
//! (with its qualifiers) are skipped.

use sql_insight_ir::{Dialect, ObjectKindSet, SqlDialect};
use tracing::trace;

use crate::keywords::{KeywordProvider, KeywordSet};

/// Kind of name the grammar expects at the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    StatementStart,
    TableReference,
    ColumnReference,
    JoinCondition,
    /// Name of an existing object of the given kinds (DROP FUNCTION, CALL)
    ObjectName(ObjectKindSet),
    /// Only keywords can follow
    Keyword,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxInspection {
    pub expectation: Expectation,
    /// Keywords valid at the cursor, upper case
    pub keywords: Vec<String>,
    /// Nearest keyword before the cursor, upper case
    pub previous_keyword: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'s> {
    Word(&'s str),
    Quoted,
    Punct(char),
}

impl SyntaxInspection {
    pub fn new(expectation: Expectation, keywords: Vec<String>) -> Self {
        Self {
            expectation,
            keywords,
            previous_keyword: None,
        }
    }

    /// Inspection that predicts nothing
    pub fn unknown() -> Self {
        Self::new(Expectation::Unknown, Vec::new())
    }

    /// Predict the expectation at `offset` from the text before it
    pub fn from_text(source: &str, offset: usize, dialect: Dialect) -> Self {
        let mut end = offset.min(source.len());
        while !source.is_char_boundary(end) {
            end -= 1;
        }
        let before = &source[..end];
        let mut tokens = lex(before);

        let typing = before
            .chars()
            .next_back()
            .is_some_and(|c| is_word_char(c) || c == '"' || c == '`');
        if typing {
            tokens.pop();
        }
        while tokens.last() == Some(&Token::Punct('.')) {
            tokens.pop();
            if matches!(tokens.last(), Some(Token::Word(_) | Token::Quoted)) {
                tokens.pop();
            }
        }

        let keywords = KeywordProvider::new(dialect);
        let keyword_at = |index: usize| -> Option<String> {
            match tokens.get(index) {
                Some(Token::Word(word)) if is_keyword(word, &dialect) => Some(word.to_uppercase()),
                _ => None,
            }
        };
        let previous_keyword = (0..tokens.len()).rev().find_map(keyword_at);
        let clause = (0..tokens.len())
            .rev()
            .filter_map(keyword_at)
            .find(|k| CLAUSES.contains(&k.as_str()));

        let labels = |set: KeywordSet| -> Vec<String> {
            set.keywords.into_iter().map(|k| k.label).collect()
        };

        let last = tokens.len().checked_sub(1);
        let (expectation, words) = match last.map(|i| (i, tokens[i])) {
            None => (Expectation::StatementStart, labels(keywords.statement_keywords())),
            Some((_, Token::Punct(';'))) => {
                (Expectation::StatementStart, labels(keywords.statement_keywords()))
            }
            Some((_, Token::Punct(','))) => match clause.as_deref() {
                Some("FROM") | Some("JOIN") => (Expectation::TableReference, Vec::new()),
                _ => (Expectation::ColumnReference, Vec::new()),
            },
            Some((i, Token::Punct('*')))
                if i == 0
                    || matches!(tokens[i - 1], Token::Punct(','))
                    || keyword_at(i - 1).is_some() =>
            {
                let after = clause.as_deref().unwrap_or("SELECT");
                (Expectation::Keyword, labels(keywords.keywords_after(after)))
            }
            Some((_, Token::Punct(c))) if "=<>!+-*/%|(".contains(c) => {
                (Expectation::ColumnReference, labels(keywords.expression_keywords()))
            }
            Some((_, Token::Punct(')'))) | Some((_, Token::Quoted)) => {
                let after = clause.as_deref().unwrap_or("");
                (Expectation::Keyword, labels(keywords.keywords_after(after)))
            }
            Some((_, Token::Punct(_))) => (Expectation::Unknown, Vec::new()),
            Some((i, Token::Word(word))) => {
                let upper = word.to_uppercase();
                if keyword_at(i).is_none() {
                    let after = clause.as_deref().unwrap_or("");
                    (Expectation::Keyword, labels(keywords.keywords_after(after)))
                } else {
                    let before = i.checked_sub(1).and_then(keyword_at);
                    expect_after_keyword(&upper, before.as_deref(), &keywords)
                }
            }
        };

        trace!("Text inspection at {}: {:?} after {:?}", offset, expectation, previous_keyword);
        Self {
            expectation,
            keywords: words,
            previous_keyword,
        }
    }
}

/// Keywords that open a clause and decide what a comma continues
const CLAUSES: &[&str] = &[
    "SELECT", "FROM", "JOIN", "ON", "WHERE", "BY", "HAVING", "SET", "INTO", "VALUES", "UPDATE",
];

/// Words treated as keywords even where a dialect does not reserve them
const SOFT_KEYWORDS: &[&str] = &[
    "ALTER", "AND", "ASC", "BETWEEN", "BY", "CALL", "CROSS", "DELETE", "DESC", "DROP", "EXISTS",
    "FULL", "FUNCTION", "INNER", "INSERT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT", "ON",
    "OR", "PROCEDURE", "RIGHT", "SCHEMA", "SEQUENCE", "SET", "TABLE", "UPDATE", "VALUES", "VIEW",
];

fn expect_after_keyword(
    keyword: &str,
    before: Option<&str>,
    keywords: &KeywordProvider,
) -> (Expectation, Vec<String>) {
    let labels = |set: KeywordSet| -> Vec<String> {
        set.keywords.into_iter().map(|k| k.label).collect()
    };
    let defining = before == Some("CREATE");
    match keyword {
        "FROM" | "JOIN" | "INTO" | "UPDATE" => (Expectation::TableReference, Vec::new()),
        "TABLE" if defining => (Expectation::Unknown, Vec::new()),
        "TABLE" => (Expectation::TableReference, Vec::new()),
        "ON" => (Expectation::JoinCondition, labels(keywords.expression_keywords())),
        "SELECT" => {
            let mut words = vec!["DISTINCT".to_string()];
            words.extend(labels(keywords.expression_keywords()));
            (Expectation::ColumnReference, words)
        }
        "DISTINCT" | "WHERE" | "HAVING" | "AND" | "OR" | "NOT" | "SET" | "WHEN" | "THEN"
        | "ELSE" | "CASE" | "BY" => {
            (Expectation::ColumnReference, labels(keywords.expression_keywords()))
        }
        "FUNCTION" | "PROCEDURE" if !defining => {
            (Expectation::ObjectName(ObjectKindSet::ROUTINES), Vec::new())
        }
        "CALL" => (Expectation::ObjectName(ObjectKindSet::ROUTINES), Vec::new()),
        "SEQUENCE" if !defining => {
            (Expectation::ObjectName(ObjectKindSet::SEQUENCES), Vec::new())
        }
        "VIEW" if !defining => (Expectation::ObjectName(ObjectKindSet::ROWS_SOURCES), Vec::new()),
        "SCHEMA" if !defining => (Expectation::ObjectName(ObjectKindSet::CONTAINERS), Vec::new()),
        "CREATE" | "ALTER" | "DROP" => {
            (Expectation::Keyword, labels(keywords.object_type_keywords(keyword)))
        }
        "WITH" | "AS" | "FUNCTION" | "PROCEDURE" | "SEQUENCE" | "VIEW" | "SCHEMA" => {
            (Expectation::Unknown, Vec::new())
        }
        other => (Expectation::Keyword, labels(keywords.keywords_after(other))),
    }
}

fn is_keyword(word: &str, dialect: &Dialect) -> bool {
    let upper = word.to_uppercase();
    dialect.is_reserved(&upper) || SOFT_KEYWORDS.contains(&upper.as_str())
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Split `text` into words, quoted names and punctuation
fn lex(text: &str) -> Vec<Token<'_>> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let (start, c) = chars[i];
        let next = chars.get(i + 1).map(|(_, c)| *c);
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && next == Some('-') {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len()
                && !(chars[i].1 == '*' && chars.get(i + 1).map(|(_, c)| *c) == Some('/'))
            {
                i += 1;
            }
            i += 2;
        } else if c == '\'' || c == '"' || c == '`' {
            i += 1;
            while i < chars.len() {
                if chars[i].1 == c {
                    // Doubled quote stays inside
                    if chars.get(i + 1).map(|(_, q)| *q) == Some(c) {
                        i += 2;
                        continue;
                    }
                    break;
                }
                i += 1;
            }
            i += 1;
            if c != '\'' {
                tokens.push(Token::Quoted);
            }
        } else if is_word_char(c) {
            let mut end = i;
            while end < chars.len() && is_word_char(chars[end].1) {
                end += 1;
            }
            let stop = chars.get(end).map(|(o, _)| *o).unwrap_or(text.len());
            tokens.push(Token::Word(&text[start..stop]));
            i = end;
        } else {
            tokens.push(Token::Punct(c));
            i += 1;
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inspect(text: &str) -> SyntaxInspection {
        SyntaxInspection::from_text(text, text.len(), Dialect::PostgreSQL)
    }

    #[test]
    fn test_statement_start() {
        let inspection = inspect("");
        assert_eq!(inspection.expectation, Expectation::StatementStart);
        assert!(inspection.keywords.contains(&"SELECT".to_string()));

        assert_eq!(inspect("SEL").expectation, Expectation::StatementStart);
        assert_eq!(inspect("SELECT 1; ").expectation, Expectation::StatementStart);
    }

    #[test]
    fn test_table_and_column_positions() {
        assert_eq!(inspect("SELECT * FROM ").expectation, Expectation::TableReference);
        assert_eq!(inspect("SELECT * FROM us").expectation, Expectation::TableReference);
        assert_eq!(inspect("SELECT * FROM public.").expectation, Expectation::TableReference);
        assert_eq!(inspect("SELECT * FROM users, ").expectation, Expectation::TableReference);
        assert_eq!(inspect("SELECT ").expectation, Expectation::ColumnReference);
        assert_eq!(inspect("SELECT id, ").expectation, Expectation::ColumnReference);
        assert_eq!(inspect("SELECT u.na").expectation, Expectation::ColumnReference);
        assert_eq!(
            inspect("SELECT * FROM t WHERE id = ").expectation,
            Expectation::ColumnReference
        );
        assert_eq!(
            inspect("SELECT * FROM users u JOIN orders o ON ").expectation,
            Expectation::JoinCondition
        );
    }

    #[test]
    fn test_keyword_positions() {
        let inspection = inspect("SELECT id FROM users ");
        assert_eq!(inspection.expectation, Expectation::Keyword);
        assert!(inspection.keywords.contains(&"WHERE".to_string()));
        assert_eq!(inspection.previous_keyword.as_deref(), Some("FROM"));

        let inspection = inspect("DROP ");
        assert_eq!(inspection.expectation, Expectation::Keyword);
        assert!(inspection.keywords.contains(&"TABLE".to_string()));
    }

    #[test]
    fn test_object_name_positions() {
        assert_eq!(
            inspect("DROP FUNCTION ").expectation,
            Expectation::ObjectName(ObjectKindSet::ROUTINES)
        );
        assert_eq!(
            inspect("CALL arch").expectation,
            Expectation::ObjectName(ObjectKindSet::ROUTINES)
        );
        assert_eq!(inspect("CREATE TABLE ").expectation, Expectation::Unknown);
    }

    #[test]
    fn test_strings_and_comments_are_skipped() {
        assert_eq!(
            inspect("SELECT * FROM users WHERE name = 'from ' AND ").expectation,
            Expectation::ColumnReference
        );
        assert_eq!(
            inspect("SELECT * -- from\nFROM ").expectation,
            Expectation::TableReference
        );
        assert_eq!(inspect("/* select */ ").expectation, Expectation::StatementStart);
    }

    #[test]
    fn test_offset_inside_character_is_clamped() {
        let text = "SELECT 'é' FROM ";
        let inside = text.find('é').unwrap() + 1;
        let inspection = SyntaxInspection::from_text(text, inside, Dialect::Generic);
        assert_eq!(inspection.expectation, Expectation::ColumnReference);
    }
}
