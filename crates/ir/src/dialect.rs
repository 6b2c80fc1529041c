// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Dialect Support
//!
//! This module describes the lexical rules of each supported SQL dialect that
//! matter to name resolution: identifier case-folding, quoting characters,
//! reserved words, built-in function names and global pseudo-variables.
//!
//! ## Dialect Families
//!
//! - **MySQL Family**: MySQL, TiDB, MariaDB
//!   - Unquoted identifiers keep their spelling, backticks (and `"`) quote identifiers
//! - **PostgreSQL Family**: PostgreSQL, CockroachDB
//!   - Unquoted identifiers fold to lower case, `"` quotes identifiers
//! - **Standard Family**: Oracle and the generic ANSI dialect
//!   - Unquoted identifiers fold to upper case, `"` quotes identifiers
//!
//! Resolution correctness depends on reproducing the case-folding exactly: a name
//! is looked up in the catalog through its canonical form only.

use crate::metadata::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL (5.7, 8.0)
    MySQL,
    /// PostgreSQL (12, 14, 15+)
    #[serde(alias = "postgres")]
    PostgreSQL,
    /// TiDB
    TiDB,
    /// MariaDB
    MariaDB,
    /// CockroachDB
    CockroachDB,
    /// Oracle
    Oracle,
    /// ANSI SQL
    #[default]
    Generic,
}

/// Dialect family groupings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialectFamily {
    MySQL,
    PostgreSQL,
    Standard,
}

impl Dialect {
    /// Returns the family this dialect belongs to
    pub fn family(&self) -> DialectFamily {
        match self {
            Dialect::MySQL | Dialect::TiDB | Dialect::MariaDB => DialectFamily::MySQL,
            Dialect::PostgreSQL | Dialect::CockroachDB => DialectFamily::PostgreSQL,
            Dialect::Oracle | Dialect::Generic => DialectFamily::Standard,
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a dialect folds unquoted identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentifierCase {
    Upper,
    Lower,
    Preserve,
}

/// Identifier after dialect canonicalization
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalName {
    /// Name used for metadata lookup
    pub name: String,
    /// Whether the raw spelling was a quoted identifier
    pub quoted: bool,
}

/// Built-in pseudo-column or session variable (`CURRENT_DATE`, `SYSDATE`, ...)
#[derive(Debug, Clone, Copy)]
pub struct GlobalVariable {
    pub name: &'static str,
    pub data_type: fn() -> DataType,
    pub description: &'static str,
}

/// Lexical rules of a dialect consumed by resolution and completion
pub trait SqlDialect: Send + Sync {
    fn name(&self) -> &'static str;

    fn identifier_case(&self) -> IdentifierCase;

    /// Open/close character pairs quoting identifiers
    fn identifier_quotes(&self) -> &'static [(char, char)];

    /// Character quoting string literals
    fn string_quote(&self) -> char {
        '\''
    }

    /// Upper-case reserved words
    fn reserved_words(&self) -> &'static [&'static str];

    fn builtin_functions(&self) -> &'static [&'static str];

    fn global_variables(&self) -> &'static [GlobalVariable];

    fn is_reserved(&self, word: &str) -> bool {
        let upper = word.to_ascii_uppercase();
        self.reserved_words().contains(&upper.as_str())
    }

    fn is_builtin_function(&self, name: &str) -> bool {
        self.builtin_functions()
            .iter()
            .any(|f| f.eq_ignore_ascii_case(name))
    }

    fn global_variable(&self, name: &str) -> Option<&'static GlobalVariable> {
        self.global_variables()
            .iter()
            .find(|v| v.name.eq_ignore_ascii_case(name))
    }

    /// Whether `raw` is wrapped in identifier quotes
    fn is_quoted_identifier(&self, raw: &str) -> bool {
        let mut chars = raw.chars();
        match (chars.next(), chars.next_back()) {
            (Some(open), Some(close)) => self
                .identifier_quotes()
                .iter()
                .any(|&(o, c)| o == open && c == close),
            _ => false,
        }
    }

    /// Whether `raw` is a string literal spelled with this dialect's string quote
    fn is_string_literal(&self, raw: &str) -> bool {
        let quote = self.string_quote();
        raw.len() >= 2 && raw.starts_with(quote) && raw.ends_with(quote)
    }

    /// Fold an unquoted identifier, unquote a quoted one
    fn canonicalize_identifier(&self, raw: &str) -> CanonicalName {
        if self.is_quoted_identifier(raw) {
            let mut chars = raw.chars();
            let close = chars.next_back().unwrap_or('"');
            chars.next();
            let inner: String = chars.collect();
            let doubled: String = [close, close].iter().collect();
            return CanonicalName {
                name: inner.replace(&doubled, &close.to_string()),
                quoted: true,
            };
        }
        let name = match self.identifier_case() {
            IdentifierCase::Upper => raw.to_uppercase(),
            IdentifierCase::Lower => raw.to_lowercase(),
            IdentifierCase::Preserve => raw.to_string(),
        };
        CanonicalName {
            name,
            quoted: false,
        }
    }

    /// Whether a canonical name survives unquoted
    fn needs_quoting(&self, name: &str) -> bool {
        let mut chars = name.chars();
        let first_ok = chars
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_');
        let rest_ok = chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$');
        if !first_ok || !rest_ok || self.is_reserved(name) {
            return true;
        }
        match self.identifier_case() {
            IdentifierCase::Upper => name != name.to_uppercase(),
            IdentifierCase::Lower => name != name.to_lowercase(),
            IdentifierCase::Preserve => false,
        }
    }

    /// Spelling of a canonical name that canonicalizes back to itself
    fn quote_if_needed(&self, name: &str) -> String {
        if !self.needs_quoting(name) {
            return name.to_string();
        }
        let (open, close) = self.identifier_quotes().first().copied().unwrap_or(('"', '"'));
        let doubled: String = [close, close].iter().collect();
        format!("{open}{}{close}", name.replace(close, &doubled))
    }
}

const MYSQL_QUOTES: &[(char, char)] = &[('`', '`'), ('"', '"')];
const STANDARD_QUOTES: &[(char, char)] = &[('"', '"')];

const COMMON_RESERVED: &[&str] = &[
    "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CALL", "CASE", "CHECK",
    "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
    "ELSE", "END", "EXCEPT", "EXISTS", "FALSE", "FOR", "FOREIGN", "FROM", "FULL", "GRANT",
    "GROUP", "HAVING", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT",
    "LIKE", "LIMIT", "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES",
    "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TRUE", "UNION", "UNIQUE", "UPDATE", "USING",
    "VALUES", "WHEN", "WHERE", "WITH",
];

const MYSQL_RESERVED: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "BETWEEN", "BY", "CALL", "CASE", "CHECK", "COLUMN",
    "CONSTRAINT", "CREATE", "CROSS", "DATABASE", "DEFAULT", "DELETE", "DESC", "DISTINCT",
    "DROP", "ELSE", "EXISTS", "FALSE", "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING",
    "IN", "INNER", "INSERT", "INTERVAL", "INTO", "IS", "JOIN", "KEY", "LEFT", "LIKE", "LIMIT",
    "NOT", "NULL", "ON", "OR", "ORDER", "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SCHEMA",
    "SELECT", "SET", "STRAIGHT_JOIN", "TABLE", "THEN", "TRUE", "UNION", "UNIQUE", "UPDATE",
    "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

const POSTGRES_RESERVED: &[&str] = &[
    "ALL", "ANALYSE", "ANALYZE", "AND", "ANY", "ARRAY", "AS", "ASC", "BOTH", "CASE", "CAST",
    "CHECK", "COLUMN", "CONSTRAINT", "CREATE", "CURRENT_DATE", "CURRENT_TIME",
    "CURRENT_TIMESTAMP", "CURRENT_USER", "DEFAULT", "DESC", "DISTINCT", "DO", "ELSE", "END",
    "EXCEPT", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM", "GRANT", "GROUP", "HAVING", "IN",
    "INTERSECT", "INTO", "LATERAL", "LEADING", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "ONLY",
    "OR", "ORDER", "PRIMARY", "REFERENCES", "RETURNING", "SELECT", "SOME", "TABLE", "THEN",
    "TO", "TRUE", "UNION", "UNIQUE", "USING", "WHEN", "WHERE", "WINDOW", "WITH",
];

const ORACLE_RESERVED: &[&str] = &[
    "ACCESS", "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CHECK",
    "COLUMN", "CONNECT", "CREATE", "CURRENT", "DEFAULT", "DELETE", "DESC", "DISTINCT", "DROP",
    "ELSE", "EXISTS", "FOR", "FROM", "GRANT", "GROUP", "HAVING", "IN", "INDEX", "INSERT",
    "INTERSECT", "INTO", "IS", "LEVEL", "LIKE", "MINUS", "NOT", "NULL", "OF", "ON", "OR",
    "ORDER", "PRIOR", "ROWID", "ROWNUM", "SELECT", "SET", "START", "SYSDATE", "TABLE", "THEN",
    "TO", "UNION", "UNIQUE", "UPDATE", "USER", "VALUES", "VIEW", "WHERE", "WITH",
];

const COMMON_FUNCTIONS: &[&str] = &[
    "ABS", "AVG", "CAST", "COALESCE", "CONCAT", "COUNT", "LENGTH", "LOWER", "MAX", "MIN",
    "NULLIF", "ROUND", "SUBSTRING", "SUM", "TRIM", "UPPER",
];

const MYSQL_FUNCTIONS: &[&str] = &[
    "ABS", "AVG", "CAST", "COALESCE", "CONCAT", "COUNT", "DATE_FORMAT", "GROUP_CONCAT", "IF",
    "IFNULL", "LENGTH", "LOWER", "MAX", "MIN", "NOW", "NULLIF", "ROUND", "SUBSTRING", "SUM",
    "TRIM", "UPPER",
];

const POSTGRES_FUNCTIONS: &[&str] = &[
    "ABS", "ARRAY_AGG", "AVG", "CAST", "COALESCE", "CONCAT", "COUNT", "DATE_TRUNC", "LENGTH",
    "LOWER", "MAX", "MIN", "NOW", "NULLIF", "ROUND", "STRING_AGG", "SUBSTRING", "SUM", "TRIM",
    "UPPER",
];

const ORACLE_FUNCTIONS: &[&str] = &[
    "ABS", "AVG", "COALESCE", "CONCAT", "COUNT", "DECODE", "LENGTH", "LOWER", "MAX", "MIN",
    "NVL", "NVL2", "ROUND", "SUBSTR", "SUM", "TO_CHAR", "TO_DATE", "TRIM", "UPPER",
];

const COMMON_GLOBALS: &[GlobalVariable] = &[
    GlobalVariable {
        name: "CURRENT_DATE",
        data_type: || DataType::Date,
        description: "Current date",
    },
    GlobalVariable {
        name: "CURRENT_TIMESTAMP",
        data_type: || DataType::Timestamp,
        description: "Current date and time",
    },
    GlobalVariable {
        name: "CURRENT_USER",
        data_type: || DataType::Varchar(None),
        description: "Current session user",
    },
];

const ORACLE_GLOBALS: &[GlobalVariable] = &[
    GlobalVariable {
        name: "SYSDATE",
        data_type: || DataType::DateTime,
        description: "Current database server date",
    },
    GlobalVariable {
        name: "SYSTIMESTAMP",
        data_type: || DataType::Timestamp,
        description: "Current database server timestamp",
    },
    GlobalVariable {
        name: "ROWNUM",
        data_type: || DataType::BigInt,
        description: "Row number in the result set",
    },
    GlobalVariable {
        name: "USER",
        data_type: || DataType::Varchar(None),
        description: "Current session user",
    },
];

impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        match self {
            Dialect::MySQL => "MySQL",
            Dialect::PostgreSQL => "PostgreSQL",
            Dialect::TiDB => "TiDB",
            Dialect::MariaDB => "MariaDB",
            Dialect::CockroachDB => "CockroachDB",
            Dialect::Oracle => "Oracle",
            Dialect::Generic => "Generic",
        }
    }

    fn identifier_case(&self) -> IdentifierCase {
        match self.family() {
            DialectFamily::MySQL => IdentifierCase::Preserve,
            DialectFamily::PostgreSQL => IdentifierCase::Lower,
            DialectFamily::Standard => IdentifierCase::Upper,
        }
    }

    fn identifier_quotes(&self) -> &'static [(char, char)] {
        match self.family() {
            DialectFamily::MySQL => MYSQL_QUOTES,
            _ => STANDARD_QUOTES,
        }
    }

    fn reserved_words(&self) -> &'static [&'static str] {
        match self {
            Dialect::MySQL | Dialect::TiDB | Dialect::MariaDB => MYSQL_RESERVED,
            Dialect::PostgreSQL | Dialect::CockroachDB => POSTGRES_RESERVED,
            Dialect::Oracle => ORACLE_RESERVED,
            Dialect::Generic => COMMON_RESERVED,
        }
    }

    fn builtin_functions(&self) -> &'static [&'static str] {
        match self.family() {
            DialectFamily::MySQL => MYSQL_FUNCTIONS,
            DialectFamily::PostgreSQL => POSTGRES_FUNCTIONS,
            DialectFamily::Standard if *self == Dialect::Oracle => ORACLE_FUNCTIONS,
            DialectFamily::Standard => COMMON_FUNCTIONS,
        }
    }

    fn global_variables(&self) -> &'static [GlobalVariable] {
        match self {
            Dialect::Oracle => ORACLE_GLOBALS,
            _ => COMMON_GLOBALS,
        }
    }
}
