// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL keywords for completion
//!
//! Keywords are grouped by the clause they may follow. The engine appends the
//! group predicted for the cursor position unless the cursor sits inside a
//! dotted name.

use std::collections::HashSet;

use sql_insight_ir::{Dialect, DialectFamily};

/// SQL keyword with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct SqlKeyword {
    /// The keyword text, upper case
    pub label: String,
    pub description: Option<String>,
    /// Lower sorts first
    pub sort_priority: i32,
}

impl SqlKeyword {
    pub fn new(label: &str, description: Option<&str>, sort_priority: i32) -> Self {
        Self {
            label: label.to_uppercase(),
            description: description.map(|d| d.to_string()),
            sort_priority,
        }
    }

    pub fn simple(label: &str, sort_priority: i32) -> Self {
        Self::new(label, None, sort_priority)
    }
}

/// Ordered keyword group
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    pub keywords: Vec<SqlKeyword>,
}

impl KeywordSet {
    pub fn new(keywords: Vec<SqlKeyword>) -> Self {
        Self { keywords }
    }

    fn from_table(table: &[(&str, &str)]) -> Self {
        let keywords = table
            .iter()
            .enumerate()
            .map(|(i, (label, description))| {
                SqlKeyword::new(label, Some(description), i as i32 + 1)
            })
            .collect();
        Self { keywords }
    }

    fn extend(&mut self, other: KeywordSet) {
        let offset = self.keywords.len() as i32;
        self.keywords
            .extend(other.keywords.into_iter().map(|mut keyword| {
                keyword.sort_priority += offset;
                keyword
            }));
    }

    pub fn labels(&self) -> HashSet<String> {
        self.keywords.iter().map(|k| k.label.clone()).collect()
    }

    /// Keywords not in `exclude`
    pub fn exclude(&self, exclude: &HashSet<String>) -> Vec<SqlKeyword> {
        self.keywords
            .iter()
            .filter(|k| !exclude.contains(&k.label))
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

const STATEMENTS: &[(&str, &str)] = &[
    ("SELECT", "Retrieve data from tables"),
    ("INSERT", "Insert new rows into a table"),
    ("UPDATE", "Modify existing rows in a table"),
    ("DELETE", "Delete rows from a table"),
    ("WITH", "Common table expression"),
    ("CREATE", "Create database objects"),
    ("ALTER", "Modify database objects"),
    ("DROP", "Remove database objects"),
    ("CALL", "Invoke a procedure"),
];

const QUERY_CLAUSES: &[(&str, &str)] = &[
    ("FROM", "Specify tables to query"),
    ("WHERE", "Filter rows"),
    ("GROUP BY", "Group rows by values"),
    ("HAVING", "Filter groups"),
    ("ORDER BY", "Sort result rows"),
    ("LIMIT", "Limit number of rows"),
    ("UNION", "Combine result sets"),
    ("INTERSECT", "Intersection of result sets"),
    ("EXCEPT", "Difference of result sets"),
];

const JOINS: &[(&str, &str)] = &[
    ("JOIN", "Join with another table"),
    ("INNER JOIN", "Inner join"),
    ("LEFT JOIN", "Left outer join"),
    ("RIGHT JOIN", "Right outer join"),
    ("FULL JOIN", "Full outer join"),
    ("CROSS JOIN", "Cross join"),
];

const EXPRESSIONS: &[(&str, &str)] = &[
    ("AND", "Logical AND"),
    ("OR", "Logical OR"),
    ("NOT", "Logical NOT"),
    ("IN", "Value in list"),
    ("EXISTS", "Subquery exists"),
    ("BETWEEN", "Value between range"),
    ("LIKE", "Pattern matching"),
    ("IS NULL", "Check if value is NULL"),
    ("IS NOT NULL", "Check if value is not NULL"),
    ("CASE", "Conditional expression"),
    ("NULL", "NULL value"),
    ("TRUE", "Boolean TRUE"),
    ("FALSE", "Boolean FALSE"),
    ("CAST", "Cast to type"),
];

const OBJECT_TYPES: &[(&str, &str)] = &[
    ("TABLE", "Table"),
    ("VIEW", "View"),
    ("INDEX", "Index"),
    ("SCHEMA", "Schema"),
    ("FUNCTION", "Function"),
    ("PROCEDURE", "Procedure"),
    ("SEQUENCE", "Sequence"),
];

const SORT_DIRECTIONS: &[(&str, &str)] =
    &[("ASC", "Ascending order"), ("DESC", "Descending order")];

/// Keyword groups for one dialect
#[derive(Debug, Clone, Copy)]
pub struct KeywordProvider {
    dialect: Dialect,
}

impl KeywordProvider {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Keywords opening a statement
    pub fn statement_keywords(&self) -> KeywordSet {
        KeywordSet::from_table(STATEMENTS)
    }

    /// Clauses that may follow a select list or FROM item
    pub fn select_clause_keywords(&self) -> KeywordSet {
        let mut set = KeywordSet::from_table(QUERY_CLAUSES);
        match self.dialect.family() {
            DialectFamily::PostgreSQL => set.extend(KeywordSet::from_table(&[
                ("OFFSET", "Skip rows before limiting"),
                ("FETCH", "Fetch specific rows"),
                ("FOR UPDATE", "Lock selected rows"),
            ])),
            DialectFamily::MySQL => set.extend(KeywordSet::from_table(&[
                ("OFFSET", "Skip rows before limiting"),
                ("FOR UPDATE", "Lock selected rows"),
                ("LOCK IN SHARE MODE", "Lock rows in share mode"),
            ])),
            DialectFamily::Standard => set.extend(KeywordSet::from_table(&[(
                "FETCH FIRST",
                "Limit number of rows",
            )])),
        }
        set
    }

    pub fn join_keywords(&self) -> KeywordSet {
        let mut set = KeywordSet::from_table(JOINS);
        if self.dialect.family() == DialectFamily::MySQL {
            set.extend(KeywordSet::from_table(&[("STRAIGHT_JOIN", "Straight join")]));
        }
        set
    }

    pub fn expression_keywords(&self) -> KeywordSet {
        KeywordSet::from_table(EXPRESSIONS)
    }

    /// Object types after CREATE, ALTER or DROP
    pub fn object_type_keywords(&self, verb: &str) -> KeywordSet {
        let mut set = KeywordSet::from_table(OBJECT_TYPES);
        match verb {
            "CREATE" => set.extend(KeywordSet::from_table(&[
                ("OR REPLACE", "Replace if exists"),
                ("TEMPORARY", "Temporary object"),
            ])),
            "DROP" => set.extend(KeywordSet::from_table(&[("IF EXISTS", "Drop if exists")])),
            _ => {}
        }
        set
    }

    pub fn sort_direction_keywords(&self) -> KeywordSet {
        KeywordSet::from_table(SORT_DIRECTIONS)
    }

    /// Keywords valid after an identifier that followed `previous`
    ///
    /// `previous` is the nearest keyword before the cursor, upper case.
    pub fn keywords_after(&self, previous: &str) -> KeywordSet {
        match previous {
            "SELECT" | "DISTINCT" => {
                let mut set = KeywordSet::from_table(&[("AS", "Alias for a result column")]);
                set.extend(self.select_clause_keywords());
                set
            }
            "FROM" | "JOIN" => {
                let mut set = KeywordSet::from_table(&[("AS", "Alias for a table")]);
                set.extend(self.join_keywords());
                set.extend(KeywordSet::from_table(&[
                    ("ON", "Join condition"),
                    ("USING", "Join using columns"),
                ]));
                let exclude = HashSet::from(["FROM".to_string()]);
                set.extend(KeywordSet::new(self.select_clause_keywords().exclude(&exclude)));
                set
            }
            "ON" | "WHERE" | "HAVING" | "AND" | "OR" => {
                let mut set = self.expression_keywords();
                let exclude = HashSet::from(["FROM".to_string(), "WHERE".to_string()]);
                set.extend(KeywordSet::new(self.select_clause_keywords().exclude(&exclude)));
                if previous == "ON" {
                    set.extend(self.join_keywords());
                }
                set
            }
            "BY" => {
                let mut set = self.sort_direction_keywords();
                set.extend(KeywordSet::from_table(&[
                    ("HAVING", "Filter groups"),
                    ("LIMIT", "Limit number of rows"),
                ]));
                set
            }
            "INTO" => KeywordSet::from_table(&[
                ("VALUES", "Insert values"),
                ("SELECT", "Insert from query"),
            ]),
            "UPDATE" => KeywordSet::from_table(&[("SET", "Set column values")]),
            "SET" => KeywordSet::from_table(&[("WHERE", "Filter rows to update")]),
            "CREATE" | "ALTER" | "DROP" => self.object_type_keywords(previous),
            _ => KeywordSet::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has(set: &KeywordSet, label: &str) -> bool {
        set.keywords.iter().any(|k| k.label == label)
    }

    #[test]
    fn test_sql_keyword_creation() {
        let kw = SqlKeyword::new("select", Some("Test description"), 1);
        assert_eq!(kw.label, "SELECT");
        assert_eq!(kw.description, Some("Test description".to_string()));
        assert_eq!(kw.sort_priority, 1);
    }

    #[test]
    fn test_keyword_set_exclude() {
        let set = KeywordSet::new(vec![
            SqlKeyword::simple("SELECT", 1),
            SqlKeyword::simple("FROM", 2),
            SqlKeyword::simple("WHERE", 3),
        ]);
        let filtered = set.exclude(&HashSet::from(["FROM".to_string()]));
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.iter().any(|k| k.label == "FROM"));
        assert_eq!(set.labels().len(), 3);
    }

    #[test]
    fn test_dialect_specific_clauses() {
        let postgres = KeywordProvider::new(Dialect::PostgreSQL).select_clause_keywords();
        assert!(has(&postgres, "FETCH"));
        assert!(!has(&postgres, "LOCK IN SHARE MODE"));

        let mysql = KeywordProvider::new(Dialect::MySQL).select_clause_keywords();
        assert!(has(&mysql, "LOCK IN SHARE MODE"));
        assert!(has(&KeywordProvider::new(Dialect::TiDB).join_keywords(), "STRAIGHT_JOIN"));
    }

    #[test]
    fn test_priorities_stay_ordered_after_extend() {
        let set = KeywordProvider::new(Dialect::PostgreSQL).select_clause_keywords();
        assert!(
            set.keywords
                .windows(2)
                .all(|w| w[0].sort_priority < w[1].sort_priority)
        );
    }

    #[test]
    fn test_keywords_after() {
        let provider = KeywordProvider::new(Dialect::Generic);
        let after_from = provider.keywords_after("FROM");
        assert!(!has(&after_from, "FROM"));
        assert!(has(&after_from, "WHERE"));
        assert!(has(&after_from, "LEFT JOIN"));

        assert!(has(&provider.keywords_after("BY"), "DESC"));
        assert!(has(&provider.keywords_after("DROP"), "IF EXISTS"));
        assert!(provider.keywords_after("VALUES").is_empty());
    }
}
