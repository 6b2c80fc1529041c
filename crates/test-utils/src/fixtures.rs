// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Test fixtures and sample SQL queries
//!
//! Every query is valid against the standard schema of
//! [`MockCatalogBuilder`](crate::MockCatalogBuilder) unless its name says
//! otherwise.

/// Cursor marker used in completion fixtures
pub const CURSOR_MARKER: char = '|';

/// Split `text` at the cursor marker
///
/// Returns the text without the marker and the byte offset where it stood.
/// Without a marker the cursor is placed at the end.
pub fn parse_cursor(text: &str) -> (String, usize) {
    match text.find(CURSOR_MARKER) {
        Some(offset) => {
            let mut clean = String::with_capacity(text.len() - 1);
            clean.push_str(&text[..offset]);
            clean.push_str(&text[offset + 1..]);
            (clean, offset)
        }
        None => (text.to_string(), text.len()),
    }
}

/// Sample SQL queries for testing
pub struct SqlFixtures;

impl SqlFixtures {
    // ===== Basic SELECT queries =====

    /// Simple SELECT with column list
    pub const fn simple_select() -> &'static str {
        "SELECT id, name FROM users"
    }

    /// SELECT with WHERE clause
    pub const fn select_with_where() -> &'static str {
        "SELECT id, name FROM users WHERE name LIKE 'a%'"
    }

    /// ORDER BY referring to a result alias
    pub const fn order_by_alias() -> &'static str {
        "SELECT name AS n FROM users ORDER BY n"
    }

    // ===== JOIN queries =====

    /// Aliased join with a foreign-key condition
    pub const fn aliased_join() -> &'static str {
        "SELECT u.name, o.total FROM users u JOIN orders o ON o.user_id = u.id"
    }

    /// Join where `id` exists on both sides
    pub const fn ambiguous_column() -> &'static str {
        "SELECT id FROM users u JOIN orders o ON o.user_id = u.id"
    }

    // ===== Aggregation queries =====

    /// GROUP BY with HAVING
    pub const fn group_by_having() -> &'static str {
        "SELECT user_id, sum(total) AS spent FROM orders GROUP BY user_id HAVING sum(total) > 1000"
    }

    // ===== Subqueries =====

    /// Correlated scalar subquery
    pub const fn correlated_subquery() -> &'static str {
        "SELECT u.name, (SELECT count(*) FROM orders o WHERE o.user_id = u.id) AS cnt FROM users u"
    }

    /// Derived table with an alias
    pub const fn derived_table() -> &'static str {
        "SELECT d.uid FROM (SELECT user_id AS uid FROM orders) d"
    }

    // ===== CTE (Common Table Expressions) =====

    /// CTE joined back to a table
    pub const fn with_cte() -> &'static str {
        "WITH recent AS (SELECT user_id, total FROM orders) \
         SELECT u.name, r.total FROM users u JOIN recent r ON r.user_id = u.id"
    }

    /// CTE with an explicit column list
    pub const fn with_cte_columns() -> &'static str {
        "WITH t (a, b) AS (SELECT id, name FROM users) SELECT a, b FROM t"
    }

    // ===== INSERT/UPDATE/DELETE =====

    pub const fn simple_insert() -> &'static str {
        "INSERT INTO users (id, name) VALUES (1, 'Test User')"
    }

    pub const fn simple_update() -> &'static str {
        "UPDATE users SET name = 'Updated Name' WHERE id = 1"
    }

    pub const fn simple_delete() -> &'static str {
        "DELETE FROM orders WHERE status = 'cancelled'"
    }

    // ===== DDL =====

    pub const fn create_table() -> &'static str {
        "CREATE TABLE audit (id integer, note varchar(200), PRIMARY KEY (id))"
    }

    pub const fn alter_table_rename() -> &'static str {
        "ALTER TABLE users RENAME COLUMN name TO full_name"
    }

    pub const fn drop_table() -> &'static str {
        "DROP TABLE IF EXISTS products"
    }

    // ===== Routines =====

    /// Procedure call picking the two-argument overload
    pub const fn call_procedure() -> &'static str {
        "CALL archive_orders(30, true)"
    }

    // ===== Error cases =====

    /// Query with undefined table
    pub const fn error_undefined_table() -> &'static str {
        "SELECT * FROM unknown_tbl"
    }

    /// Query with undefined column
    pub const fn error_undefined_column() -> &'static str {
        "SELECT nme FROM users"
    }

    /// Statement the recognizer does not model
    pub const fn unsupported_statement() -> &'static str {
        "GRANT SELECT ON users TO bob"
    }
}
