// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Custom assertions for resolution and completion tests

use sql_insight_ir::{DbObject, ObjectKind};

/// Custom assertion helpers for SQL testing
pub struct SqlAssertions;

impl SqlAssertions {
    /// Assert that `actual` holds exactly `expected`, in any order
    pub fn assert_same_names<S: AsRef<str>>(actual: &[S], expected: &[&str]) {
        let mut actual: Vec<&str> = actual.iter().map(|s| s.as_ref()).collect();
        let mut expected: Vec<&str> = expected.to_vec();
        actual.sort_unstable();
        expected.sort_unstable();
        assert_eq!(actual, expected, "Name sets differ");
    }

    /// Assert that every name in `expected` occurs in `actual`
    pub fn assert_contains_all<S: AsRef<str>>(actual: &[S], expected: &[&str]) {
        for name in expected {
            assert!(
                actual.iter().any(|a| a.as_ref() == *name),
                "Expected '{}' in {:?}",
                name,
                actual.iter().map(|a| a.as_ref()).collect::<Vec<_>>()
            );
        }
    }

    /// Assert that no name in `unexpected` occurs in `actual`
    pub fn assert_contains_none<S: AsRef<str>>(actual: &[S], unexpected: &[&str]) {
        for name in unexpected {
            assert!(
                !actual.iter().any(|a| a.as_ref() == *name),
                "Did not expect '{}'",
                name
            );
        }
    }

    /// Assert that `before` is listed ahead of `after`
    pub fn assert_relative_order<S: AsRef<str>>(actual: &[S], before: &str, after: &str) {
        let position = |name: &str| {
            actual
                .iter()
                .position(|a| a.as_ref() == name)
                .unwrap_or_else(|| panic!("'{}' not listed", name))
        };
        assert!(
            position(before) < position(after),
            "Expected '{}' before '{}'",
            before,
            after
        );
    }

    /// Assert an object's kind and qualified name
    pub fn assert_object(object: &DbObject, kind: ObjectKind, qualified_name: &str) {
        assert_eq!(object.kind, kind, "Object kind mismatch for {}", object.qualified_name());
        assert_eq!(object.qualified_name(), qualified_name, "Qualified name mismatch");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_same_names_ignores_order() {
        SqlAssertions::assert_same_names(&["name", "id"], &["id", "name"]);
    }

    #[test]
    #[should_panic(expected = "Name sets differ")]
    fn test_same_names_rejects_extra() {
        SqlAssertions::assert_same_names(&["id", "name", "email"], &["id", "name"]);
    }

    #[test]
    fn test_relative_order() {
        let labels = vec!["id".to_string(), "name".to_string()];
        SqlAssertions::assert_relative_order(&labels, "id", "name");
    }

    #[test]
    #[should_panic(expected = "not listed")]
    fn test_relative_order_requires_both() {
        SqlAssertions::assert_relative_order(&["id"], "id", "name");
    }

    #[test]
    fn test_assert_object() {
        let schema = Arc::new(DbObject::new("public", ObjectKind::Schema));
        let table = DbObject::new("users", ObjectKind::Table).with_parent(schema);
        SqlAssertions::assert_object(&table, ObjectKind::Table, "public.users");
        SqlAssertions::assert_contains_none(&["id"], &["users"]);
        SqlAssertions::assert_contains_all(&["id", "name"], &["name"]);
    }
}
