// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Testing utilities for SQL Insight
//!
//! This crate provides common testing components including:
//! - Mock catalogs and failure/cancellation doubles
//! - A tolerant SQL parser producing syntax trees for tests
//! - Syntax tree builders, including pathologically deep trees
//! - SQL fixtures, cursor markers and assertions

pub mod assertions;
pub mod fixtures;
pub mod mock_catalog;
pub mod mock_tree;
pub mod sql_parser;

// Re-exports for convenience
pub use assertions::SqlAssertions;
pub use fixtures::{CURSOR_MARKER, SqlFixtures, parse_cursor};
pub use mock_catalog::{CancelAfter, FailingCatalog, MockCatalogBuilder, OfflineCatalog};
pub use mock_tree::{
    MockNode, MockTreeBuilder, build_tree, deep_parenthesized_tree, deep_subquery_tree,
};
pub use sql_parser::TestSqlParser;
