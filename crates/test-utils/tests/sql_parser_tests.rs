// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Fixture queries through the test parser

use sql_insight_ir::NodeKind;
use sql_insight_test_utils::{SqlFixtures, TestSqlParser};

fn top_level_kinds(sql: &str) -> Vec<NodeKind> {
    let tree = TestSqlParser::new().parse_text(sql);
    tree.root().unwrap().children().map(|n| n.kind()).collect()
}

#[test]
fn test_fixtures_parse_without_recovery() {
    let cases = [
        (SqlFixtures::simple_select(), NodeKind::SelectStatement),
        (SqlFixtures::select_with_where(), NodeKind::SelectStatement),
        (SqlFixtures::order_by_alias(), NodeKind::SelectStatement),
        (SqlFixtures::aliased_join(), NodeKind::SelectStatement),
        (SqlFixtures::group_by_having(), NodeKind::SelectStatement),
        (SqlFixtures::correlated_subquery(), NodeKind::SelectStatement),
        (SqlFixtures::derived_table(), NodeKind::SelectStatement),
        (SqlFixtures::with_cte(), NodeKind::SelectStatement),
        (SqlFixtures::with_cte_columns(), NodeKind::SelectStatement),
        (SqlFixtures::simple_insert(), NodeKind::InsertStatement),
        (SqlFixtures::simple_update(), NodeKind::UpdateStatement),
        (SqlFixtures::simple_delete(), NodeKind::DeleteStatement),
        (SqlFixtures::create_table(), NodeKind::CreateTableStatement),
        (SqlFixtures::alter_table_rename(), NodeKind::AlterTableStatement),
        (SqlFixtures::drop_table(), NodeKind::DropStatement),
        (SqlFixtures::call_procedure(), NodeKind::CallStatement),
    ];
    for (sql, expected) in cases {
        assert_eq!(top_level_kinds(sql), vec![expected], "{}", sql);
    }
}

#[test]
fn test_no_error_nodes_in_valid_queries() {
    for sql in [
        SqlFixtures::aliased_join(),
        SqlFixtures::correlated_subquery(),
        SqlFixtures::with_cte(),
    ] {
        let tree = TestSqlParser::new().parse_text(sql);
        let errors = tree
            .root()
            .unwrap()
            .descendants()
            .filter(|n| n.is_error())
            .count();
        assert_eq!(errors, 0, "{}", sql);
    }
}

#[test]
fn test_trailing_semicolon() {
    assert_eq!(
        top_level_kinds("SELECT 1;"),
        vec![NodeKind::SelectStatement, NodeKind::Semicolon]
    );
}

#[test]
fn test_unsupported_statement_is_recovered() {
    assert_eq!(top_level_kinds(SqlFixtures::unsupported_statement()), vec![NodeKind::Error]);
}

#[test]
fn test_ranges_cover_source() {
    let sql = SqlFixtures::aliased_join();
    let tree = TestSqlParser::new().parse_text(sql);
    let statement = tree.root().unwrap().children().next().unwrap();
    assert_eq!(statement.text(), sql);
}
