// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! End-to-end completion against the standard test catalog

use std::sync::Arc;

use sql_insight_catalog::MetadataProvider;
use sql_insight_context::render::{semantic_token_legend, to_lsp_semantic_tokens};
use sql_insight_context::{
    AliasPolicy, CompletionEngine, CompletionError, CompletionItemKind, CompletionSet,
    CompletionSettings, Expectation, KeywordCase, SyntaxInspection,
};
use sql_insight_ir::{CancellationFlag, Dialect, NeverCancel};
use sql_insight_semantic::{AnalyzerSettings, ModelRecognizer};
use sql_insight_test_utils::{
    FailingCatalog, MockCatalogBuilder, SqlAssertions, TestSqlParser, parse_cursor,
};
use tracing_subscriber::EnvFilter;

fn provider() -> Arc<dyn MetadataProvider> {
    MockCatalogBuilder::new().with_standard_schema().build_provider()
}

/// Log to the test writer, filtered by `RUST_LOG`
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn recognizer(provider: Arc<dyn MetadataProvider>) -> ModelRecognizer {
    init_tracing();
    ModelRecognizer::new(provider, AnalyzerSettings::new(Dialect::PostgreSQL))
}

fn complete_with(
    provider: Arc<dyn MetadataProvider>,
    settings: CompletionSettings,
    text: &str,
) -> Vec<CompletionSet> {
    let (sql, offset) = parse_cursor(text);
    let engine = CompletionEngine::new(provider.clone(), settings);
    engine
        .complete(&recognizer(provider), &TestSqlParser::new(), &sql, offset, &NeverCancel)
        .unwrap()
}

fn complete(text: &str) -> Vec<CompletionSet> {
    complete_with(provider(), CompletionSettings::default(), text)
}

fn all_labels(sets: &[CompletionSet]) -> Vec<String> {
    sets.iter()
        .flat_map(|set| set.items.iter().map(|item| item.label.clone()))
        .collect()
}

#[test]
fn test_columns_after_alias_period() {
    let sets = complete("SELECT u.| FROM users u");
    assert_eq!(sets.len(), 1);
    let set = &sets[0];
    SqlAssertions::assert_same_names(&set.labels(), &["id", "name"]);
    assert_eq!((set.replace_start, set.replace_len), (9, 0));
    assert!(set.items.iter().all(|item| item.score > 0));
    assert!(set.items.iter().all(|item| item.kind == CompletionItemKind::Column));
}

#[test]
fn test_partial_column_after_alias() {
    let sets = complete("SELECT u.na| FROM users u");
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].labels(), vec!["name"]);
    assert_eq!((sets[0].replace_start, sets[0].replace_len), (9, 2));
}

#[test]
fn test_table_names_in_from_clause() {
    let labels = all_labels(&complete("SELECT * FROM us|"));
    SqlAssertions::assert_contains_all(&labels, &["users"]);
    SqlAssertions::assert_contains_none(&labels, &["orders", "products", "id"]);
}

#[test]
fn test_schema_children_exclude_routines_and_sequences() {
    let labels = all_labels(&complete("SELECT * FROM public.|"));
    SqlAssertions::assert_contains_all(&labels, &["users", "orders", "products", "big_orders"]);
    SqlAssertions::assert_contains_none(&labels, &["f", "g", "order_seq", "address", "SELECT"]);
}

#[test]
fn test_view_proposal_is_marked_as_view() {
    let sets = complete("SELECT * FROM public.big|");
    let item = sets
        .iter()
        .flat_map(|set| set.items.iter())
        .find(|item| item.label == "big_orders")
        .unwrap();
    assert_eq!(item.kind, CompletionItemKind::View);
    assert_eq!(item.detail.as_deref(), Some("public.big_orders [VIEW]"));
}

#[test]
fn test_join_condition_from_foreign_key_leads() {
    let sets = complete("SELECT * FROM users u JOIN orders o ON |");
    let first = &sets[0].items[0];
    assert_eq!(first.label, "o.user_id = u.id");
    assert_eq!(first.kind, CompletionItemKind::JoinCondition);
    SqlAssertions::assert_relative_order(&sets[0].labels(), "o.user_id = u.id", "user_id");
}

#[test]
fn test_join_conditions_can_be_disabled() {
    let mut settings = CompletionSettings::default();
    settings.propose_join_conditions = false;
    let sets = complete_with(provider(), settings, "SELECT * FROM users u JOIN orders o ON |");
    assert!(
        sets.iter()
            .flat_map(|set| set.items.iter())
            .all(|item| item.kind != CompletionItemKind::JoinCondition)
    );
}

fn tuple_item(sets: &[CompletionSet]) -> (String, usize, usize) {
    sets.iter()
        .find_map(|set| {
            set.items
                .iter()
                .find(|item| item.kind == CompletionItemKind::Tuple)
                .map(|item| (item.label.clone(), set.replace_start, set.replace_len))
        })
        .unwrap()
}

#[test]
fn test_qualified_star_expands_to_source_columns() {
    let (label, start, len) = tuple_item(&complete("SELECT u.*| FROM users u"));
    assert_eq!(label, "id, u.name");
    assert_eq!((start, len), (9, 1));
}

#[test]
fn test_bare_star_across_join_qualifies_every_column() {
    let sets = complete("SELECT *| FROM users u JOIN orders o ON o.user_id = u.id");
    let (label, start, len) = tuple_item(&sets);
    assert_eq!(label, "u.id, u.name, o.id, o.user_id, o.total, o.status, o.shipping");
    assert_eq!((start, len), (7, 1));
}

#[test]
fn test_composite_members_after_column() {
    let sets = complete("SELECT o.shipping.ci| FROM orders o");
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0].labels(), vec!["city"]);
    assert_eq!(sets[0].items[0].kind, CompletionItemKind::Field);
}

#[test]
fn test_source_qualifier_adds_catalog_tables_when_connected() {
    let labels = all_labels(&complete("SELECT u|.* FROM users u"));
    SqlAssertions::assert_same_names(&labels, &["u", "users"]);

    let offline = MockCatalogBuilder::new()
        .with_standard_schema()
        .build_offline_provider();
    let labels = all_labels(&complete_with(
        offline,
        CompletionSettings::default(),
        "SELECT u|.* FROM users u",
    ));
    SqlAssertions::assert_same_names(&labels, &["u"]);
}

#[test]
fn test_first_letter_alias_is_inserted() {
    let settings = CompletionSettings::default().with_table_alias(AliasPolicy::FirstLetter);
    let sets = complete_with(provider(), settings, "SELECT * FROM us|");
    let users = sets
        .iter()
        .flat_map(|set| set.items.iter())
        .find(|item| item.label == "users")
        .unwrap();
    assert_eq!(users.insert_text, "users u");
}

#[test]
fn test_search_inside_names() {
    let labels = all_labels(&complete("SELECT * FROM ord|"));
    SqlAssertions::assert_contains_all(&labels, &["orders"]);
    SqlAssertions::assert_contains_none(&labels, &["big_orders"]);

    let settings = CompletionSettings::default().with_search_inside_names(true);
    let sets = complete_with(provider(), settings, "SELECT * FROM ord|");
    let labels = all_labels(&sets);
    SqlAssertions::assert_contains_all(&labels, &["orders", "big_orders"]);
    SqlAssertions::assert_relative_order(&labels, "orders", "big_orders");
}

#[test]
fn test_cte_names_are_proposed() {
    let labels = all_labels(&complete(
        "WITH recent AS (SELECT id FROM orders) SELECT * FROM re|",
    ));
    SqlAssertions::assert_contains_all(&labels, &["recent"]);
}

#[test]
fn test_statement_keywords_in_empty_document() {
    let sets = complete("|");
    let labels = all_labels(&sets);
    SqlAssertions::assert_contains_all(&labels, &["SELECT", "INSERT", "UPDATE", "DELETE"]);
    assert!(
        sets.iter()
            .flat_map(|set| set.items.iter())
            .all(|item| item.kind == CompletionItemKind::Keyword)
    );
}

#[test]
fn test_keyword_case_follows_settings() {
    let settings = CompletionSettings::default().with_keyword_case(KeywordCase::Lower);
    let labels = all_labels(&complete_with(provider(), settings, "|"));
    SqlAssertions::assert_contains_all(&labels, &["select", "insert"]);
    SqlAssertions::assert_contains_none(&labels, &["SELECT"]);
}

#[test]
fn test_canceled_request_fails() {
    let (sql, offset) = parse_cursor("SELECT u.| FROM users u");
    let flag = CancellationFlag::new();
    flag.cancel();
    let engine = CompletionEngine::new(provider(), CompletionSettings::default());
    let result =
        engine.complete(&recognizer(provider()), &TestSqlParser::new(), &sql, offset, &flag);
    let error = result.unwrap_err();
    assert!(matches!(error, CompletionError::Canceled));
    assert!(error.should_return_empty());
}

#[test]
fn test_offset_outside_text_is_rejected() {
    let engine = CompletionEngine::new(provider(), CompletionSettings::default());
    let result = engine.complete(
        &recognizer(provider()),
        &TestSqlParser::new(),
        "SELECT 1",
        100,
        &NeverCancel,
    );
    assert!(matches!(result, Err(CompletionError::InvalidOffset { offset: 100, len: 8 })));
}

#[test]
fn test_failing_catalog_yields_no_catalog_items() {
    let failing: Arc<dyn MetadataProvider> = Arc::new(FailingCatalog::default());
    let sets = complete_with(failing, CompletionSettings::default(), "SELECT * FROM us|");
    assert!(
        sets.iter()
            .flat_map(|set| set.items.iter())
            .all(|item| item.object.is_none())
    );
}

#[test]
fn test_prepared_context_can_be_reused_at_another_offset() {
    let sql = "SELECT u.na FROM users u";
    let model = recognizer(provider())
        .recognize(&TestSqlParser::new(), sql, &NeverCancel)
        .unwrap();
    let engine = CompletionEngine::new(provider(), CompletionSettings::default());
    let inspection = SyntaxInspection::from_text(sql, 11, Dialect::PostgreSQL);
    let context = engine.prepare(11, &model, inspection, &NeverCancel).unwrap();
    assert_eq!(context.filter(), "na");
    assert_eq!(context.replace_range().start, 9);

    let sets = context.prepare_proposal(9).unwrap();
    SqlAssertions::assert_same_names(&sets[0].labels(), &["id", "name"]);
}

#[test]
fn test_explicit_inspection_is_respected() {
    let sql = "SELECT * FROM ";
    let model = recognizer(provider())
        .recognize(&TestSqlParser::new(), sql, &NeverCancel)
        .unwrap();
    let engine = CompletionEngine::new(provider(), CompletionSettings::default());
    let inspection = SyntaxInspection::new(Expectation::TableReference, Vec::new());
    let context = engine.prepare(sql.len(), &model, inspection, &NeverCancel).unwrap();
    let labels = all_labels(&context.prepare_proposal(sql.len()).unwrap());
    SqlAssertions::assert_contains_all(&labels, &["users", "orders", "public"]);
}

#[test]
fn test_semantic_tokens_are_delta_encoded() {
    let sql = "SELECT u.name\nFROM users u";
    let model = recognizer(provider())
        .recognize(&TestSqlParser::new(), sql, &NeverCancel)
        .unwrap();
    let tokens = to_lsp_semantic_tokens(&model);
    assert_eq!(tokens.data.len(), model.semantic_tokens().len());
    assert!(tokens.data.iter().any(|token| token.delta_line == 1));
    let legend = semantic_token_legend();
    assert!(
        tokens
            .data
            .iter()
            .all(|token| (token.token_type as usize) < legend.token_types.len())
    );
}
