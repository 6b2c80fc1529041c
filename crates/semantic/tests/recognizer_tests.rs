// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! End-to-end recognition against the standard test catalog

use std::sync::Arc;

use sql_insight_catalog::MetadataProvider;
use sql_insight_ir::{CancellationFlag, Dialect, NeverCancel, NodeKind, ObjectKind, SyntaxTree};
use sql_insight_semantic::{
    AnalyzerSettings, DiagnosticCode, ModelRecognizer, SemanticError, SemanticModel, Severity,
    StatementKind, SymbolClass, SymbolDefinition,
};
use sql_insight_test_utils::{
    CancelAfter, FailingCatalog, MockCatalogBuilder, MockTreeBuilder, SqlAssertions, SqlFixtures,
    TestSqlParser, deep_parenthesized_tree, deep_subquery_tree,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

fn recognizer_with(provider: Arc<dyn MetadataProvider>) -> ModelRecognizer {
    init_tracing();
    ModelRecognizer::new(provider, AnalyzerSettings::new(Dialect::PostgreSQL))
}

fn recognizer() -> ModelRecognizer {
    recognizer_with(MockCatalogBuilder::new().with_standard_schema().build_provider())
}

fn recognize(sql: &str) -> SemanticModel {
    recognizer()
        .recognize(&TestSqlParser::new(), sql, &NeverCancel)
        .unwrap()
}

/// Class of the `nth` occurrence spelled `raw`
fn class_at(model: &SemanticModel, raw: &str, nth: usize) -> SymbolClass {
    let entry = model
        .occurrences(raw)
        .nth(nth)
        .unwrap_or_else(|| panic!("no occurrence #{} of '{}'", nth, raw));
    model.class_of(entry.id)
}

fn class(model: &SemanticModel, raw: &str) -> SymbolClass {
    class_at(model, raw, 0)
}

fn codes(model: &SemanticModel) -> Vec<DiagnosticCode> {
    model.diagnostics().iter().map(|d| d.code).collect()
}

#[test]
fn test_simple_select_binds_columns() {
    let model = recognize(SqlFixtures::simple_select());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "users"), SymbolClass::Table);
    assert_eq!(class(&model, "id"), SymbolClass::Column);

    let name = model.occurrences("name").next().unwrap();
    let object = model.object_of(name.id).unwrap();
    SqlAssertions::assert_object(object, ObjectKind::Column, "public.users.name");

    let content = model.content().unwrap();
    assert_eq!(content.kind, StatementKind::Select);
}

#[test]
fn test_aliased_join_resolves_through_aliases() {
    let model = recognize(SqlFixtures::aliased_join());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "u"), SymbolClass::TableAlias);
    assert_eq!(class(&model, "o"), SymbolClass::TableAlias);

    let alias_use = model.occurrences("u").next().unwrap();
    assert!(matches!(alias_use.definition(), Some(SymbolDefinition::Entry(_))));
    let table = model.object_of(alias_use.id).unwrap();
    SqlAssertions::assert_object(table, ObjectKind::Table, "public.users");

    let total = model.occurrences("total").next().unwrap();
    SqlAssertions::assert_object(
        model.object_of(total.id).unwrap(),
        ObjectKind::Column,
        "public.orders.total",
    );
}

#[test]
fn test_ambiguous_column_across_join() {
    let model = recognize(SqlFixtures::ambiguous_column());
    assert_eq!(class(&model, "id"), SymbolClass::Error);
    let ambiguous: Vec<_> = model
        .diagnostics()
        .iter()
        .filter(|d| d.code == DiagnosticCode::Ambiguous)
        .collect();
    assert_eq!(ambiguous.len(), 1);
    assert!(ambiguous[0].message.starts_with("Ambiguous reference 'id'"));
    // Qualified uses in the join condition stay bound
    assert_eq!(class_at(&model, "id", 1), SymbolClass::Column);
}

#[test]
fn test_undefined_table_reports_not_found() {
    let model = recognize(SqlFixtures::error_undefined_table());
    assert_eq!(class(&model, "unknown_tbl"), SymbolClass::Error);
    assert_eq!(codes(&model), vec![DiagnosticCode::NotFound]);
    assert_eq!(model.diagnostics()[0].severity, Severity::Error);
}

#[test]
fn test_undefined_column_suggests_similar_names() {
    let model = recognize(SqlFixtures::error_undefined_column());
    assert_eq!(class(&model, "nme"), SymbolClass::Error);
    assert_eq!(codes(&model), vec![DiagnosticCode::NotFound]);
    assert!(
        model.diagnostics()[0].message.contains("Did you mean: name"),
        "{}",
        model.diagnostics()[0].message
    );
}

#[test]
fn test_report_unresolved_off_silences_not_found() {
    let recognizer = ModelRecognizer::new(
        MockCatalogBuilder::new().with_standard_schema().build_provider(),
        AnalyzerSettings::new(Dialect::PostgreSQL).with_report_unresolved(false),
    );
    let model = recognizer
        .recognize(&TestSqlParser::new(), SqlFixtures::error_undefined_column(), &NeverCancel)
        .unwrap();
    assert_eq!(class(&model, "nme"), SymbolClass::Error);
    assert!(model.diagnostics().is_empty());
}

#[test]
fn test_ambiguous_table_across_schemas() {
    let provider = MockCatalogBuilder::new()
        .with_standard_schema()
        .with_archive_schema()
        .build_provider();
    let model = recognizer_with(provider)
        .recognize(&TestSqlParser::new(), "SELECT id FROM users", &NeverCancel)
        .unwrap();
    assert_eq!(class(&model, "users"), SymbolClass::Error);
    assert_eq!(codes(&model), vec![DiagnosticCode::Ambiguous]);
    // Columns of an unresolved source are indeterminate, not errors
    assert_eq!(class(&model, "id"), SymbolClass::Unknown);
}

#[test]
fn test_order_by_sees_result_alias() {
    let model = recognize(SqlFixtures::order_by_alias());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let alias_use = model.occurrences("n").nth(1).unwrap();
    assert_eq!(model.class_of(alias_use.id), SymbolClass::ColumnDerived);
    assert!(matches!(alias_use.definition(), Some(SymbolDefinition::Entry(_))));
}

#[test]
fn test_cte_and_derived_table_columns() {
    let model = recognize(SqlFixtures::with_cte_columns());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "a"), SymbolClass::ColumnDerived);
    assert_eq!(class(&model, "b"), SymbolClass::ColumnDerived);

    let model = recognize(SqlFixtures::derived_table());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "d"), SymbolClass::TableAlias);
}

#[test]
fn test_correlated_subquery_sees_outer_alias() {
    let model = recognize(SqlFixtures::correlated_subquery());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    let inner_u = model.occurrences("u").nth(1).unwrap();
    assert_eq!(model.class_of(inner_u.id), SymbolClass::TableAlias);
    assert!(model.rows().queries().count() >= 2);
}

#[test]
fn test_overloaded_function_stays_silent() {
    let model = recognize("SELECT f(1) FROM users");
    let f = model.occurrences("f").next().unwrap();
    assert_eq!(model.class_of(f.id), SymbolClass::Function);
    assert!(model.definition_of(f.id).is_none());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
}

#[test]
fn test_overload_selected_by_argument_type() {
    let model = recognize("SELECT g(1) FROM users");
    let g = model.occurrences("g").next().unwrap();
    assert_eq!(model.class_of(g.id), SymbolClass::Function);
    let object = model.object_of(g.id).unwrap();
    assert_eq!(object.kind, ObjectKind::Function);
}

#[test]
fn test_call_picks_procedure_by_arity() {
    let model = recognize(SqlFixtures::call_procedure());
    let call = model.occurrences("archive_orders").next().unwrap();
    assert_eq!(model.class_of(call.id), SymbolClass::Function);
    let object = model.object_of(call.id).unwrap();
    assert_eq!(object.kind, ObjectKind::Procedure);
    let routine = object.routine.as_ref().unwrap();
    assert_eq!(routine.parameters.len(), 2);
    assert_eq!(model.content().unwrap().kind, StatementKind::Call);
}

#[test]
fn test_unknown_function_is_error_unless_tolerated() {
    let model = recognize("SELECT nosuch(id) FROM users");
    assert_eq!(class(&model, "nosuch"), SymbolClass::Error);

    let tolerant = ModelRecognizer::new(
        MockCatalogBuilder::new().with_standard_schema().build_provider(),
        AnalyzerSettings::new(Dialect::PostgreSQL).with_error_tolerant_functions(true),
    );
    let model = tolerant
        .recognize(&TestSqlParser::new(), "SELECT nosuch(id) FROM users", &NeverCancel)
        .unwrap();
    assert_eq!(class(&model, "nosuch"), SymbolClass::Function);
}

#[test]
fn test_insert_target_columns() {
    let model = recognize(SqlFixtures::simple_insert());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "users"), SymbolClass::Table);
    assert_eq!(class(&model, "name"), SymbolClass::Column);

    let model = recognize("INSERT INTO users (id, email) VALUES (1, 'x')");
    assert_eq!(class(&model, "email"), SymbolClass::Error);
    assert_eq!(codes(&model), vec![DiagnosticCode::NotFound]);
    assert!(model.diagnostics()[0].message.contains("not found in"));
}

#[test]
fn test_update_and_delete() {
    let model = recognize(SqlFixtures::simple_update());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "name"), SymbolClass::Column);
    assert_eq!(class(&model, "id"), SymbolClass::Column);

    let model = recognize(SqlFixtures::simple_delete());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "status"), SymbolClass::Column);
}

#[test]
fn test_create_table_declares_columns() {
    let model = recognize(SqlFixtures::create_table());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "audit"), SymbolClass::Table);
    assert_eq!(class(&model, "note"), SymbolClass::Column);
}

#[test]
fn test_alter_table_rename_column() {
    let model = recognize(SqlFixtures::alter_table_rename());
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());
    assert_eq!(class(&model, "users"), SymbolClass::Table);
    assert_eq!(class(&model, "name"), SymbolClass::Column);
    assert_eq!(class(&model, "full_name"), SymbolClass::Column);
}

#[test]
fn test_drop_if_exists_is_quiet() {
    let model = recognize("DROP TABLE IF EXISTS nope");
    assert!(model.diagnostics().is_empty(), "{:?}", model.diagnostics());

    let model = recognize("DROP TABLE nope");
    assert_eq!(codes(&model), vec![DiagnosticCode::NotFound]);
}

#[test]
fn test_drop_overloaded_function_is_ambiguous() {
    let model = recognize("DROP FUNCTION public.f");
    assert_eq!(class(&model, "f"), SymbolClass::Error);
    assert_eq!(codes(&model), vec![DiagnosticCode::Ambiguous]);
    assert_ne!(class(&model, "public"), SymbolClass::Error);
}

#[test]
fn test_unsupported_statement_falls_back_to_heuristics() {
    let first = recognize(SqlFixtures::unsupported_statement());
    assert!(first.content().is_none());
    assert_eq!(codes(&first), vec![DiagnosticCode::Unrecognized]);
    assert_eq!(first.diagnostics()[0].severity, Severity::Warning);

    let second = recognize(SqlFixtures::unsupported_statement());
    assert_eq!(first.semantic_tokens(), second.semantic_tokens());
}

const MAINTENANCE: &str =
    "VACUUM public.users u (u.name, users.id, \"Mixed\", 'note', missing.col)";

/// Tree of a statement with no modeled production
fn maintenance_tree() -> SyntaxTree {
    MockTreeBuilder::new(MAINTENANCE)
        .start(NodeKind::Root)
        .start(NodeKind::Unknown)
        .token(NodeKind::Keyword, "VACUUM")
        .start(NodeKind::TableName)
        .token(NodeKind::Identifier, "public")
        .token(NodeKind::Period, ".")
        .token(NodeKind::Identifier, "users")
        .finish()
        .start(NodeKind::CorrelationName)
        .token(NodeKind::Identifier, "u")
        .finish()
        .token(NodeKind::LeftParen, "(")
        .start(NodeKind::ColumnReference)
        .token(NodeKind::Identifier, "u")
        .token(NodeKind::Period, ".")
        .token(NodeKind::Identifier, "name")
        .finish()
        .token(NodeKind::Comma, ",")
        .start(NodeKind::ColumnReference)
        .token(NodeKind::Identifier, "users")
        .token(NodeKind::Period, ".")
        .token(NodeKind::Identifier, "id")
        .finish()
        .token(NodeKind::Comma, ",")
        .start(NodeKind::ColumnName)
        .token(NodeKind::QuotedIdentifier, "\"Mixed\"")
        .finish()
        .token(NodeKind::Comma, ",")
        .start(NodeKind::ColumnName)
        .token(NodeKind::Identifier, "'note'")
        .finish()
        .token(NodeKind::Comma, ",")
        .start(NodeKind::ColumnReference)
        .token(NodeKind::Identifier, "missing")
        .token(NodeKind::Period, ".")
        .token(NodeKind::Identifier, "col")
        .finish()
        .token(NodeKind::RightParen, ")")
        .finish()
        .finish()
        .build()
}

fn recognize_maintenance() -> SemanticModel {
    recognizer()
        .recognize_tree(maintenance_tree(), &NeverCancel)
        .unwrap()
}

#[test]
fn test_heuristics_classify_table_and_correlation_name() {
    let model = recognize_maintenance();
    assert!(model.content().is_none());
    assert_eq!(codes(&model), vec![DiagnosticCode::Unrecognized]);
    assert_eq!(class(&model, "public"), SymbolClass::Schema);
    assert_eq!(class_at(&model, "users", 0), SymbolClass::Table);
    assert_eq!(class_at(&model, "u", 0), SymbolClass::TableAlias);
}

#[test]
fn test_heuristics_split_dotted_columns() {
    let model = recognize_maintenance();
    assert_eq!(class_at(&model, "u", 1), SymbolClass::TableAlias);
    assert_eq!(class(&model, "name"), SymbolClass::Column);
    assert_eq!(class_at(&model, "users", 1), SymbolClass::Table);
    assert_eq!(class(&model, "id"), SymbolClass::Column);
    assert_eq!(class(&model, "missing"), SymbolClass::Column);
    assert_eq!(class(&model, "col"), SymbolClass::Column);
}

#[test]
fn test_heuristics_keep_literals_and_quoted_names_apart() {
    let model = recognize_maintenance();
    assert_eq!(class(&model, "'note'"), SymbolClass::String);
    assert_eq!(class(&model, "\"Mixed\""), SymbolClass::Quoted);
}

#[test]
fn test_heuristics_never_consult_the_catalog() {
    let failing: Arc<dyn MetadataProvider> = Arc::new(FailingCatalog::default());
    let offline = recognizer_with(failing)
        .recognize_tree(maintenance_tree(), &NeverCancel)
        .unwrap();
    let online = recognize_maintenance();
    assert_eq!(offline.semantic_tokens(), online.semantic_tokens());
    assert_eq!(online.semantic_tokens(), recognize_maintenance().semantic_tokens());
    assert!(
        online
            .symbols()
            .entries()
            .all(|entry| online.object_of(entry.id).is_none())
    );
}

#[test]
fn test_blank_input_yields_empty_model() {
    let model = recognize("   ");
    assert!(model.content().is_none());
    assert!(model.symbols().is_empty());
    assert!(model.diagnostics().is_empty());
}

#[test]
fn test_deep_subqueries_hit_depth_limit() {
    let model = recognizer()
        .recognize_tree(deep_subquery_tree(5000), &NeverCancel)
        .unwrap();
    assert!(model.content().is_none());
    assert_eq!(codes(&model), vec![DiagnosticCode::DepthLimit]);
}

#[test]
fn test_deep_parentheses_do_not_overflow() {
    let model = recognizer()
        .recognize_tree(deep_parenthesized_tree(5000), &NeverCancel)
        .unwrap();
    assert!(model.content().is_some());
    assert_eq!(class(&model, "id"), SymbolClass::Column);
}

#[test]
fn test_canceled_before_start() {
    let flag = CancellationFlag::new();
    flag.cancel();
    let result = recognizer().recognize(&TestSqlParser::new(), SqlFixtures::simple_select(), &flag);
    assert!(matches!(result, Err(SemanticError::Canceled)));
}

#[test]
fn test_canceled_midway() {
    let result = recognizer().recognize(
        &TestSqlParser::new(),
        SqlFixtures::aliased_join(),
        &CancelAfter::new(1),
    );
    assert!(matches!(result, Err(SemanticError::Canceled)));
}

#[test]
fn test_metadata_failure_degrades_to_warning() {
    let model = recognizer_with(Arc::new(FailingCatalog::default()))
        .recognize(&TestSqlParser::new(), SqlFixtures::simple_select(), &NeverCancel)
        .unwrap();
    assert!(codes(&model).contains(&DiagnosticCode::MetadataAccess));
    assert!(model.diagnostics().iter().all(|d| d.severity != Severity::Error));
    assert_eq!(class(&model, "id"), SymbolClass::Unknown);
}

#[test]
fn test_semantic_tokens_are_sorted() {
    let model = recognize(SqlFixtures::with_cte());
    let tokens = model.semantic_tokens();
    assert!(!tokens.is_empty());
    assert!(tokens.windows(2).all(|w| w[0].range.start <= w[1].range.start));
}

#[test]
fn test_symbol_at_offset() {
    let sql = SqlFixtures::aliased_join();
    let model = recognize(sql);
    let offset = sql.find("total").unwrap() + 2;
    let entry = model.symbol_at(offset).unwrap();
    assert_eq!(entry.raw_name, "total");
}
