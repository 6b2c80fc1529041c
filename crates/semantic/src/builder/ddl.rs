// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! CREATE TABLE, ALTER TABLE and DROP.

use sql_insight_ir::{NodeKind, ObjectKindSet, SyntaxNode};

use crate::builder::keywords;
use crate::context::AnalysisContext;
use crate::error::{SemanticError, SemanticResult};
use crate::lexical::ScopeKind;
use crate::origin::SymbolOrigin;
use crate::qualified_name::QualifiedName;
use crate::rows::{QueryScopeId, ResultColumn, RowsSourceId, RowsSourceKind};
use crate::symbol::SymbolClass;

impl AnalysisContext<'_> {
    /// `CREATE TABLE [IF NOT EXISTS] name (col type, ...)`
    ///
    /// The table does not exist yet: its name and columns are declarations and
    /// never produce not-found diagnostics.
    pub(crate) fn build_create_table(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> SemanticResult<(QueryScopeId, Option<RowsSourceId>)> {
        let query = self.rows.add_query(None, false, node.range());
        self.in_scope(ScopeKind::Statement, node.range(), Some(query), |ctx| {
            let Some(name_node) = node.first_child_of_kind(NodeKind::TableName) else {
                return Err(SemanticError::malformed("CREATE TABLE", "missing table name"));
            };
            let Some(name) = ctx.collect_name(name_node) else {
                return Err(SemanticError::malformed("CREATE TABLE", "missing table name"));
            };
            ctx.declare_table_name(&name, query)?;

            let canonical = name.last().map(|entry| ctx.symbols.entry(entry).name.clone());
            let target = ctx
                .rows
                .add_source(query, RowsSourceKind::Unresolved, canonical, name_node.range());
            let mut columns = Vec::new();
            for definition in node.children_of_kind(NodeKind::ColumnDefinition) {
                if let Some(column) = ctx.declare_column(definition) {
                    columns.push(column);
                }
            }
            let source = ctx.rows.source_mut(target);
            source.columns = columns;
            source.columns_known = true;
            Ok((query, Some(target)))
        })
    }

    /// `ALTER TABLE name action, ...`
    pub(crate) fn build_alter_table(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> SemanticResult<(QueryScopeId, Option<RowsSourceId>)> {
        let query = self.rows.add_query(None, false, node.range());
        self.in_scope(ScopeKind::Statement, node.range(), Some(query), |ctx| {
            let Some(name_node) = node.first_child_of_kind(NodeKind::TableName) else {
                return Err(SemanticError::malformed("ALTER TABLE", "missing table name"));
            };
            let target = ctx.build_named_source(name_node, None, query, name_node.range())?;
            ctx.rows.attach_source(query, target);

            for action in node.children_of_kind(NodeKind::AlterAction) {
                ctx.check_canceled()?;
                let verbs = keywords(action);
                if let Some(definition) = action.first_child_of_kind(NodeKind::ColumnDefinition) {
                    // ADD [COLUMN] definition
                    if let Some(column) = ctx.declare_column(definition) {
                        ctx.rows.source_mut(target).columns.push(column);
                    }
                    continue;
                }
                let mut names = action
                    .children_skip_errors()
                    .into_iter()
                    .filter(|c| c.kind() == NodeKind::ColumnName || c.kind().is_identifier());
                if let Some(existing) = names.next().and_then(|n| ctx.collect_name(n)) {
                    ctx.resolve_target_column(&existing, target);
                }
                if verbs.iter().any(|v| v == "RENAME") {
                    // RENAME COLUMN old TO new
                    if let Some(renamed) = names.next().and_then(|n| ctx.collect_name(n)) {
                        for entry in renamed.entries() {
                            ctx.classify(entry, SymbolClass::Column);
                        }
                    }
                }
            }
            Ok((query, Some(target)))
        })
    }

    /// `DROP TABLE|VIEW|FUNCTION|PROCEDURE|SEQUENCE|SCHEMA [IF EXISTS] name, ...`
    pub(crate) fn build_drop(&mut self, node: SyntaxNode<'_>) -> SemanticResult<QueryScopeId> {
        let query = self.rows.add_query(None, false, node.range());
        let verbs = keywords(node);
        let allowed = verbs.iter().skip(1).find_map(|verb| match verb.as_str() {
            "TABLE" | "VIEW" => Some(ObjectKindSet::ROWS_SOURCES),
            "FUNCTION" | "PROCEDURE" | "ROUTINE" => Some(ObjectKindSet::ROUTINES),
            "SEQUENCE" => Some(ObjectKindSet::SEQUENCES),
            "SCHEMA" | "DATABASE" => Some(ObjectKindSet::CONTAINERS),
            _ => None,
        });
        let Some(allowed) = allowed else {
            let object = verbs.get(1).cloned().unwrap_or_default();
            return Err(SemanticError::UnsupportedStatement(format!("DROP {}", object)));
        };
        let if_exists = verbs.iter().any(|v| v == "IF") && verbs.iter().any(|v| v == "EXISTS");

        self.in_scope(ScopeKind::Statement, node.range(), Some(query), |ctx| {
            let previous = ctx.quiet;
            ctx.quiet = previous || if_exists;
            let result = ctx.resolve_dropped(node, query, allowed);
            ctx.quiet = previous;
            result
        })?;
        Ok(query)
    }

    fn resolve_dropped(
        &mut self,
        node: SyntaxNode<'_>,
        query: QueryScopeId,
        allowed: ObjectKindSet,
    ) -> SemanticResult<()> {
        let targets = node
            .children_skip_errors()
            .into_iter()
            .filter(|c| matches!(c.kind(), NodeKind::TableName | NodeKind::QualifiedName));
        for target in targets {
            let Some(name) = self.collect_name(target) else {
                continue;
            };
            let origin = SymbolOrigin::ContextScope { query, allowed };
            self.perform_partial_resolution(
                &name,
                Some(origin.clone()),
                allowed,
                SymbolClass::Error,
            )?;
            if let Some(first) = name.first() {
                self.set_origin(first, origin);
            }
        }
        Ok(())
    }

    /// Classify a name that declares a new table
    ///
    /// Leading parts are resolved as containers when the catalog knows them.
    fn declare_table_name(
        &mut self,
        name: &QualifiedName,
        query: QueryScopeId,
    ) -> SemanticResult<()> {
        let Some(last) = name.last() else {
            return Ok(());
        };
        self.classify(last, SymbolClass::Table);
        if name.len() < 2 {
            return Ok(());
        }
        let container = name.trim_end();
        let previous = self.quiet;
        self.quiet = true;
        let resolution = self.perform_partial_resolution(
            &container,
            Some(SymbolOrigin::ContextScope {
                query,
                allowed: ObjectKindSet::CONTAINERS,
            }),
            ObjectKindSet::CONTAINERS,
            SymbolClass::Schema,
        );
        self.quiet = previous;
        resolution.map(|_| ())
    }

    /// `name type [constraints]` declares a column
    fn declare_column(&mut self, definition: SyntaxNode<'_>) -> Option<ResultColumn> {
        let name_node = definition
            .children_skip_errors()
            .into_iter()
            .find(|c| c.kind().is_identifier() || c.kind() == NodeKind::ColumnName)?;
        let entry = self.collect_name(name_node)?.first()?;
        self.classify(entry, SymbolClass::Column);
        Some(ResultColumn::new(self.symbols.entry(entry).name.clone()).with_entry(entry))
    }
}
