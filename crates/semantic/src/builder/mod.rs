// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Statement model builders
//!
//! One builder per outermost grammar production. Every builder registers the
//! identifiers it meets, resolves names against the rows context of its query
//! scopes and returns a [`StatementContent`] summary of what it built.

mod call;
mod ddl;
mod dml;
mod select;

use serde::Serialize;
use sql_insight_ir::{NodeKind, ObjectKindSet, SyntaxNode, TextRange};
use tracing::debug;

use crate::context::AnalysisContext;
use crate::error::{SemanticError, SemanticResult};
use crate::origin::SymbolOrigin;
use crate::rows::{QueryScopeId, ResultColumn, RowsSourceId, RowsSourceKind};
use crate::symbol::{SymbolClass, SymbolDefinition};

/// Statement production a model was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    CreateTable,
    AlterTable,
    Drop,
    Call,
}

impl StatementKind {
    /// Kind handled by a builder, if any
    pub fn from_node(kind: NodeKind) -> Option<StatementKind> {
        Some(match kind {
            NodeKind::SelectStatement | NodeKind::SetOperation => StatementKind::Select,
            NodeKind::InsertStatement => StatementKind::Insert,
            NodeKind::UpdateStatement => StatementKind::Update,
            NodeKind::DeleteStatement => StatementKind::Delete,
            NodeKind::CreateTableStatement => StatementKind::CreateTable,
            NodeKind::AlterTableStatement => StatementKind::AlterTable,
            NodeKind::DropStatement => StatementKind::Drop,
            NodeKind::CallStatement => StatementKind::Call,
            _ => return None,
        })
    }
}

/// Typed summary of the statement a model was built for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatementContent {
    pub kind: StatementKind,
    pub range: TextRange,
    /// Outermost query scope
    pub query: QueryScopeId,
    /// Rows source modified by a DML or DDL statement
    pub target: Option<RowsSourceId>,
}

impl AnalysisContext<'_> {
    /// Build the model of one statement node
    pub(crate) fn build_statement(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> SemanticResult<StatementContent> {
        let Some(kind) = StatementKind::from_node(node.kind()) else {
            return Err(SemanticError::UnsupportedStatement(node.kind().to_string()));
        };
        debug!("Building {:?} model for {}", kind, node.range());

        let (query, target) = match kind {
            StatementKind::Select => (self.build_query(node, None, false)?, None),
            StatementKind::Insert => self.build_insert(node)?,
            StatementKind::Update => self.build_update(node)?,
            StatementKind::Delete => self.build_delete(node)?,
            StatementKind::CreateTable => self.build_create_table(node)?,
            StatementKind::AlterTable => self.build_alter_table(node)?,
            StatementKind::Drop => (self.build_drop(node)?, None),
            StatementKind::Call => (self.build_call(node)?, None),
        };
        Ok(StatementContent {
            kind,
            range: node.range(),
            query,
            target,
        })
    }

    /// Build the query nested inside `node` (scalar subquery, derived table,
    /// CTE body)
    ///
    /// A node without a query inside yields an empty scope so that callers
    /// always get a scope to attach to.
    pub(crate) fn build_subquery(
        &mut self,
        node: SyntaxNode<'_>,
        parent: Option<QueryScopeId>,
        correlated: bool,
    ) -> SemanticResult<QueryScopeId> {
        let inner = node
            .children_skip_errors()
            .into_iter()
            .find(|c| matches!(c.kind(), NodeKind::SelectStatement | NodeKind::SetOperation));
        match inner {
            Some(inner) => self.build_query(inner, parent, correlated),
            None => Ok(self.rows.add_query(parent, correlated, node.range())),
        }
    }

    /// Register a table-like source named by `name_node` in `query`
    ///
    /// CTEs visible from `query` win over catalog objects. The source is not
    /// attached to the query's FROM list.
    pub(crate) fn build_named_source(
        &mut self,
        name_node: SyntaxNode<'_>,
        correlation: Option<SyntaxNode<'_>>,
        query: QueryScopeId,
        range: TextRange,
    ) -> SemanticResult<RowsSourceId> {
        let Some(name) = self.collect_name(name_node) else {
            return Err(SemanticError::malformed("table reference", "missing table name"));
        };
        let canonical = name
            .last()
            .map(|entry| self.symbols.entry(entry).name.clone());

        let cte = match (name.len(), &canonical) {
            (1, Some(single)) => self.rows.find_cte(query, single),
            _ => None,
        };

        let source = match cte {
            Some(cte) => {
                if let Some(entry) = name.first() {
                    self.classify(entry, SymbolClass::Table);
                    self.symbols
                        .set_definition(entry, SymbolDefinition::RowsSource(cte));
                }
                let (columns, known) = {
                    let declared = self.rows.source(cte);
                    (declared.columns.clone(), declared.columns_known)
                };
                let source =
                    self.rows
                        .add_source(query, RowsSourceKind::CteReference(cte), canonical, range);
                let rows_source = self.rows.source_mut(source);
                rows_source.columns = columns;
                rows_source.columns_known = known;
                source
            }
            None => {
                let origin = SymbolOrigin::ContextScope {
                    query,
                    allowed: ObjectKindSet::ROWS_SOURCES,
                };
                let resolution = self.perform_partial_resolution(
                    &name,
                    Some(origin.clone()),
                    ObjectKindSet::ROWS_SOURCES,
                    SymbolClass::Error,
                )?;
                if let Some(first) = name.first() {
                    self.set_origin(first, origin);
                }
                let complete = resolution.is_complete(&name);
                match resolution.object.filter(|_| complete) {
                    Some(table) => {
                        let attributes = self.attributes(range, &table)?;
                        let source = self.rows.add_source(
                            query,
                            RowsSourceKind::Table(table),
                            canonical,
                            range,
                        );
                        if let Some(attributes) = attributes {
                            let rows_source = self.rows.source_mut(source);
                            rows_source.columns =
                                attributes.into_iter().map(ResultColumn::from_object).collect();
                            rows_source.columns_known = true;
                        }
                        source
                    }
                    None => self
                        .rows
                        .add_source(query, RowsSourceKind::Unresolved, canonical, range),
                }
            }
        };

        if let Some(correlation) = correlation {
            self.declare_alias(correlation, source);
        }
        Ok(source)
    }

    /// Declare the correlation name of `source`
    pub(crate) fn declare_alias(&mut self, correlation: SyntaxNode<'_>, source: RowsSourceId) {
        let Some(alias) = self.collect_name(correlation) else {
            return;
        };
        let Some(entry) = alias.first() else {
            return;
        };
        self.classify(entry, SymbolClass::TableAlias);
        let definition = match &self.rows.source(source).kind {
            RowsSourceKind::Table(object) => SymbolDefinition::Object(object.clone()),
            _ => SymbolDefinition::RowsSource(source),
        };
        self.symbols.set_definition(entry, definition);
        let name = self.symbols.entry(entry).name.clone();
        self.rows.source_mut(source).alias = Some((name, entry));
    }
}

/// Correlation name of a table reference or derived table
pub(crate) fn correlation_name(node: SyntaxNode<'_>) -> Option<SyntaxNode<'_>> {
    node.first_child_of_kind(NodeKind::CorrelationName)
}

/// Keyword children of `node`, upper-cased
pub(crate) fn keywords(node: SyntaxNode<'_>) -> Vec<String> {
    node.children_skip_errors()
        .into_iter()
        .filter(|c| c.kind() == NodeKind::Keyword)
        .map(|c| c.text().to_ascii_uppercase())
        .collect()
}
