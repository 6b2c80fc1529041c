// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! INSERT, UPDATE and DELETE.

use sql_insight_ir::{NodeKind, SyntaxNode};

use crate::builder::correlation_name;
use crate::context::AnalysisContext;
use crate::error::{SemanticError, SemanticResult};
use crate::expr::{ColumnReferenceExpr, ValueExpression, ValueExpressions};
use crate::lexical::ScopeKind;
use crate::origin::SymbolOrigin;
use crate::qualified_name::QualifiedName;
use crate::rows::{QueryScopeId, RowsSourceId};
use crate::symbol::SymbolClass;

impl AnalysisContext<'_> {
    /// `INSERT INTO t [(cols)] VALUES (...) | SELECT ...`
    pub(crate) fn build_insert(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> SemanticResult<(QueryScopeId, Option<RowsSourceId>)> {
        let query = self.rows.add_query(None, false, node.range());
        self.in_scope(ScopeKind::Statement, node.range(), Some(query), |ctx| {
            let Some(name_node) = node.first_child_of_kind(NodeKind::TableName) else {
                return Err(SemanticError::malformed("INSERT", "missing target table"));
            };
            let target = ctx.build_named_source(name_node, None, query, name_node.range())?;

            if let Some(list) = node.first_child_of_kind(NodeKind::ColumnList) {
                ctx.in_scope(ScopeKind::ColumnList, list.range(), Some(query), |ctx| {
                    for column in list.children_skip_errors() {
                        if column.kind().is_identifier() || column.kind() == NodeKind::ColumnName {
                            ctx.build_target_column(column, target)?;
                        }
                    }
                    Ok(())
                })?;
            }

            if let Some(values) = node.first_child_of_kind(NodeKind::ValuesClause) {
                let mut exprs = ValueExpressions::new();
                ctx.in_scope(ScopeKind::Values, values.range(), Some(query), |ctx| {
                    for row in values.children_of_kind(NodeKind::ValuesRow) {
                        ctx.build_clause_expressions(row, query, &mut exprs, false)?;
                    }
                    Ok(())
                })?;
                exprs.resolve(ctx)?;
            }

            let select = node
                .children_skip_errors()
                .into_iter()
                .find(|c| matches!(c.kind(), NodeKind::SelectStatement | NodeKind::SetOperation));
            if let Some(select) = select {
                ctx.build_query(select, Some(query), false)?;
            }
            Ok((query, Some(target)))
        })
    }

    /// `UPDATE t [alias] SET c = expr, ... [FROM ...] [WHERE ...]`
    pub(crate) fn build_update(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> SemanticResult<(QueryScopeId, Option<RowsSourceId>)> {
        let query = self.rows.add_query(None, false, node.range());
        self.in_scope(ScopeKind::Statement, node.range(), Some(query), |ctx| {
            let target = ctx.build_dml_target(node, query, "UPDATE")?;
            let mut exprs = ValueExpressions::new();

            if let Some(from) = node.first_child_of_kind(NodeKind::FromClause) {
                ctx.in_scope(ScopeKind::From, from.range(), Some(query), |ctx| {
                    ctx.build_from(from, query, &mut exprs)
                })?;
            }

            if let Some(set) = node.first_child_of_kind(NodeKind::SetClause) {
                ctx.in_scope(ScopeKind::Assignments, set.range(), Some(query), |ctx| {
                    for assignment in set.children_of_kind(NodeKind::Assignment) {
                        ctx.build_assignment(assignment, query, target, &mut exprs)?;
                    }
                    Ok(())
                })?;
            }

            if let Some(filter) = node.first_child_of_kind(NodeKind::WhereClause) {
                ctx.in_scope(ScopeKind::Filter, filter.range(), Some(query), |ctx| {
                    ctx.build_clause_expressions(filter, query, &mut exprs, false)
                })?;
            }
            exprs.resolve(ctx)?;
            Ok((query, Some(target)))
        })
    }

    /// `DELETE FROM t [alias] [WHERE ...]`
    pub(crate) fn build_delete(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> SemanticResult<(QueryScopeId, Option<RowsSourceId>)> {
        let query = self.rows.add_query(None, false, node.range());
        self.in_scope(ScopeKind::Statement, node.range(), Some(query), |ctx| {
            let target = ctx.build_dml_target(node, query, "DELETE")?;
            if let Some(filter) = node.first_child_of_kind(NodeKind::WhereClause) {
                let mut exprs = ValueExpressions::new();
                ctx.in_scope(ScopeKind::Filter, filter.range(), Some(query), |ctx| {
                    ctx.build_clause_expressions(filter, query, &mut exprs, false)
                })?;
                exprs.resolve(ctx)?;
            }
            Ok((query, Some(target)))
        })
    }

    /// Target table of UPDATE/DELETE, attached to the statement's query
    fn build_dml_target(
        &mut self,
        node: SyntaxNode<'_>,
        query: QueryScopeId,
        statement: &str,
    ) -> SemanticResult<RowsSourceId> {
        let target = match node.first_child_of_kind(NodeKind::TableReference) {
            Some(reference) => self.build_table_expression(reference, query)?,
            None => {
                let Some(name_node) = node.first_child_of_kind(NodeKind::TableName) else {
                    return Err(SemanticError::malformed(statement, "missing target table"));
                };
                let alias = correlation_name(node);
                self.build_named_source(name_node, alias, query, name_node.range())?
            }
        };
        self.rows.attach_source(query, target);
        Ok(target)
    }

    /// `column = expr` inside SET
    fn build_assignment(
        &mut self,
        assignment: SyntaxNode<'_>,
        query: QueryScopeId,
        target: RowsSourceId,
        exprs: &mut ValueExpressions,
    ) -> SemanticResult<()> {
        let mut children = assignment.children_skip_errors().into_iter();
        let Some(column) =
            children.find(|c| c.kind().is_name_container() || c.kind().is_identifier())
        else {
            return Ok(());
        };
        let Some(name) = self.collect_name(column) else {
            return Ok(());
        };
        if name.len() == 1 {
            self.resolve_target_column(&name, target);
        } else {
            // `alias.column = ...` binds like any column reference
            let expr = ColumnReferenceExpr::new(name, query, false);
            exprs.push(ValueExpression::ColumnReference(expr));
        }
        let values =
            children.filter(|c| !matches!(c.kind(), NodeKind::Operator | NodeKind::Keyword));
        for value in values {
            self.build_expression(exprs, value, query, false)?;
        }
        Ok(())
    }

    /// Column of an INSERT column list
    fn build_target_column(
        &mut self,
        column: SyntaxNode<'_>,
        target: RowsSourceId,
    ) -> SemanticResult<()> {
        if let Some(name) = self.collect_name(column) {
            self.resolve_target_column(&name, target);
        }
        Ok(())
    }

    /// Resolve a bare column name against the statement's target
    pub(crate) fn resolve_target_column(&mut self, name: &QualifiedName, target: RowsSourceId) {
        let Some(entry) = name.first() else {
            return;
        };
        self.set_origin(entry, SymbolOrigin::ColumnNameFromRowsData { source: target });
        let column_name = self.symbols.entry(entry).name.clone();
        let source = self.rows.source(target);
        match source.column(&column_name).map(|(index, _)| index) {
            Some(index) => {
                self.define_column(entry, target, index);
            }
            None if source.columns_known => {
                let owner = source.reference_name().unwrap_or_default();
                self.symbols.override_class(entry, SymbolClass::Error);
                let range = self.symbols.entry(entry).range;
                self.report_not_found(
                    range,
                    format!("Column '{}' not found in '{}'", column_name, owner),
                );
            }
            None => self.classify(entry, SymbolClass::Unknown),
        }
    }
}
