// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! SELECT, set operations, CTEs and FROM lists.
//!
//! Clauses are visited in dependency order rather than text order: `WITH`
//! and `FROM` first so every rows source is known, then the select list and
//! filters, and `ORDER BY` last since it may name select-list aliases.

use sql_insight_ir::{NodeKind, SyntaxNode};
use tracing::trace;

use crate::builder::correlation_name;
use crate::context::AnalysisContext;
use crate::error::SemanticResult;
use crate::expr::{ValueExprId, ValueExpression, ValueExpressions};
use crate::lexical::ScopeKind;
use crate::rows::{QueryScopeId, ResultColumn, RowsSourceId, RowsSourceKind};
use crate::symbol::{SymbolClass, SymbolDefinition, SymbolEntryId};

/// One select-list item before result columns are computed
struct SelectItem {
    expr: Option<ValueExprId>,
    alias: Option<SymbolEntryId>,
}

impl AnalysisContext<'_> {
    /// Build a SELECT or set operation in a new query scope
    pub(crate) fn build_query(
        &mut self,
        node: SyntaxNode<'_>,
        parent: Option<QueryScopeId>,
        correlated: bool,
    ) -> SemanticResult<QueryScopeId> {
        self.descend()?;
        let result = if node.kind() == NodeKind::SetOperation {
            self.build_set_operation(node, parent, correlated)
        } else {
            self.build_select(node, parent, correlated)
        };
        self.ascend();
        result
    }

    fn build_set_operation(
        &mut self,
        node: SyntaxNode<'_>,
        parent: Option<QueryScopeId>,
        correlated: bool,
    ) -> SemanticResult<QueryScopeId> {
        let query = self.rows.add_query(parent, correlated, node.range());
        let branches: Vec<SyntaxNode<'_>> = node
            .children_skip_errors()
            .into_iter()
            .filter(|c| matches!(c.kind(), NodeKind::SelectStatement | NodeKind::SetOperation))
            .collect();

        let mut first = None;
        for branch in branches {
            let built = self.build_query(branch, parent, correlated)?;
            first.get_or_insert(built);
        }
        if let Some(first) = first {
            let result = self.rows.query(first).result.clone();
            self.rows.query_mut(query).result = result;
        }
        Ok(query)
    }

    fn build_select(
        &mut self,
        node: SyntaxNode<'_>,
        parent: Option<QueryScopeId>,
        correlated: bool,
    ) -> SemanticResult<QueryScopeId> {
        let query = self.rows.add_query(parent, correlated, node.range());
        self.in_scope(ScopeKind::Query, node.range(), Some(query), |ctx| {
            ctx.build_select_body(node, query)
        })?;
        trace!(
            "Query {:?}: {} sources, {} result columns",
            query,
            self.rows.query(query).sources.len(),
            self.rows.query(query).result.len()
        );
        Ok(query)
    }

    fn build_select_body(
        &mut self,
        node: SyntaxNode<'_>,
        query: QueryScopeId,
    ) -> SemanticResult<()> {
        if let Some(with) = node.first_child_of_kind(NodeKind::WithClause) {
            self.build_with(with, query)?;
        }

        let mut exprs = ValueExpressions::new();
        if let Some(from) = node.first_child_of_kind(NodeKind::FromClause) {
            self.in_scope(ScopeKind::From, from.range(), Some(query), |ctx| {
                ctx.build_from(from, query, &mut exprs)
            })?;
        }

        let mut items = Vec::new();
        if let Some(list) = node.first_child_of_kind(NodeKind::SelectList) {
            self.in_scope(ScopeKind::SelectList, list.range(), Some(query), |ctx| {
                for item in list.children_skip_errors() {
                    if let Some(built) = ctx.build_select_item(item, query, &mut exprs)? {
                        items.push(built);
                    }
                }
                Ok(())
            })?;
        }

        for (kind, scope) in [
            (NodeKind::WhereClause, ScopeKind::Filter),
            (NodeKind::GroupByClause, ScopeKind::GroupBy),
            (NodeKind::HavingClause, ScopeKind::Filter),
        ] {
            if let Some(clause) = node.first_child_of_kind(kind) {
                self.in_scope(scope, clause.range(), Some(query), |ctx| {
                    ctx.build_clause_expressions(clause, query, &mut exprs, false)
                })?;
            }
        }

        exprs.resolve(self)?;
        let result = self.result_columns(query, &items, &exprs);
        for (index, column) in result.iter().enumerate() {
            if let Some(alias) = column.entry {
                self.symbols
                    .set_definition(alias, SymbolDefinition::ResultColumn { query, index });
            }
        }
        self.rows.query_mut(query).result = result;

        if let Some(order) = node.first_child_of_kind(NodeKind::OrderByClause) {
            let mut order_exprs = ValueExpressions::new();
            self.in_scope(ScopeKind::OrderBy, order.range(), Some(query), |ctx| {
                for item in order.children_of_kind(NodeKind::OrderItem) {
                    ctx.build_clause_expressions(item, query, &mut order_exprs, true)?;
                }
                Ok(())
            })?;
            order_exprs.resolve(self)?;
        }
        Ok(())
    }

    /// `WITH a AS (...), b (x, y) AS (...)`
    fn build_with(&mut self, with: SyntaxNode<'_>, query: QueryScopeId) -> SemanticResult<()> {
        for cte in with.children_of_kind(NodeKind::CommonTableExpression) {
            let Some(name_node) = cte
                .children_skip_errors()
                .into_iter()
                .find(|c| c.kind().is_identifier())
            else {
                continue;
            };
            let entry = self.new_entry(name_node, None);
            let name = self.symbols.entry(entry).name.clone();

            let body = self.build_subquery(cte, Some(query), false)?;
            let inner = self.rows.query(body).result.clone();
            let columns: Vec<ResultColumn> = match cte.first_child_of_kind(NodeKind::ColumnList) {
                Some(list) => {
                    let mut columns = Vec::new();
                    for (index, column) in list
                        .children_skip_errors()
                        .into_iter()
                        .filter(|c| c.kind().is_identifier() || c.kind() == NodeKind::ColumnName)
                        .enumerate()
                    {
                        let Some(declared) = self.collect_name(column).and_then(|n| n.first())
                        else {
                            continue;
                        };
                        self.classify(declared, SymbolClass::ColumnDerived);
                        self.symbols.set_definition(
                            declared,
                            SymbolDefinition::ResultColumn { query: body, index },
                        );
                        let data_type = inner.get(index).and_then(|c| c.data_type.clone());
                        columns.push(
                            ResultColumn::new(self.symbols.entry(declared).name.clone())
                                .with_data_type(data_type)
                                .with_entry(declared),
                        );
                    }
                    columns
                }
                None => inner,
            };

            let source = self
                .rows
                .add_source(query, RowsSourceKind::Cte(body), Some(name), cte.range());
            let rows_source = self.rows.source_mut(source);
            rows_source.columns = columns;
            rows_source.columns_known = true;
            self.rows.query_mut(query).ctes.push(source);

            self.classify(entry, SymbolClass::Table);
            self.symbols
                .set_definition(entry, SymbolDefinition::RowsSource(source));
        }
        Ok(())
    }

    /// Sources of a FROM clause (or of an UPDATE ... FROM), in text order
    ///
    /// Joins nest to the left; they are walked with an explicit stack.
    pub(crate) fn build_from(
        &mut self,
        from: SyntaxNode<'_>,
        query: QueryScopeId,
        exprs: &mut ValueExpressions,
    ) -> SemanticResult<()> {
        let mut stack: Vec<SyntaxNode<'_>> = from.children_skip_errors();
        stack.reverse();
        while let Some(node) = stack.pop() {
            self.check_canceled()?;
            match node.kind() {
                NodeKind::JoinedTable => {
                    let mut children = node.children_skip_errors();
                    children.reverse();
                    stack.extend(children);
                }
                NodeKind::TableReference | NodeKind::DerivedTable => {
                    let source = self.build_table_expression(node, query)?;
                    self.rows.attach_source(query, source);
                }
                NodeKind::JoinCondition => {
                    self.in_scope(ScopeKind::JoinCondition, node.range(), Some(query), |ctx| {
                        ctx.build_clause_expressions(node, query, exprs, false)
                    })?;
                }
                NodeKind::TableName | NodeKind::QualifiedName | NodeKind::Identifier => {
                    // Bare name without a table_reference wrapper
                    let source = self.build_named_source(node, None, query, node.range())?;
                    self.rows.attach_source(query, source);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// One table reference or derived table, not yet attached
    pub(crate) fn build_table_expression(
        &mut self,
        node: SyntaxNode<'_>,
        query: QueryScopeId,
    ) -> SemanticResult<RowsSourceId> {
        if node.kind() == NodeKind::DerivedTable {
            let subquery = self.build_subquery(node, Some(query), false)?;
            let columns = self.rows.query(subquery).result.clone();
            let known = self
                .rows
                .query(subquery)
                .sources
                .iter()
                .all(|id| self.rows.source(*id).columns_known);
            let source = self
                .rows
                .add_source(query, RowsSourceKind::Derived(subquery), None, node.range());
            let rows_source = self.rows.source_mut(source);
            rows_source.columns = columns;
            rows_source.columns_known = known;
            if let Some(correlation) = correlation_name(node) {
                self.declare_alias(correlation, source);
            }
            return Ok(source);
        }

        let name_node = node.children_skip_errors().into_iter().find(|c| {
            matches!(c.kind(), NodeKind::TableName | NodeKind::QualifiedName)
                || c.kind().is_identifier()
        });
        let Some(name_node) = name_node else {
            return Ok(self
                .rows
                .add_source(query, RowsSourceKind::Unresolved, None, node.range()));
        };
        self.build_named_source(name_node, correlation_name(node), query, node.range())
    }

    fn build_select_item(
        &mut self,
        item: SyntaxNode<'_>,
        query: QueryScopeId,
        exprs: &mut ValueExpressions,
    ) -> SemanticResult<Option<SelectItem>> {
        match item.kind() {
            NodeKind::Comma | NodeKind::Keyword => return Ok(None),
            NodeKind::SelectItem => {}
            _ => {
                // Expression placed directly in the list
                let expr = self.build_expression(exprs, item, query, false)?;
                return Ok(Some(SelectItem { expr, alias: None }));
            }
        }

        let mut expr = None;
        let mut alias = None;
        for child in item.children_skip_errors() {
            match child.kind() {
                NodeKind::Alias => {
                    alias = child
                        .children_skip_errors()
                        .into_iter()
                        .find(|c| c.kind().is_identifier())
                        .map(|c| self.new_entry(c, None));
                }
                NodeKind::Keyword | NodeKind::Comma => {}
                _ if expr.is_none() => {
                    expr = self.build_expression(exprs, child, query, false)?;
                }
                _ => {}
            }
        }
        if let Some(alias) = alias {
            self.classify(alias, SymbolClass::ColumnDerived);
        }
        Ok(Some(SelectItem { expr, alias }))
    }

    /// Expressions of a WHERE / GROUP BY / HAVING / ON / ORDER BY clause
    pub(crate) fn build_clause_expressions(
        &mut self,
        clause: SyntaxNode<'_>,
        query: QueryScopeId,
        exprs: &mut ValueExpressions,
        sees_result_aliases: bool,
    ) -> SemanticResult<()> {
        for child in clause.children_skip_errors() {
            if matches!(
                child.kind(),
                NodeKind::Keyword | NodeKind::Comma | NodeKind::Operator
            ) {
                continue;
            }
            if child.kind() == NodeKind::OrderItem {
                self.build_clause_expressions(child, query, exprs, sees_result_aliases)?;
                continue;
            }
            self.build_expression(exprs, child, query, sees_result_aliases)?;
        }
        Ok(())
    }

    /// Result columns of a query from its select items
    fn result_columns(
        &self,
        query: QueryScopeId,
        items: &[SelectItem],
        exprs: &ValueExpressions,
    ) -> Vec<ResultColumn> {
        let mut columns = Vec::new();
        for item in items {
            let Some(id) = item.expr else {
                if let Some(alias) = item.alias {
                    let name = self.symbols.entry(alias).name.clone();
                    columns.push(ResultColumn::new(name).with_entry(alias));
                }
                continue;
            };
            if let ValueExpression::TupleReference(tuple) = exprs.get(id) {
                let sources: Vec<RowsSourceId> = match tuple.source() {
                    Some(source) => vec![source],
                    None => self.rows.query(query).sources.clone(),
                };
                for source in sources {
                    columns.extend(self.rows.source(source).columns.iter().cloned().map(|mut c| {
                        c.entry = None;
                        c
                    }));
                }
                continue;
            }
            let data_type = exprs.value_type(id).cloned();
            let column = match item.alias {
                Some(alias) => ResultColumn::new(self.symbols.entry(alias).name.clone())
                    .with_data_type(data_type)
                    .with_entry(alias),
                None => match exprs.result_column(id) {
                    Some(mut column) => {
                        column.entry = None;
                        if column.data_type.is_none() {
                            column.data_type = data_type;
                        }
                        column
                    }
                    None => ResultColumn::new(String::new()).with_data_type(data_type),
                },
            };
            columns.push(column);
        }
        columns
    }
}
