// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! `CALL procedure(args)`

use sql_insight_ir::{NodeKind, SyntaxNode};

use crate::context::AnalysisContext;
use crate::error::{SemanticError, SemanticResult};
use crate::expr::ValueExpressions;
use crate::lexical::ScopeKind;
use crate::rows::QueryScopeId;

impl AnalysisContext<'_> {
    pub(crate) fn build_call(&mut self, node: SyntaxNode<'_>) -> SemanticResult<QueryScopeId> {
        let Some(call) = node.first_child_of_kind(NodeKind::FunctionCall) else {
            return Err(SemanticError::malformed("CALL", "missing procedure call"));
        };
        let query = self.rows.add_query(None, false, node.range());
        let mut exprs = ValueExpressions::new();
        self.in_scope(ScopeKind::Statement, node.range(), Some(query), |ctx| {
            ctx.build_expression(&mut exprs, call, query, false)
        })?;
        exprs.resolve(self)?;
        Ok(query)
    }
}
