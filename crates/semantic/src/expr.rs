// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Value expressions
//!
//! Expressions are flattened into an arena in post-order, so children always
//! have smaller ids than their parents. Building uses an explicit work stack:
//! deeply nested expressions never grow the call stack.
//!
//! Resolution runs in two phases over the whole arena:
//!
//! 1. [`ValueExpressionModel::resolve_row_sources`] binds each name to the
//!    rows source it reads from. All sources of the query must be known.
//! 2. [`ValueExpressionModel::resolve_value_type`] classifies and defines the
//!    identifiers and computes the result type. Children are resolved first so
//!    their types are available as operands.

use std::sync::Arc;

use sql_insight_ir::{
    CompositeType, DataType, DbObject, NodeKind, ObjectKindSet, RoutineSignature, SyntaxNode,
    TextRange,
};
use tracing::trace;

use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::SemanticResult;
use crate::lexical::{LexicalItemId, LexicalItemKind};
use crate::origin::SymbolOrigin;
use crate::qualified_name::QualifiedName;
use crate::resolution::similar_names;
use crate::rows::{QueryScopeId, ResultColumn, RowsModel, RowsSourceId, RowsSourceKind};
use crate::symbol::{SymbolClass, SymbolDefinition, SymbolEntryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ValueExprId(u32);

/// Two-phase resolution protocol of a value expression
pub(crate) trait ValueExpressionModel {
    /// Phase one: bind names to rows sources of the query
    fn resolve_row_sources(&mut self, ctx: &mut AnalysisContext<'_>) -> SemanticResult<()>;

    /// Phase two: classify identifiers and compute the type
    ///
    /// `operands` holds the types of the child expressions, in order.
    fn resolve_value_type(
        &mut self,
        ctx: &mut AnalysisContext<'_>,
        operands: &[Option<DataType>],
    ) -> SemanticResult<Option<DataType>>;
}

// ---------------------------------------------------------------------------
// Column references
// ---------------------------------------------------------------------------

/// What the leading parts of a column reference were bound to
#[derive(Debug, Clone, PartialEq)]
enum ColumnBinding {
    Unbound,
    /// First part is a column of a visible source
    Column { source: RowsSourceId, index: usize },
    /// First `prefix` parts name a source; the next part is its column
    Source { source: RowsSourceId, prefix: usize },
    /// First part is a select-list alias (ORDER BY)
    ResultAlias { index: usize },
    /// First part is a column of more than one source
    Ambiguous(Vec<RowsSourceId>),
    /// Some visible source has an unknown column list
    Indeterminate,
}

#[derive(Debug, Clone)]
pub(crate) struct ColumnReferenceExpr {
    name: QualifiedName,
    query: QueryScopeId,
    /// Select-list aliases are visible (ORDER BY)
    sees_result_aliases: bool,
    binding: ColumnBinding,
    /// Column this reference resolved to
    pub(crate) resolved: Option<ResultColumn>,
}

enum ColumnLookup {
    Found(RowsSourceId, usize),
    Ambiguous(Vec<RowsSourceId>),
    Indeterminate,
    Missing,
}

fn lookup_column(rows: &RowsModel, query: QueryScopeId, name: &str) -> ColumnLookup {
    for level in rows.visible_sources(query) {
        let mut hits = Vec::new();
        let mut indeterminate = false;
        for id in level {
            let source = rows.source(id);
            match source.column(name) {
                Some((index, _)) => hits.push((id, index)),
                None if !source.columns_known => indeterminate = true,
                None => {}
            }
        }
        match hits.as_slice() {
            [(id, index)] => return ColumnLookup::Found(*id, *index),
            [] if indeterminate => return ColumnLookup::Indeterminate,
            [] => continue,
            many => return ColumnLookup::Ambiguous(many.iter().map(|(id, _)| *id).collect()),
        }
    }
    ColumnLookup::Missing
}

/// Query that computes the columns of a derived source
fn derived_query(rows: &RowsModel, source: RowsSourceId) -> Option<QueryScopeId> {
    let mut current = source;
    for _ in 0..2 {
        match rows.source(current).kind {
            RowsSourceKind::Derived(query) | RowsSourceKind::Cte(query) => return Some(query),
            RowsSourceKind::CteReference(target) => current = target,
            RowsSourceKind::Table(_) | RowsSourceKind::Unresolved => return None,
        }
    }
    None
}

impl AnalysisContext<'_> {
    /// Classify and define `entry` as column `index` of `source`
    pub(crate) fn define_column(
        &mut self,
        entry: SymbolEntryId,
        source: RowsSourceId,
        index: usize,
    ) -> ResultColumn {
        let rows_source = self.rows.source(source);
        let column = rows_source.columns[index].clone();
        let derived = rows_source.is_derived();
        let definition = match (derived, &column.object) {
            (false, Some(object)) => Some(SymbolDefinition::Object(object.clone())),
            _ => derived_query(&self.rows, source)
                .map(|query| SymbolDefinition::ResultColumn { query, index }),
        };
        let class = if derived {
            SymbolClass::ColumnDerived
        } else {
            SymbolClass::Column
        };
        self.classify(entry, class);
        if let Some(definition) = definition {
            self.symbols.set_definition(entry, definition);
        }
        column
    }

    /// Classify the leading `prefix` parts of `name` as naming `source`
    pub(crate) fn bind_source_prefix(
        &mut self,
        name: &QualifiedName,
        prefix: usize,
        source: RowsSourceId,
    ) {
        let entries: Vec<SymbolEntryId> =
            name.parts()[..prefix].iter().flatten().copied().collect();
        let Some(&last) = entries.last() else {
            return;
        };
        let rows_source = self.rows.source(source);
        if let Some(declaration) = rows_source.alias.as_ref().map(|(_, d)| *d) {
            self.symbols
                .set_definition(last, SymbolDefinition::Entry(declaration));
            self.classify(last, SymbolClass::TableAlias);
            return;
        }
        match rows_source.kind.clone() {
            RowsSourceKind::Table(object) => self.define_prefix(name, prefix, &object),
            RowsSourceKind::Derived(_)
            | RowsSourceKind::Cte(_)
            | RowsSourceKind::CteReference(_) => {
                self.classify(last, SymbolClass::Table);
                self.symbols
                    .set_definition(last, SymbolDefinition::RowsSource(source));
            }
            RowsSourceKind::Unresolved => self.classify(last, SymbolClass::Unknown),
        }
    }

    /// Column names visible from `query`, for "did you mean" hints
    fn visible_column_names(&self, query: QueryScopeId) -> Vec<String> {
        self.rows
            .visible_sources(query)
            .into_iter()
            .flatten()
            .flat_map(|id| self.rows.source(id).columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    /// Resolve the parts after `start` as fields of composite values
    fn resolve_members(
        &mut self,
        name: &QualifiedName,
        start: usize,
        mut data_type: Option<DataType>,
    ) -> Option<DataType> {
        for index in start..name.len() {
            let Some(entry) = name.parts()[index] else {
                return None;
            };
            let composite = data_type.as_ref().and_then(DataType::as_composite).cloned();
            let Some(composite) = composite else {
                self.classify(entry, SymbolClass::Unknown);
                data_type = None;
                continue;
            };
            self.set_origin(
                entry,
                SymbolOrigin::MemberOfType {
                    data_type: composite.clone(),
                },
            );
            let field_name = self.symbols.entry(entry).name.clone();
            match composite.field(&field_name) {
                Some(field) => {
                    self.classify(entry, SymbolClass::CompositeField);
                    self.symbols.set_definition(
                        entry,
                        SymbolDefinition::Member {
                            owner: composite.name.clone(),
                            field: field.clone(),
                        },
                    );
                    data_type = Some(field.data_type.clone());
                }
                None => {
                    self.symbols.override_class(entry, SymbolClass::Error);
                    let range = self.symbols.entry(entry).range;
                    self.report_not_found(
                        range,
                        format!("Field '{}' not found in type '{}'", field_name, composite.name),
                    );
                    return None;
                }
            }
        }
        if let Some(composite) = data_type.as_ref().and_then(DataType::as_composite) {
            let origin = SymbolOrigin::MemberOfType {
                data_type: composite.clone(),
            };
            self.set_part_origin(name, name.len(), origin);
        }
        data_type
    }
}

impl ColumnReferenceExpr {
    pub(crate) fn new(name: QualifiedName, query: QueryScopeId, sees_result_aliases: bool) -> Self {
        Self {
            name,
            query,
            sees_result_aliases,
            binding: ColumnBinding::Unbound,
            resolved: None,
        }
    }

    fn bind(&self, ctx: &AnalysisContext<'_>) -> ColumnBinding {
        let valid = self.name.valid_leading_parts();
        if valid == 0 {
            return ColumnBinding::Unbound;
        }
        let names = self.name.canonical_prefix(&ctx.symbols, valid);
        let dotted = self.name.len() > 1 || self.name.member_access().is_some();

        if dotted {
            let longest = if self.name.member_access().is_some() {
                valid
            } else {
                valid.min(self.name.len() - 1)
            };
            for prefix in (1..=longest).rev() {
                match ctx.rows.find_source_by_name(self.query, &names[..prefix]).as_slice() {
                    [] => continue,
                    [source] => {
                        return ColumnBinding::Source {
                            source: *source,
                            prefix,
                        };
                    }
                    many => return ColumnBinding::Ambiguous(many.to_vec()),
                }
            }
        }

        match lookup_column(&ctx.rows, self.query, &names[0]) {
            ColumnLookup::Found(source, index) => ColumnBinding::Column { source, index },
            ColumnLookup::Ambiguous(sources) => ColumnBinding::Ambiguous(sources),
            ColumnLookup::Indeterminate => ColumnBinding::Indeterminate,
            ColumnLookup::Missing => {
                let alias = self.sees_result_aliases.then(|| {
                    ctx.rows
                        .query(self.query)
                        .result
                        .iter()
                        .position(|c| c.entry.is_some() && c.name == names[0])
                });
                match alias.flatten() {
                    Some(index) => ColumnBinding::ResultAlias { index },
                    None => ColumnBinding::Unbound,
                }
            }
        }
    }

    /// Last resort for a name that matched nothing in the rows context
    fn resolve_unbound(&mut self, ctx: &mut AnalysisContext<'_>) -> Option<DataType> {
        let Some(first) = self.name.first() else {
            return None;
        };
        let entry = ctx.symbols.entry(first).clone();

        if self.name.len() == 1 && !entry.quoted {
            if let Some(variable) = ctx.dialect.global_variable(&entry.raw_name) {
                ctx.classify(first, SymbolClass::Keyword);
                ctx.symbols
                    .set_definition(first, SymbolDefinition::Variable(variable.name.to_string()));
                return Some((variable.data_type)());
            }
        }

        // `"text"` is a string literal where `"` is not the main identifier quote
        let double_quote_is_string = ctx
            .dialect
            .identifier_quotes()
            .first()
            .is_some_and(|(open, _)| *open != '"');
        if self.name.len() == 1
            && entry.quoted
            && entry.raw_name.starts_with('"')
            && double_quote_is_string
        {
            ctx.classify(first, SymbolClass::String);
            return Some(DataType::Text);
        }

        let hints = similar_names(
            &entry.name,
            ctx.visible_column_names(self.query).iter().map(String::as_str),
        );
        let mut message = format!("Column '{}' not found", self.name);
        if !hints.is_empty() {
            message.push_str(&format!(". Did you mean: {}?", hints.join(", ")));
        }
        for part in self.name.entries().collect::<Vec<_>>() {
            ctx.symbols.override_class(part, SymbolClass::Error);
        }
        ctx.report_not_found(entry.range, message);
        None
    }
}

impl ValueExpressionModel for ColumnReferenceExpr {
    fn resolve_row_sources(&mut self, ctx: &mut AnalysisContext<'_>) -> SemanticResult<()> {
        self.binding = self.bind(ctx);
        trace!("Bound '{}' as {:?}", self.name, self.binding);
        Ok(())
    }

    fn resolve_value_type(
        &mut self,
        ctx: &mut AnalysisContext<'_>,
        _operands: &[Option<DataType>],
    ) -> SemanticResult<Option<DataType>> {
        if let Some(first) = self.name.first() {
            ctx.set_origin(first, SymbolOrigin::RowsDataRef { query: self.query });
        }
        let data_type = match self.binding.clone() {
            ColumnBinding::Column { source, index } => {
                let Some(first) = self.name.first() else {
                    return Ok(None);
                };
                let column = ctx.define_column(first, source, index);
                let data_type = column.data_type.clone();
                self.resolved = Some(column);
                ctx.resolve_members(&self.name, 1, data_type)
            }
            ColumnBinding::Source { source, prefix } => {
                ctx.bind_source_prefix(&self.name, prefix, source);
                ctx.set_part_origin(&self.name, prefix, SymbolOrigin::ColumnFromSource { source });
                self.resolve_source_column(ctx, source, prefix)
            }
            ColumnBinding::ResultAlias { index } => {
                let column = ctx.rows.query(self.query).result[index].clone();
                if let Some(first) = self.name.first() {
                    ctx.classify(first, SymbolClass::ColumnDerived);
                    let definition = match column.entry {
                        Some(declaration) => SymbolDefinition::Entry(declaration),
                        None => SymbolDefinition::ResultColumn {
                            query: self.query,
                            index,
                        },
                    };
                    ctx.symbols.set_definition(first, definition);
                }
                let data_type = column.data_type.clone();
                self.resolved = Some(column);
                ctx.resolve_members(&self.name, 1, data_type)
            }
            ColumnBinding::Ambiguous(sources) => {
                if let Some(first) = self.name.first() {
                    let mut owners: Vec<String> = sources
                        .iter()
                        .filter_map(|id| ctx.rows.source(*id).reference_name())
                        .collect();
                    owners.sort();
                    ctx.symbols.override_class(first, SymbolClass::Error);
                    let range = ctx.symbols.entry(first).range;
                    ctx.report(Diagnostic::error(
                        range,
                        DiagnosticCode::Ambiguous,
                        format!(
                            "Ambiguous reference '{}', candidates: {}",
                            ctx.symbols.entry(first).raw_name,
                            owners.join(", ")
                        ),
                    ));
                }
                None
            }
            ColumnBinding::Indeterminate => {
                for entry in self.name.entries().collect::<Vec<_>>() {
                    ctx.classify(entry, SymbolClass::Unknown);
                }
                None
            }
            ColumnBinding::Unbound => self.resolve_unbound(ctx),
        };
        Ok(data_type)
    }
}

impl ColumnReferenceExpr {
    fn resolve_source_column(
        &mut self,
        ctx: &mut AnalysisContext<'_>,
        source: RowsSourceId,
        prefix: usize,
    ) -> Option<DataType> {
        let entry = self.name.parts().get(prefix).copied().flatten()?;
        let column_name = ctx.symbols.entry(entry).name.clone();
        let rows_source = ctx.rows.source(source);
        match rows_source.column(&column_name).map(|(index, _)| index) {
            Some(index) => {
                let column = ctx.define_column(entry, source, index);
                let data_type = column.data_type.clone();
                self.resolved = Some(column);
                ctx.resolve_members(&self.name, prefix + 1, data_type)
            }
            None if !rows_source.columns_known => {
                for part in self.name.parts()[prefix..].iter().flatten() {
                    ctx.classify(*part, SymbolClass::Unknown);
                }
                None
            }
            None => {
                let owner = rows_source.reference_name().unwrap_or_default();
                let hints = similar_names(
                    &column_name,
                    rows_source.columns.iter().map(|c| c.name.as_str()),
                );
                let mut message = format!("Column '{}' not found in '{}'", column_name, owner);
                if !hints.is_empty() {
                    message.push_str(&format!(". Did you mean: {}?", hints.join(", ")));
                }
                ctx.symbols.override_class(entry, SymbolClass::Error);
                let range = ctx.symbols.entry(entry).range;
                ctx.report_not_found(range, message);
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tuple references
// ---------------------------------------------------------------------------

/// `*` or `t.*`
#[derive(Debug, Clone)]
pub(crate) struct TupleReferenceExpr {
    qualifier: Option<QualifiedName>,
    query: QueryScopeId,
    marker: LexicalItemId,
    source: Option<RowsSourceId>,
}

impl TupleReferenceExpr {
    pub(crate) fn new(
        qualifier: Option<QualifiedName>,
        query: QueryScopeId,
        marker: LexicalItemId,
    ) -> Self {
        Self {
            qualifier,
            query,
            marker,
            source: None,
        }
    }

    /// Source expanded by `t.*`; `None` for a bare `*`
    pub(crate) fn source(&self) -> Option<RowsSourceId> {
        self.source
    }
}

impl ValueExpressionModel for TupleReferenceExpr {
    fn resolve_row_sources(&mut self, ctx: &mut AnalysisContext<'_>) -> SemanticResult<()> {
        if let Some(qualifier) = &self.qualifier {
            let names = qualifier.canonical_prefix(&ctx.symbols, qualifier.valid_leading_parts());
            if let [source] = ctx.rows.find_source_by_name(self.query, &names).as_slice() {
                self.source = Some(*source);
            }
        }
        Ok(())
    }

    fn resolve_value_type(
        &mut self,
        ctx: &mut AnalysisContext<'_>,
        _operands: &[Option<DataType>],
    ) -> SemanticResult<Option<DataType>> {
        ctx.lexical.set_origin(
            self.marker,
            SymbolOrigin::ExpandableTupleRef {
                query: self.query,
                source: self.source,
            },
        );
        let Some(qualifier) = &self.qualifier else {
            return Ok(None);
        };
        if let Some(first) = qualifier.first() {
            ctx.set_origin(first, SymbolOrigin::RowsSourceRef { query: self.query });
        }
        match self.source {
            Some(source) => {
                ctx.bind_source_prefix(qualifier, qualifier.len(), source);
                let origin = SymbolOrigin::ColumnFromSource { source };
                ctx.set_part_origin(qualifier, qualifier.len(), origin);
            }
            None => {
                if let Some(last) = qualifier.last() {
                    ctx.symbols.override_class(last, SymbolClass::Error);
                    let range = ctx.symbols.entry(last).range;
                    ctx.report_not_found(
                        range,
                        format!("Table or alias '{}' not found", qualifier.raw_parts().join(".")),
                    );
                }
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Function calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub(crate) struct FunctionCallExpr {
    name: QualifiedName,
    query: QueryScopeId,
    arguments: Vec<ValueExprId>,
    range: TextRange,
    /// Routine selected by overload resolution
    pub(crate) routine: Option<Arc<DbObject>>,
}

/// One overload checked against the call's arguments
struct CandidateApplication {
    object: Arc<DbObject>,
    errors: usize,
}

impl CandidateApplication {
    fn check(
        object: Arc<DbObject>,
        signature: &RoutineSignature,
        operands: &[Option<DataType>],
    ) -> Self {
        let mut errors = 0;
        if !signature.accepts_argument_count(operands.len()) {
            errors += 1;
        }
        for (index, operand) in operands.iter().enumerate() {
            let (Some(parameter), Some(argument)) = (signature.parameter_for(index), operand) else {
                continue;
            };
            if !parameter.data_type.kind().accepts(argument.kind()) {
                errors += 1;
            }
        }
        Self { object, errors }
    }
}

impl FunctionCallExpr {
    pub(crate) fn new(
        name: QualifiedName,
        query: QueryScopeId,
        arguments: Vec<ValueExprId>,
        range: TextRange,
    ) -> Self {
        Self {
            name,
            query,
            arguments,
            range,
            routine: None,
        }
    }

    /// Routine name (last part) as written
    pub(crate) fn display_name(&self) -> Option<&str> {
        self.name.raw_parts().last().map(String::as_str)
    }
}

impl ValueExpressionModel for FunctionCallExpr {
    fn resolve_row_sources(&mut self, _ctx: &mut AnalysisContext<'_>) -> SemanticResult<()> {
        Ok(())
    }

    fn resolve_value_type(
        &mut self,
        ctx: &mut AnalysisContext<'_>,
        operands: &[Option<DataType>],
    ) -> SemanticResult<Option<DataType>> {
        let valid = self.name.valid_leading_parts();
        let Some(last) = self.name.last() else {
            return Ok(None);
        };
        let names = self.name.canonical_prefix(&ctx.symbols, valid);
        let Some(candidates) = ctx.find_objects(self.range, ObjectKindSet::ROUTINES, &names)? else {
            ctx.classify(last, SymbolClass::Unknown);
            return Ok(None);
        };

        if candidates.is_empty() || valid < self.name.len() {
            let raw = ctx.symbols.entry(last).raw_name.clone();
            if self.name.len() == 1 && ctx.dialect.is_builtin_function(&raw) {
                ctx.classify(last, SymbolClass::Function);
                return Ok(None);
            }
            let fallback = if ctx.settings.error_tolerant_functions {
                SymbolClass::Function
            } else {
                SymbolClass::Error
            };
            let origin = SymbolOrigin::ContextScope {
                query: self.query,
                allowed: ObjectKindSet::ROUTINES,
            };
            ctx.perform_partial_resolution(
                &self.name,
                Some(origin),
                ObjectKindSet::ROUTINES,
                fallback,
            )?;
            return Ok(None);
        }

        let applications: Vec<CandidateApplication> = candidates
            .into_iter()
            .filter_map(|object| {
                let signature = object.routine.clone()?;
                Some(CandidateApplication::check(object, &signature, operands))
            })
            .collect();
        let mut accepted = applications.iter().filter(|a| a.errors == 0);
        match (accepted.next(), accepted.next()) {
            (Some(only), None) => {
                let object = only.object.clone();
                ctx.define_prefix(&self.name, valid, &object);
                let return_type = object.routine.as_ref().map(|r| r.return_type.clone());
                self.routine = Some(object);
                Ok(return_type)
            }
            _ => {
                // Ambiguous or failing overloads are declined without a diagnostic
                trace!(
                    "Declined overload resolution for '{}' ({} candidates)",
                    self.name,
                    applications.len()
                );
                ctx.classify(last, SymbolClass::Function);
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Member access on arbitrary values
// ---------------------------------------------------------------------------

/// `(expr).field`
#[derive(Debug, Clone)]
pub(crate) struct MemberAccessExpr {
    base: ValueExprId,
    field: Option<SymbolEntryId>,
    marker: Option<LexicalItemId>,
}

impl ValueExpressionModel for MemberAccessExpr {
    fn resolve_row_sources(&mut self, _ctx: &mut AnalysisContext<'_>) -> SemanticResult<()> {
        Ok(())
    }

    fn resolve_value_type(
        &mut self,
        ctx: &mut AnalysisContext<'_>,
        operands: &[Option<DataType>],
    ) -> SemanticResult<Option<DataType>> {
        let composite: Option<CompositeType> = operands
            .first()
            .cloned()
            .flatten()
            .and_then(|t| t.as_composite().cloned());
        let Some(composite) = composite else {
            if let Some(field) = self.field {
                ctx.classify(field, SymbolClass::Unknown);
            }
            return Ok(None);
        };
        let origin = SymbolOrigin::MemberOfType {
            data_type: composite.clone(),
        };
        let Some(field) = self.field else {
            if let Some(marker) = self.marker {
                ctx.lexical.set_origin(marker, origin);
            }
            return Ok(None);
        };
        ctx.set_origin(field, origin);
        let field_name = ctx.symbols.entry(field).name.clone();
        match composite.field(&field_name) {
            Some(member) => {
                ctx.classify(field, SymbolClass::CompositeField);
                ctx.symbols.set_definition(
                    field,
                    SymbolDefinition::Member {
                        owner: composite.name.clone(),
                        field: member.clone(),
                    },
                );
                Ok(Some(member.data_type.clone()))
            }
            None => {
                ctx.symbols.override_class(field, SymbolClass::Error);
                let range = ctx.symbols.entry(field).range;
                ctx.report_not_found(
                    range,
                    format!("Field '{}' not found in type '{}'", field_name, composite.name),
                );
                Ok(None)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Arena
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CompositeOp {
    /// Comparison, logical operator, `IN`, `IS`, `LIKE`, `EXISTS`
    Predicate,
    /// Arithmetic, parentheses, `CASE`: type of the first typed operand
    FirstOperand,
}

#[derive(Debug, Clone)]
pub(crate) enum ValueExpression {
    ColumnReference(ColumnReferenceExpr),
    TupleReference(TupleReferenceExpr),
    FunctionCall(FunctionCallExpr),
    MemberAccess(MemberAccessExpr),
    Composite {
        op: CompositeOp,
        children: Vec<ValueExprId>,
    },
    Literal(Option<DataType>),
    Variable {
        entry: SymbolEntryId,
        class: SymbolClass,
    },
    Subquery(QueryScopeId),
}

impl ValueExpression {
    fn children(&self) -> &[ValueExprId] {
        match self {
            ValueExpression::FunctionCall(call) => &call.arguments,
            ValueExpression::MemberAccess(access) => std::slice::from_ref(&access.base),
            ValueExpression::Composite { children, .. } => children,
            _ => &[],
        }
    }
}

impl ValueExpressionModel for ValueExpression {
    fn resolve_row_sources(&mut self, ctx: &mut AnalysisContext<'_>) -> SemanticResult<()> {
        match self {
            ValueExpression::ColumnReference(expr) => expr.resolve_row_sources(ctx),
            ValueExpression::TupleReference(expr) => expr.resolve_row_sources(ctx),
            ValueExpression::FunctionCall(expr) => expr.resolve_row_sources(ctx),
            ValueExpression::MemberAccess(expr) => expr.resolve_row_sources(ctx),
            _ => Ok(()),
        }
    }

    fn resolve_value_type(
        &mut self,
        ctx: &mut AnalysisContext<'_>,
        operands: &[Option<DataType>],
    ) -> SemanticResult<Option<DataType>> {
        match self {
            ValueExpression::ColumnReference(expr) => expr.resolve_value_type(ctx, operands),
            ValueExpression::TupleReference(expr) => expr.resolve_value_type(ctx, operands),
            ValueExpression::FunctionCall(expr) => expr.resolve_value_type(ctx, operands),
            ValueExpression::MemberAccess(expr) => expr.resolve_value_type(ctx, operands),
            ValueExpression::Composite { op, .. } => Ok(match op {
                CompositeOp::Predicate => Some(DataType::Boolean),
                CompositeOp::FirstOperand => operands.iter().flatten().next().cloned(),
            }),
            ValueExpression::Literal(data_type) => Ok(data_type.clone()),
            ValueExpression::Variable { entry, class } => {
                ctx.classify(*entry, *class);
                let name = ctx.symbols.entry(*entry).raw_name.clone();
                ctx.symbols
                    .set_definition(*entry, SymbolDefinition::Variable(name));
                Ok(None)
            }
            ValueExpression::Subquery(query) => Ok(ctx
                .rows
                .query(*query)
                .result
                .first()
                .and_then(|c| c.data_type.clone())),
        }
    }
}

/// Post-order arena of the expressions of one query
#[derive(Debug, Clone, Default)]
pub(crate) struct ValueExpressions {
    exprs: Vec<ValueExpression>,
    types: Vec<Option<DataType>>,
}

enum Frame<'t> {
    Enter(SyntaxNode<'t>),
    /// Results above the recorded length are the node's operands
    Exit(PendingExpr<'t>, usize),
}

enum PendingExpr<'t> {
    Call {
        name: QualifiedName,
        range: TextRange,
    },
    Member(SyntaxNode<'t>),
    Composite(CompositeOp),
}

const PREDICATE_OPERATORS: &[&str] = &[
    "=", "<>", "!=", "<", ">", "<=", ">=", "AND", "OR", "NOT", "LIKE", "ILIKE", "IN", "IS",
    "BETWEEN", "EXISTS",
];

fn composite_op(node: SyntaxNode<'_>) -> CompositeOp {
    if node.kind() == NodeKind::InList {
        return CompositeOp::Predicate;
    }
    let predicate = node.children().any(|child| {
        matches!(child.kind(), NodeKind::Operator | NodeKind::Keyword)
            && PREDICATE_OPERATORS
                .iter()
                .any(|op| child.text().eq_ignore_ascii_case(op))
    });
    if predicate && node.kind() != NodeKind::CaseExpression {
        CompositeOp::Predicate
    } else {
        CompositeOp::FirstOperand
    }
}

fn literal_type(node: SyntaxNode<'_>) -> Option<DataType> {
    let text = node.text();
    if node.kind() == NodeKind::StringLiteral || text.starts_with('\'') {
        return Some(DataType::Text);
    }
    if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
        return Some(DataType::Boolean);
    }
    if text.eq_ignore_ascii_case("null") {
        return None;
    }
    if text.parse::<i64>().is_ok() {
        return Some(DataType::Integer);
    }
    if text.parse::<f64>().is_ok() {
        return Some(DataType::Decimal);
    }
    None
}

/// Whether a child node takes part in an expression
fn is_operand(kind: NodeKind) -> bool {
    !matches!(
        kind,
        NodeKind::Keyword
            | NodeKind::Operator
            | NodeKind::Comma
            | NodeKind::LeftParen
            | NodeKind::RightParen
            | NodeKind::Semicolon
            | NodeKind::Period
    )
}

fn operand_children(node: SyntaxNode<'_>) -> Vec<SyntaxNode<'_>> {
    node.children_skip_errors()
        .into_iter()
        .filter(|child| is_operand(child.kind()))
        .collect()
}

impl ValueExpressions {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, id: ValueExprId) -> &ValueExpression {
        &self.exprs[id.0 as usize]
    }

    /// Type computed in phase two
    pub(crate) fn value_type(&self, id: ValueExprId) -> Option<&DataType> {
        self.types.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub(crate) fn push(&mut self, expr: ValueExpression) -> ValueExprId {
        let id = ValueExprId(self.exprs.len() as u32);
        self.exprs.push(expr);
        id
    }

    /// Column this expression exposes when used as a select item
    pub(crate) fn result_column(&self, id: ValueExprId) -> Option<ResultColumn> {
        match self.get(id) {
            ValueExpression::ColumnReference(expr) => expr.resolved.clone().or_else(|| {
                expr.name
                    .raw_parts()
                    .last()
                    .filter(|raw| !raw.is_empty())
                    .map(|raw| ResultColumn::new(raw.clone()))
            }),
            ValueExpression::FunctionCall(call) => call.display_name().map(|name| {
                ResultColumn::new(name.to_lowercase())
                    .with_data_type(self.value_type(id).cloned())
            }),
            _ => None,
        }
    }

    /// Run both resolution phases over every expression
    pub(crate) fn resolve(&mut self, ctx: &mut AnalysisContext<'_>) -> SemanticResult<()> {
        for expr in &mut self.exprs {
            ctx.check_canceled()?;
            expr.resolve_row_sources(ctx)?;
        }
        self.types.clear();
        for index in 0..self.exprs.len() {
            let operands: Vec<Option<DataType>> = self.exprs[index]
                .children()
                .iter()
                .map(|child| self.types.get(child.0 as usize).cloned().flatten())
                .collect();
            let data_type = self.exprs[index].resolve_value_type(ctx, &operands)?;
            self.types.push(data_type);
        }
        Ok(())
    }
}

impl AnalysisContext<'_> {
    /// Flatten the expression rooted at `root` into `exprs`
    ///
    /// Returns `None` when the node holds no expression.
    pub(crate) fn build_expression(
        &mut self,
        exprs: &mut ValueExpressions,
        root: SyntaxNode<'_>,
        query: QueryScopeId,
        sees_result_aliases: bool,
    ) -> SemanticResult<Option<ValueExprId>> {
        let mut frames = vec![Frame::Enter(root)];
        let mut results: Vec<ValueExprId> = Vec::new();

        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Enter(node) => match node.kind() {
                    kind if kind.is_name_container() || kind.is_identifier() => {
                        if let Some(name) = self.collect_name(node) {
                            let expr = ColumnReferenceExpr::new(name, query, sees_result_aliases);
                            results.push(exprs.push(ValueExpression::ColumnReference(expr)));
                        }
                    }
                    NodeKind::TupleReference | NodeKind::Asterisk => {
                        let qualifier = if node.kind() == NodeKind::TupleReference {
                            self.collect_tuple_qualifier(node)
                        } else {
                            None
                        };
                        let star = node
                            .descendants()
                            .find(|n| n.kind() == NodeKind::Asterisk)
                            .map(|n| n.range())
                            .unwrap_or_else(|| node.range());
                        let marker = self.new_marker(LexicalItemKind::TupleReference, star);
                        let expr = TupleReferenceExpr::new(qualifier, query, marker);
                        results.push(exprs.push(ValueExpression::TupleReference(expr)));
                    }
                    NodeKind::FunctionCall => {
                        let name_node = node.children_skip_errors().into_iter().find(|c| {
                            c.kind().is_name_container()
                                || c.kind().is_identifier()
                                || c.kind() == NodeKind::Keyword
                        });
                        let Some(name) = name_node.and_then(|n| self.collect_name(n)) else {
                            continue;
                        };
                        // `count(*)` takes no column argument
                        let arguments: Vec<SyntaxNode<'_>> = node
                            .first_child_of_kind(NodeKind::ArgumentList)
                            .map(operand_children)
                            .unwrap_or_default()
                            .into_iter()
                            .filter(|a| a.kind() != NodeKind::Asterisk)
                            .collect();
                        frames.push(Frame::Exit(
                            PendingExpr::Call {
                                name,
                                range: node.range(),
                            },
                            results.len(),
                        ));
                        frames.extend(arguments.into_iter().rev().map(Frame::Enter));
                    }
                    NodeKind::MemberAccess => {
                        let Some(base) = operand_children(node).first().copied() else {
                            continue;
                        };
                        frames.push(Frame::Exit(PendingExpr::Member(node), results.len()));
                        frames.push(Frame::Enter(base));
                    }
                    NodeKind::Literal | NodeKind::StringLiteral => {
                        results.push(exprs.push(ValueExpression::Literal(literal_type(node))));
                    }
                    NodeKind::BatchVariable
                    | NodeKind::ExternalVariable
                    | NodeKind::ExternalParameter => {
                        let class = match node.kind() {
                            NodeKind::BatchVariable => SymbolClass::BatchVariable,
                            NodeKind::ExternalVariable => SymbolClass::ExternalVariable,
                            _ => SymbolClass::ExternalParameter,
                        };
                        let entry = self.new_entry(node, None);
                        results.push(exprs.push(ValueExpression::Variable { entry, class }));
                    }
                    NodeKind::ScalarSubquery => {
                        let subquery = self.build_subquery(node, Some(query), true)?;
                        results.push(exprs.push(ValueExpression::Subquery(subquery)));
                    }
                    kind if kind.is_terminal() => {}
                    _ => {
                        let children = operand_children(node);
                        if children.is_empty() {
                            continue;
                        }
                        frames.push(Frame::Exit(
                            PendingExpr::Composite(composite_op(node)),
                            results.len(),
                        ));
                        frames.extend(children.into_iter().rev().map(Frame::Enter));
                    }
                },
                Frame::Exit(pending, base) => {
                    let children = results.split_off(base.min(results.len()));
                    let expr = match pending {
                        PendingExpr::Call { name, range } => ValueExpression::FunctionCall(
                            FunctionCallExpr::new(name, query, children, range),
                        ),
                        PendingExpr::Member(node) => {
                            let Some(&base) = children.first() else {
                                continue;
                            };
                            let (field, marker) = self.collect_member(node);
                            ValueExpression::MemberAccess(MemberAccessExpr {
                                base,
                                field,
                                marker,
                            })
                        }
                        PendingExpr::Composite(op) => ValueExpression::Composite { op, children },
                    };
                    results.push(exprs.push(expr));
                }
            }
        }
        Ok(results.pop())
    }

    /// Field name of `(expr).field`, or the dangling period of `(expr).`
    fn collect_member(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> (Option<SymbolEntryId>, Option<LexicalItemId>) {
        let children = node.children_skip_errors();
        let Some(period) = children.iter().rev().find(|c| c.kind() == NodeKind::Period) else {
            return (None, None);
        };
        let field = children
            .iter()
            .filter(|c| c.range().start >= period.range().end)
            .find(|c| c.kind().is_identifier() || c.kind() == NodeKind::Keyword);
        match field {
            Some(field) => (Some(self.new_entry(*field, Some(period.range()))), None),
            None => (
                None,
                Some(self.new_marker(LexicalItemKind::MemberAccess, period.range())),
            ),
        }
    }
}
