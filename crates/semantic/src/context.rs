// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Analysis context
//!
//! All mutable state of one `recognize` call lives here: the symbol table, the
//! lexical index, the rows model and the diagnostics sink. Builders are `impl`
//! blocks on [`AnalysisContext`] spread over the `builder` modules.

use std::sync::Arc;

use sql_insight_catalog::{CatalogResult, MetadataProvider};
use sql_insight_ir::cancel;
use sql_insight_ir::{
    CancellationMonitor, DbObject, ObjectKindSet, SqlDialect, SyntaxNode, TextRange,
};
use tracing::warn;

use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{SemanticError, SemanticResult};
use crate::lexical::{LexicalIndex, LexicalItemId, LexicalItemKind, LexicalScopeId, ScopeKind};
use crate::origin::SymbolOrigin;
use crate::rows::{QueryScopeId, RowsModel};
use crate::settings::AnalyzerSettings;
use crate::symbol::{SymbolClass, SymbolEntryId, SymbolTable};

/// Output of a finished analysis
pub(crate) struct AnalysisParts {
    pub symbols: SymbolTable,
    pub lexical: LexicalIndex,
    pub rows: RowsModel,
    pub diagnostics: Vec<Diagnostic>,
}

pub(crate) struct AnalysisContext<'a> {
    pub(crate) dialect: &'a dyn SqlDialect,
    pub(crate) provider: &'a dyn MetadataProvider,
    pub(crate) monitor: &'a dyn CancellationMonitor,
    pub(crate) settings: &'a AnalyzerSettings,
    pub(crate) symbols: SymbolTable,
    pub(crate) lexical: LexicalIndex,
    pub(crate) rows: RowsModel,
    pub(crate) diagnostics: Vec<Diagnostic>,
    /// Not-found diagnostics are dropped (`DROP ... IF EXISTS`)
    pub(crate) quiet: bool,
    scopes: Vec<LexicalScopeId>,
    depth: usize,
}

impl<'a> AnalysisContext<'a> {
    pub(crate) fn new(
        dialect: &'a dyn SqlDialect,
        provider: &'a dyn MetadataProvider,
        monitor: &'a dyn CancellationMonitor,
        settings: &'a AnalyzerSettings,
    ) -> Self {
        Self {
            dialect,
            provider,
            monitor,
            settings,
            symbols: SymbolTable::new(),
            lexical: LexicalIndex::new(),
            rows: RowsModel::default(),
            diagnostics: Vec::new(),
            quiet: false,
            scopes: Vec::new(),
            depth: 0,
        }
    }

    pub(crate) fn into_parts(self) -> AnalysisParts {
        AnalysisParts {
            symbols: self.symbols,
            lexical: self.lexical,
            rows: self.rows,
            diagnostics: self.diagnostics,
        }
    }

    pub(crate) fn check_canceled(&self) -> SemanticResult<()> {
        cancel::check(self.monitor)?;
        Ok(())
    }

    // ---- scopes ----

    pub(crate) fn open_scope(
        &mut self,
        kind: ScopeKind,
        range: TextRange,
        query: Option<QueryScopeId>,
    ) -> LexicalScopeId {
        let parent = self.scopes.last().copied();
        let id = self.lexical.add_scope(kind, range, parent, query);
        self.scopes.push(id);
        id
    }

    pub(crate) fn close_scope(&mut self) {
        self.scopes.pop();
    }

    /// Run `f` inside a new lexical scope
    pub(crate) fn in_scope<T>(
        &mut self,
        kind: ScopeKind,
        range: TextRange,
        query: Option<QueryScopeId>,
        f: impl FnOnce(&mut Self) -> SemanticResult<T>,
    ) -> SemanticResult<T> {
        self.open_scope(kind, range, query);
        let result = f(self);
        self.close_scope();
        result
    }

    /// Enter one more level of query nesting
    pub(crate) fn descend(&mut self) -> SemanticResult<()> {
        self.check_canceled()?;
        self.depth += 1;
        if self.depth > self.settings.max_expression_depth {
            return Err(SemanticError::DepthLimitExceeded {
                limit: self.settings.max_expression_depth,
            });
        }
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    // ---- entries and items ----

    /// Register an identifier occurrence
    pub(crate) fn new_entry(
        &mut self,
        node: SyntaxNode<'_>,
        period: Option<TextRange>,
    ) -> SymbolEntryId {
        let raw = node.text();
        let canonical = self.dialect.canonicalize_identifier(raw);
        let entry = self.symbols.next_entry_id();
        let scope = self.scopes.last().copied();
        let item = self
            .lexical
            .add_item(LexicalItemKind::Symbol(entry), node.range(), scope);
        self.symbols
            .add_entry(node.range(), raw, canonical, period, item)
    }

    /// Register a dangling period or `*` marker
    pub(crate) fn new_marker(&mut self, kind: LexicalItemKind, range: TextRange) -> LexicalItemId {
        let scope = self.scopes.last().copied();
        self.lexical.add_item(kind, range, scope)
    }

    /// Assign an origin to an occurrence unless it already has one
    pub(crate) fn set_origin(&mut self, entry: SymbolEntryId, origin: SymbolOrigin) {
        let item = self.symbols.entry(entry).lexical_item();
        self.lexical.set_origin(item, origin);
    }

    pub(crate) fn classify(&mut self, entry: SymbolEntryId, class: SymbolClass) {
        self.symbols.set_class(entry, class);
    }

    pub(crate) fn report(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Not-found diagnostic, subject to `report_unresolved`
    pub(crate) fn report_not_found(&mut self, range: TextRange, message: String) {
        if self.settings.report_unresolved && !self.quiet {
            self.report(Diagnostic::error(range, DiagnosticCode::NotFound, message));
        }
    }

    // ---- metadata ----

    /// Call the metadata provider, turning failures into diagnostics
    ///
    /// Cancellation aborts the analysis; any other failure yields `Ok(None)`
    /// and a diagnostic on `range`.
    pub(crate) fn metadata<T>(
        &mut self,
        range: TextRange,
        call: impl FnOnce(&dyn MetadataProvider, &dyn CancellationMonitor) -> CatalogResult<T>,
    ) -> SemanticResult<Option<T>> {
        self.check_canceled()?;
        match call(self.provider, self.monitor) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_canceled() => Err(SemanticError::Canceled),
            Err(e) => {
                warn!("Metadata access failed at {}: {}", range, e);
                self.report(Diagnostic::warning(
                    range,
                    DiagnosticCode::MetadataAccess,
                    format!("Metadata unavailable: {}", e),
                ));
                Ok(None)
            }
        }
    }

    pub(crate) fn find_objects(
        &mut self,
        range: TextRange,
        allowed: ObjectKindSet,
        parts: &[String],
    ) -> SemanticResult<Option<Vec<Arc<DbObject>>>> {
        self.metadata(range, |provider, monitor| {
            provider.find_real_objects(monitor, allowed, parts)
        })
    }

    pub(crate) fn attributes(
        &mut self,
        range: TextRange,
        entity: &DbObject,
    ) -> SemanticResult<Option<Vec<Arc<DbObject>>>> {
        self.metadata(range, |provider, monitor| provider.attributes(monitor, entity))
    }
}
