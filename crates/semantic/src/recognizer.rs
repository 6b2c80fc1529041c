// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Model recognizer
//!
//! Entry point of the semantic layer. Invalid SQL never makes recognition
//! fail: a statement that cannot be modeled is classified heuristically and
//! the reason is reported as a diagnostic. Only cancellation aborts.

use std::sync::Arc;

use sql_insight_catalog::MetadataProvider;
use sql_insight_ir::{CancellationMonitor, NodeKind, Parser, SqlDialect, SyntaxNode, SyntaxTree};
use tracing::{debug, instrument, warn};

use crate::builder::StatementKind;
use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::{SemanticError, SemanticResult};
use crate::model::SemanticModel;
use crate::settings::AnalyzerSettings;
use crate::symbol::{SymbolClass, SymbolEntryId};

/// Builds [`SemanticModel`]s against one metadata provider and dialect
///
/// The recognizer holds no per-analysis state; one instance may serve any
/// number of documents.
#[derive(Clone)]
pub struct ModelRecognizer {
    provider: Arc<dyn MetadataProvider>,
    dialect: Arc<dyn SqlDialect>,
    settings: AnalyzerSettings,
}

impl ModelRecognizer {
    /// Recognizer using the dialect named in `settings`
    pub fn new(provider: Arc<dyn MetadataProvider>, settings: AnalyzerSettings) -> Self {
        Self {
            provider,
            dialect: Arc::new(settings.dialect),
            settings,
        }
    }

    /// Builder method: use a custom dialect description
    pub fn with_dialect(mut self, dialect: Arc<dyn SqlDialect>) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn provider(&self) -> &dyn MetadataProvider {
        self.provider.as_ref()
    }

    /// Parse `text` and recognize the resulting tree
    #[instrument(skip(self, parser, text, monitor), fields(len = text.len()))]
    pub fn recognize(
        &self,
        parser: &dyn Parser,
        text: &str,
        monitor: &dyn CancellationMonitor,
    ) -> SemanticResult<SemanticModel> {
        let tree = parser.parse(text).unwrap_or_else(|| SyntaxTree::empty(text));
        self.recognize_tree(tree, monitor)
    }

    /// Recognize an already parsed tree
    #[instrument(skip_all, fields(nodes = tree.node_count()))]
    pub fn recognize_tree(
        &self,
        tree: SyntaxTree,
        monitor: &dyn CancellationMonitor,
    ) -> SemanticResult<SemanticModel> {
        if monitor.is_canceled() {
            return Err(SemanticError::Canceled);
        }
        let Some(root) = tree.root().filter(|_| !tree.is_degenerate()) else {
            debug!("Degenerate tree, returning an empty model");
            return Ok(SemanticModel::empty(tree, self.dialect.clone()));
        };

        let dialect = self.dialect.as_ref();
        let provider = self.provider.as_ref();
        let mut ctx = AnalysisContext::new(dialect, provider, monitor, &self.settings);
        let built = match statement_node(root) {
            Some(statement) => ctx.build_statement(statement),
            None => Err(SemanticError::UnsupportedStatement(first_production(root))),
        };

        let (content, parts) = match built {
            Ok(content) => {
                reclassify_keywords(&mut ctx);
                (Some(content), ctx.into_parts())
            }
            Err(SemanticError::Canceled) => return Err(SemanticError::Canceled),
            Err(error) => {
                match &error {
                    SemanticError::UnsupportedStatement(_) => {
                        debug!("Heuristic fallback: {}", error)
                    }
                    _ => warn!("Heuristic fallback: {}", error),
                }
                let mut fallback = AnalysisContext::new(dialect, provider, monitor, &self.settings);
                fallback.classify_heuristically(root)?;
                let code = match error {
                    SemanticError::DepthLimitExceeded { .. } => DiagnosticCode::DepthLimit,
                    _ => DiagnosticCode::Unrecognized,
                };
                fallback.report(Diagnostic::warning(root.range(), code, error.to_string()));
                (None, fallback.into_parts())
            }
        };
        debug!(
            "Recognized {} symbols, {} diagnostics",
            parts.symbols.len(),
            parts.diagnostics.len()
        );
        Ok(SemanticModel::from_parts(tree, content, parts, self.dialect.clone()))
    }
}

/// Outermost statement production under `root`
fn statement_node(root: SyntaxNode<'_>) -> Option<SyntaxNode<'_>> {
    if StatementKind::from_node(root.kind()).is_some() {
        return Some(root);
    }
    root.children_skip_errors()
        .into_iter()
        .find(|child| StatementKind::from_node(child.kind()).is_some())
}

/// Name of the first meaningful production, for diagnostics
fn first_production(root: SyntaxNode<'_>) -> String {
    root.children_skip_errors()
        .into_iter()
        .find(|child| child.kind() != NodeKind::Semicolon)
        .map(|child| match child.kind() {
            NodeKind::Keyword => child.text().to_ascii_uppercase(),
            kind => kind.to_string(),
        })
        .unwrap_or_else(|| root.kind().to_string())
}

/// Promote unclassified unquoted keywords used as identifiers to RESERVED
fn reclassify_keywords(ctx: &mut AnalysisContext<'_>) {
    let promoted: Vec<SymbolEntryId> = ctx
        .symbols
        .entries()
        .filter(|entry| {
            !entry.quoted
                && !ctx.symbols.class_of(entry.id).is_classified()
                && ctx.dialect.is_reserved(&entry.name)
        })
        .map(|entry| entry.id)
        .collect();
    for entry in promoted {
        ctx.symbols.override_class(entry, SymbolClass::Reserved);
    }
}
