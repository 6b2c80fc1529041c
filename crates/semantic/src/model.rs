// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Semantic model
//!
//! The finished, read-only result of one `recognize` call. Completion and
//! syntax highlighting consume it; nothing mutates it afterwards.

use std::sync::Arc;

use serde::Serialize;
use sql_insight_ir::{DbObject, SqlDialect, SyntaxTree, TextRange};

use crate::builder::StatementContent;
use crate::context::AnalysisParts;
use crate::diagnostics::Diagnostic;
use crate::lexical::{LexicalIndex, LexicalItem};
use crate::rows::{QueryScopeId, RowsModel};
use crate::symbol::{
    SymbolClass, SymbolDefinition, SymbolEntry, SymbolEntryId, SymbolTable, TokenType,
};

/// Highlighting token of one identifier occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SemanticToken {
    pub range: TextRange,
    pub token_type: TokenType,
    pub class: SymbolClass,
}

pub struct SemanticModel {
    tree: SyntaxTree,
    content: Option<StatementContent>,
    symbols: SymbolTable,
    lexical: LexicalIndex,
    rows: RowsModel,
    diagnostics: Vec<Diagnostic>,
    dialect: Arc<dyn SqlDialect>,
}

impl std::fmt::Debug for SemanticModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticModel")
            .field("content", &self.content)
            .field("symbols", &self.symbols.len())
            .field("diagnostics", &self.diagnostics)
            .field("dialect", &self.dialect.name())
            .finish()
    }
}

impl SemanticModel {
    /// Model without content or symbols (blank or degenerate input)
    pub fn empty(tree: SyntaxTree, dialect: Arc<dyn SqlDialect>) -> Self {
        Self {
            tree,
            content: None,
            symbols: SymbolTable::new(),
            lexical: LexicalIndex::new(),
            rows: RowsModel::default(),
            diagnostics: Vec::new(),
            dialect,
        }
    }

    pub(crate) fn from_parts(
        tree: SyntaxTree,
        content: Option<StatementContent>,
        parts: AnalysisParts,
        dialect: Arc<dyn SqlDialect>,
    ) -> Self {
        Self {
            tree,
            content,
            symbols: parts.symbols,
            lexical: parts.lexical,
            rows: parts.rows,
            diagnostics: parts.diagnostics,
            dialect,
        }
    }

    pub fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    pub fn source(&self) -> &str {
        self.tree.source()
    }

    /// Statement summary; `None` when recognition fell back to heuristics
    pub fn content(&self) -> Option<&StatementContent> {
        self.content.as_ref()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn lexical(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn rows(&self) -> &RowsModel {
        &self.rows
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn dialect(&self) -> &dyn SqlDialect {
        self.dialect.as_ref()
    }

    pub fn entry(&self, id: SymbolEntryId) -> &SymbolEntry {
        self.symbols.entry(id)
    }

    pub fn class_of(&self, id: SymbolEntryId) -> SymbolClass {
        self.symbols.class_of(id)
    }

    /// Lexical item covering or ending at `offset`
    pub fn lexical_item_at(&self, offset: usize) -> Option<&LexicalItem> {
        self.lexical.item_at(offset)
    }

    /// Identifier occurrence covering or ending at `offset`
    pub fn symbol_at(&self, offset: usize) -> Option<&SymbolEntry> {
        let item = self.lexical.item_at(offset)?;
        item.symbol().map(|id| self.symbols.entry(id))
    }

    /// Final definition of an occurrence, following alias chains
    pub fn definition_of(&self, id: SymbolEntryId) -> Option<&SymbolDefinition> {
        self.symbols.resolve_definition(id)
    }

    /// Catalog object an occurrence finally denotes
    pub fn object_of(&self, id: SymbolEntryId) -> Option<&Arc<DbObject>> {
        self.symbols.resolved_object(id)
    }

    /// Occurrences spelled `raw` (as written), in text order
    pub fn occurrences<'a>(&'a self, raw: &'a str) -> impl Iterator<Item = &'a SymbolEntry> + 'a {
        let mut found: Vec<&SymbolEntry> = self
            .lexical
            .items()
            .filter_map(|item| item.symbol())
            .map(|id| self.symbols.entry(id))
            .filter(|entry| entry.raw_name == raw)
            .collect();
        found.sort_by_key(|entry| entry.range.start);
        found.into_iter()
    }

    /// Query scope enclosing `offset`
    pub fn query_at(&self, offset: usize) -> Option<QueryScopeId> {
        self.lexical
            .query_at(offset)
            .or_else(|| self.content.as_ref().map(|content| content.query))
    }

    /// Highlighting tokens in source order
    pub fn semantic_tokens(&self) -> Vec<SemanticToken> {
        let mut tokens: Vec<SemanticToken> = self
            .symbols
            .entries()
            .map(|entry| {
                let class = self.symbols.class_of(entry.id);
                SemanticToken {
                    range: entry.range,
                    token_type: class.token_type(),
                    class,
                }
            })
            .collect();
        tokens.sort_by_key(|token| (token.range.start, token.range.end));
        tokens
    }
}
