// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Heuristic classification
//!
//! Used when no statement model could be built. Names are classified from the
//! syntax alone: correlation names become aliases, table names tables, and
//! dotted column names are matched against both. Metadata is never consulted.

use std::collections::HashSet;

use sql_insight_ir::{NodeKind, SyntaxNode};
use tracing::debug;

use crate::context::AnalysisContext;
use crate::error::SemanticResult;
use crate::origin::SymbolOrigin;
use crate::qualified_name::QualifiedName;
use crate::symbol::{SymbolClass, SymbolEntryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NameRole {
    Table,
    Alias,
    Column,
}

impl AnalysisContext<'_> {
    /// Classify every name under `root` without a statement model
    pub(crate) fn classify_heuristically(&mut self, root: SyntaxNode<'_>) -> SemanticResult<()> {
        let names = self.collect_heuristic_names(root)?;

        let tables: Vec<Vec<String>> = names
            .iter()
            .filter(|(role, _)| *role == NameRole::Table)
            .map(|(_, name)| name.canonical_prefix(&self.symbols, name.valid_leading_parts()))
            .collect();
        let aliases: HashSet<String> = names
            .iter()
            .filter(|(role, _)| *role == NameRole::Alias)
            .filter_map(|(_, name)| name.first())
            .map(|entry| self.symbols.entry(entry).name.clone())
            .collect();
        debug!(
            "Heuristic classification: {} names, {} tables, {} aliases",
            names.len(),
            tables.len(),
            aliases.len()
        );

        for (role, name) in &names {
            match role {
                NameRole::Alias => {
                    for entry in name.entries() {
                        self.classify(entry, SymbolClass::TableAlias);
                    }
                }
                NameRole::Table => self.classify_table_parts(name, name.len()),
                NameRole::Column => self.classify_column_heuristically(name, &tables, &aliases),
            }
            for entry in name.entries() {
                self.set_origin(entry, SymbolOrigin::SyntaxFallback);
            }
        }

        let remaining: Vec<SymbolEntryId> = self
            .symbols
            .entries()
            .filter(|entry| !self.symbols.class_of(entry.id).is_classified())
            .map(|entry| entry.id)
            .collect();
        for entry in remaining {
            let raw = self.symbols.entry(entry).raw_name.clone();
            let class = if self.dialect.is_string_literal(&raw) {
                SymbolClass::String
            } else if self.symbols.entry(entry).quoted {
                SymbolClass::Quoted
            } else {
                SymbolClass::Column
            };
            self.classify(entry, class);
        }
        Ok(())
    }

    /// Names under `root` in text order, with the role their container implies
    fn collect_heuristic_names(
        &mut self,
        root: SyntaxNode<'_>,
    ) -> SemanticResult<Vec<(NameRole, QualifiedName)>> {
        let mut names = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            self.check_canceled()?;
            let role = match node.kind() {
                NodeKind::TableName => Some(NameRole::Table),
                NodeKind::CorrelationName => Some(NameRole::Alias),
                NodeKind::ColumnName | NodeKind::ColumnReference | NodeKind::QualifiedName => {
                    Some(NameRole::Column)
                }
                NodeKind::Identifier | NodeKind::QuotedIdentifier => Some(NameRole::Column),
                _ => None,
            };
            if let Some(role) = role {
                if let Some(name) = self.collect_name(node) {
                    names.push((role, name));
                }
                continue;
            }
            let mut children: Vec<SyntaxNode<'_>> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        Ok(names)
    }

    /// First `len` parts: the last one TABLE, earlier ones SCHEMA / CATALOG
    fn classify_table_parts(&mut self, name: &QualifiedName, len: usize) {
        let entries: Vec<SymbolEntryId> = name.parts()[..len].iter().flatten().copied().collect();
        let Some((&table, containers)) = entries.split_last() else {
            return;
        };
        self.classify(table, SymbolClass::Table);
        let count = containers.len();
        for (index, entry) in containers.iter().enumerate() {
            let class = if count == 2 && index == 0 {
                SymbolClass::Catalog
            } else {
                SymbolClass::Schema
            };
            self.classify(*entry, class);
        }
    }

    fn classify_column_heuristically(
        &mut self,
        name: &QualifiedName,
        tables: &[Vec<String>],
        aliases: &HashSet<String>,
    ) {
        let valid = name.valid_leading_parts();
        if valid == 0 {
            return;
        }
        let parts = name.canonical_prefix(&self.symbols, valid);

        if name.len() > 1 && aliases.contains(&parts[0]) {
            if let Some(first) = name.first() {
                self.classify(first, SymbolClass::TableAlias);
            }
            return;
        }
        // Longest prefix naming a table seen in the statement; the rest
        // falls through to the default classes
        let longest = valid.min(name.len().saturating_sub(1));
        for len in (1..=longest).rev() {
            let prefix = &parts[..len];
            let known = tables
                .iter()
                .any(|table| table.len() >= len && table[table.len() - len..] == *prefix);
            if known {
                self.classify_table_parts(name, len);
                return;
            }
        }
    }
}
