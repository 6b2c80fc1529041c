// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Lexical scopes and items
//!
//! Scope-sensitive artifacts (identifier occurrences, dangling periods, `*`
//! markers) are indexed by start offset so the item under a cursor is found in
//! `O(log n)`. Scopes nest along the syntax: each query and each of its clauses
//! opens one.

use serde::Serialize;
use sql_insight_ir::TextRange;
use std::collections::BTreeMap;

use crate::origin::SymbolOrigin;
use crate::rows::QueryScopeId;
use crate::symbol::SymbolEntryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct LexicalItemId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LexicalScopeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexicalItemKind {
    /// Identifier occurrence
    Symbol(SymbolEntryId),
    /// Dangling period closing a dotted name
    MemberAccess,
    /// `*` standing for a whole row
    TupleReference,
}

#[derive(Debug, Clone)]
pub struct LexicalItem {
    pub id: LexicalItemId,
    pub kind: LexicalItemKind,
    pub range: TextRange,
    pub scope: Option<LexicalScopeId>,
    origin: Option<SymbolOrigin>,
}

impl LexicalItem {
    pub fn origin(&self) -> Option<&SymbolOrigin> {
        self.origin.as_ref()
    }

    pub fn symbol(&self) -> Option<SymbolEntryId> {
        match self.kind {
            LexicalItemKind::Symbol(entry) => Some(entry),
            _ => None,
        }
    }
}

/// Syntactic role of a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScopeKind {
    Statement,
    Query,
    SelectList,
    From,
    JoinCondition,
    Filter,
    GroupBy,
    OrderBy,
    Values,
    ColumnList,
    Assignments,
    Expression,
}

#[derive(Debug, Clone)]
pub struct LexicalScope {
    pub id: LexicalScopeId,
    pub kind: ScopeKind,
    pub range: TextRange,
    pub parent: Option<LexicalScopeId>,
    pub query: Option<QueryScopeId>,
    pub items: Vec<LexicalItemId>,
}

/// Ordered item map plus scope tree of one model
#[derive(Debug, Clone, Default)]
pub struct LexicalIndex {
    items: Vec<LexicalItem>,
    by_offset: BTreeMap<usize, LexicalItemId>,
    scopes: Vec<LexicalScope>,
}

impl LexicalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_item(
        &mut self,
        kind: LexicalItemKind,
        range: TextRange,
        scope: Option<LexicalScopeId>,
    ) -> LexicalItemId {
        let id = LexicalItemId(self.items.len() as u32);
        self.items.push(LexicalItem {
            id,
            kind,
            range,
            scope,
            origin: None,
        });
        self.by_offset.entry(range.start).or_insert(id);
        if let Some(scope) = scope {
            self.scopes[scope.0 as usize].items.push(id);
        }
        id
    }

    pub fn item(&self, id: LexicalItemId) -> &LexicalItem {
        &self.items[id.0 as usize]
    }

    /// Items in source order
    pub fn items(&self) -> impl Iterator<Item = &LexicalItem> {
        self.by_offset.values().map(|id| self.item(*id))
    }

    /// Assign an origin once; later assignments are ignored
    pub fn set_origin(&mut self, id: LexicalItemId, origin: SymbolOrigin) -> bool {
        let item = &mut self.items[id.0 as usize];
        if item.origin.is_some() {
            return false;
        }
        item.origin = Some(origin);
        true
    }

    /// Item covering or ending at `offset`
    ///
    /// When one item ends where the next starts, an identifier is preferred over
    /// punctuation so a cursor right after `u` in `u.` lands on `u`.
    pub fn item_at(&self, offset: usize) -> Option<&LexicalItem> {
        let mut candidates = self
            .by_offset
            .range(..=offset)
            .rev()
            .take(2)
            .map(|(_, id)| self.item(*id))
            .filter(|item| item.range.touches(offset));
        let first = candidates.next()?;
        match candidates.next() {
            Some(previous)
                if first.range.start == offset
                    && !matches!(first.kind, LexicalItemKind::Symbol(_))
                    && matches!(previous.kind, LexicalItemKind::Symbol(_)) =>
            {
                Some(previous)
            }
            _ => Some(first),
        }
    }

    /// First item registered at exactly `offset`
    pub fn item_starting_at(&self, offset: usize) -> Option<LexicalItemId> {
        self.by_offset.get(&offset).copied()
    }

    pub fn add_scope(
        &mut self,
        kind: ScopeKind,
        range: TextRange,
        parent: Option<LexicalScopeId>,
        query: Option<QueryScopeId>,
    ) -> LexicalScopeId {
        let id = LexicalScopeId(self.scopes.len() as u32);
        self.scopes.push(LexicalScope {
            id,
            kind,
            range,
            parent,
            query,
            items: Vec::new(),
        });
        id
    }

    pub fn scope(&self, id: LexicalScopeId) -> &LexicalScope {
        &self.scopes[id.0 as usize]
    }

    pub fn scopes(&self) -> impl Iterator<Item = &LexicalScope> {
        self.scopes.iter()
    }

    /// Innermost scope touching `offset`
    pub fn scope_at(&self, offset: usize) -> Option<&LexicalScope> {
        self.scopes
            .iter()
            .filter(|scope| scope.range.touches(offset))
            .min_by(|a, b| {
                a.range
                    .len()
                    .cmp(&b.range.len())
                    .then(b.id.0.cmp(&a.id.0))
            })
    }

    /// Query of the innermost scope at `offset` that belongs to one
    pub fn query_at(&self, offset: usize) -> Option<QueryScopeId> {
        let mut scope = self.scope_at(offset);
        while let Some(current) = scope {
            if let Some(query) = current.query {
                return Some(query);
            }
            scope = current.parent.map(|p| self.scope(p));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_at_prefers_identifier_before_period() {
        let mut index = LexicalIndex::new();
        let ident = index.add_item(
            LexicalItemKind::Symbol(SymbolEntryId(0)),
            TextRange::new(7, 8),
            None,
        );
        let period = index.add_item(LexicalItemKind::MemberAccess, TextRange::new(8, 9), None);

        assert_eq!(index.item_at(8).map(|i| i.id), Some(ident));
        assert_eq!(index.item_at(9).map(|i| i.id), Some(period));
        assert_eq!(index.item_at(7).map(|i| i.id), Some(ident));
        assert!(index.item_at(12).is_none());
    }

    #[test]
    fn test_origin_is_assigned_once() {
        let mut index = LexicalIndex::new();
        let id = index.add_item(LexicalItemKind::MemberAccess, TextRange::new(0, 1), None);
        assert!(index.set_origin(id, SymbolOrigin::SyntaxFallback));
        assert!(!index.set_origin(id, SymbolOrigin::RowsDataRef { query: QueryScopeId(0) }));
        assert_eq!(index.item(id).origin(), Some(&SymbolOrigin::SyntaxFallback));
    }

    #[test]
    fn test_scope_at_picks_innermost() {
        let mut index = LexicalIndex::new();
        let outer = index.add_scope(
            ScopeKind::Query,
            TextRange::new(0, 50),
            None,
            Some(QueryScopeId(0)),
        );
        let inner = index.add_scope(ScopeKind::Filter, TextRange::new(20, 30), Some(outer), None);
        assert_eq!(index.scope_at(25).map(|s| s.id), Some(inner));
        assert_eq!(index.scope_at(40).map(|s| s.id), Some(outer));
        assert_eq!(index.query_at(25), Some(QueryScopeId(0)));
    }
}
