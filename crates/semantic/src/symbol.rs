// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Symbol types for semantic analysis
//!
//! Every identifier occurrence in the source becomes a [`SymbolEntry`]. Entries
//! point at a shared [`Symbol`] holding the classification, so an alias reference
//! and its declaration read the same class once they are linked.
//!
//! Classification is monotonic: a symbol never goes back to
//! [`SymbolClass::Unclassified`] once it has left it.

use serde::Serialize;
use sql_insight_ir::{CanonicalName, CompositeField, DbObject, ObjectKind, TextRange};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::trace;

use crate::lexical::LexicalItemId;
use crate::rows::{QueryScopeId, RowsSourceId};

/// Index of a symbol entry inside its model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SymbolEntryId(pub(crate) u32);

/// Index of a shared symbol inside its model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SymbolId(pub(crate) u32);

/// Resolved semantic kind of an identifier occurrence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SymbolClass {
    Unclassified,
    /// Keyword accepted positionally as an identifier
    Reserved,
    Keyword,
    String,
    Quoted,
    Catalog,
    Schema,
    Table,
    TableAlias,
    Column,
    ColumnDerived,
    CompositeField,
    Function,
    /// Sequences, data types and other named objects
    Object,
    BatchVariable,
    ExternalVariable,
    ExternalParameter,
    Command,
    Error,
    Unknown,
}

impl SymbolClass {
    pub fn is_classified(self) -> bool {
        self != SymbolClass::Unclassified
    }

    /// Class of an occurrence that denotes a real object of `kind`
    pub fn for_object_kind(kind: ObjectKind) -> SymbolClass {
        match kind {
            ObjectKind::Catalog => SymbolClass::Catalog,
            ObjectKind::Schema => SymbolClass::Schema,
            ObjectKind::Table | ObjectKind::View => SymbolClass::Table,
            ObjectKind::Column => SymbolClass::Column,
            ObjectKind::Procedure | ObjectKind::Function => SymbolClass::Function,
            ObjectKind::Sequence | ObjectKind::DataType => SymbolClass::Object,
        }
    }

    /// Highlighting token for this class
    pub fn token_type(self) -> TokenType {
        match self {
            SymbolClass::Reserved | SymbolClass::Keyword => TokenType::Keyword,
            SymbolClass::String => TokenType::String,
            SymbolClass::Catalog | SymbolClass::Schema => TokenType::Schema,
            SymbolClass::Table => TokenType::Table,
            SymbolClass::TableAlias => TokenType::TableAlias,
            SymbolClass::Column => TokenType::Column,
            SymbolClass::ColumnDerived => TokenType::ColumnDerived,
            SymbolClass::CompositeField => TokenType::CompositeField,
            SymbolClass::Function => TokenType::Function,
            SymbolClass::Object => TokenType::Object,
            SymbolClass::BatchVariable => TokenType::BatchVariable,
            SymbolClass::ExternalVariable => TokenType::ExternalVariable,
            SymbolClass::ExternalParameter => TokenType::ExternalParameter,
            SymbolClass::Command => TokenType::Command,
            SymbolClass::Error => TokenType::SemanticError,
            SymbolClass::Quoted => TokenType::Quoted,
            SymbolClass::Unclassified | SymbolClass::Unknown => TokenType::Unknown,
        }
    }
}

/// Fixed token-type enumeration consumed by syntax highlighting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    Keyword,
    String,
    Schema,
    Table,
    Function,
    TableAlias,
    Column,
    ColumnDerived,
    CompositeField,
    BatchVariable,
    ExternalVariable,
    ExternalParameter,
    Command,
    SemanticError,
    Quoted,
    Object,
    Unknown,
}

impl TokenType {
    pub const ALL: [TokenType; 17] = [
        TokenType::Keyword,
        TokenType::String,
        TokenType::Schema,
        TokenType::Table,
        TokenType::Function,
        TokenType::TableAlias,
        TokenType::Column,
        TokenType::ColumnDerived,
        TokenType::CompositeField,
        TokenType::BatchVariable,
        TokenType::ExternalVariable,
        TokenType::ExternalParameter,
        TokenType::Command,
        TokenType::SemanticError,
        TokenType::Quoted,
        TokenType::Object,
        TokenType::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TokenType::Keyword => "keyword",
            TokenType::String => "string",
            TokenType::Schema => "schema",
            TokenType::Table => "table",
            TokenType::Function => "function",
            TokenType::TableAlias => "tableAlias",
            TokenType::Column => "column",
            TokenType::ColumnDerived => "columnDerived",
            TokenType::CompositeField => "compositeField",
            TokenType::BatchVariable => "batchVariable",
            TokenType::ExternalVariable => "externalVariable",
            TokenType::ExternalParameter => "externalParameter",
            TokenType::Command => "command",
            TokenType::SemanticError => "semanticError",
            TokenType::Quoted => "quoted",
            TokenType::Object => "object",
            TokenType::Unknown => "unknown",
        }
    }

    /// Position in [`TokenType::ALL`], used as the encoded token index
    pub fn index(self) -> u32 {
        TokenType::ALL
            .iter()
            .position(|t| *t == self)
            .unwrap_or(TokenType::ALL.len() - 1) as u32
    }
}

/// What an occurrence denotes
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolDefinition {
    /// A real catalog object
    Object(Arc<DbObject>),
    /// Another occurrence this one refers to (alias use to alias declaration)
    Entry(SymbolEntryId),
    /// A rows source introduced by the query (CTE, derived table)
    RowsSource(RowsSourceId),
    /// A column produced by a query's select list
    ResultColumn { query: QueryScopeId, index: usize },
    /// A field of a composite type
    Member { owner: String, field: CompositeField },
    /// A dialect pseudo-column or session variable
    Variable(String),
}

/// Shared logical symbol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub class: SymbolClass,
}

/// One concrete identifier occurrence
#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub id: SymbolEntryId,
    pub range: TextRange,
    /// Spelling as written
    pub raw_name: String,
    /// Canonical (case-folded or unquoted) name
    pub name: String,
    pub quoted: bool,
    /// Member-access token preceding this part of a dotted name
    pub period: Option<TextRange>,
    pub(crate) symbol: SymbolId,
    pub(crate) definition: Option<SymbolDefinition>,
    pub(crate) lexical_item: LexicalItemId,
}

impl SymbolEntry {
    pub fn lexical_item(&self) -> LexicalItemId {
        self.lexical_item
    }

    /// Definition set directly on this occurrence (chains are not followed)
    pub fn definition(&self) -> Option<&SymbolDefinition> {
        self.definition.as_ref()
    }
}

/// Per-analysis set of entries and symbols
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: Vec<SymbolEntry>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id the next added entry will receive
    pub fn next_entry_id(&self) -> SymbolEntryId {
        SymbolEntryId(self.entries.len() as u32)
    }

    pub fn add_entry(
        &mut self,
        range: TextRange,
        raw_name: &str,
        canonical: CanonicalName,
        period: Option<TextRange>,
        lexical_item: LexicalItemId,
    ) -> SymbolEntryId {
        let id = self.next_entry_id();
        let symbol = SymbolId(self.symbols.len() as u32);
        self.symbols.push(Symbol {
            name: canonical.name.clone(),
            class: SymbolClass::Unclassified,
        });
        self.entries.push(SymbolEntry {
            id,
            range,
            raw_name: raw_name.to_string(),
            name: canonical.name,
            quoted: canonical.quoted,
            period,
            symbol,
            definition: None,
            lexical_item,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: SymbolEntryId) -> &SymbolEntry {
        &self.entries[id.0 as usize]
    }

    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.iter()
    }

    pub fn symbol(&self, id: SymbolEntryId) -> &Symbol {
        &self.symbols[self.entry(id).symbol.0 as usize]
    }

    pub fn class_of(&self, id: SymbolEntryId) -> SymbolClass {
        self.symbol(id).class
    }

    /// Classify an unclassified symbol; returns whether the class was applied
    pub fn set_class(&mut self, id: SymbolEntryId, class: SymbolClass) -> bool {
        if class == SymbolClass::Unclassified || self.class_of(id).is_classified() {
            return false;
        }
        self.write_class(id, class);
        true
    }

    /// Replace an existing class (error marking and keyword promotion)
    ///
    /// Resetting to [`SymbolClass::Unclassified`] is refused.
    pub fn override_class(&mut self, id: SymbolEntryId, class: SymbolClass) {
        if class == SymbolClass::Unclassified {
            return;
        }
        let previous = self.class_of(id);
        if previous.is_classified() && previous != class {
            trace!(
                "Reclassifying '{}' from {:?} to {:?}",
                self.entry(id).raw_name,
                previous,
                class
            );
        }
        self.write_class(id, class);
    }

    fn write_class(&mut self, id: SymbolEntryId, class: SymbolClass) {
        let symbol = self.entry(id).symbol;
        self.symbols[symbol.0 as usize].class = class;
    }

    /// Attach a definition; linking to another entry shares its symbol
    pub fn set_definition(&mut self, id: SymbolEntryId, definition: SymbolDefinition) {
        if let SymbolDefinition::Entry(target) = &definition {
            let target = *target;
            if target != id && !self.class_of(id).is_classified() {
                let shared = self.entry(target).symbol;
                self.entries[id.0 as usize].symbol = shared;
            }
        }
        self.entries[id.0 as usize].definition = Some(definition);
    }

    /// Follow entry-to-entry definitions to the final one
    ///
    /// Cycles end the walk with `None`.
    pub fn resolve_definition(&self, id: SymbolEntryId) -> Option<&SymbolDefinition> {
        let mut visited = HashSet::new();
        let mut current = id;
        loop {
            if !visited.insert(current) {
                return None;
            }
            match self.entry(current).definition.as_ref()? {
                SymbolDefinition::Entry(next) => current = *next,
                other => return Some(other),
            }
        }
    }

    /// Real object behind an occurrence, following alias chains
    pub fn resolved_object(&self, id: SymbolEntryId) -> Option<&Arc<DbObject>> {
        match self.resolve_definition(id)? {
            SymbolDefinition::Object(object) => Some(object),
            _ => None,
        }
    }
}
