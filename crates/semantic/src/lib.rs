// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # SQL Insight - Semantic Layer
//!
//! Builds a [`SemanticModel`] for one SQL statement: every identifier
//! occurrence is classified (table, column, alias, routine, ...), bound to the
//! catalog object it denotes where possible, and annotated with the origin
//! that completion uses to propose replacements.
//!
//! ## Overview
//!
//! - **Symbols**: [`SymbolTable`] owns one [`SymbolEntry`] per occurrence;
//!   occurrences of the same thing share a symbol and its class.
//! - **Rows model**: [`RowsModel`] records query scopes, their row sources and
//!   result columns.
//! - **Lexical index**: [`LexicalIndex`] maps text offsets to occurrences and
//!   to the clause scope that encloses them.
//! - **Diagnostics**: unresolved names and metadata failures never abort the
//!   analysis; they are reported as [`Diagnostic`]s.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sql_insight_semantic::{AnalyzerSettings, ModelRecognizer};
//!
//! let recognizer = ModelRecognizer::new(Arc::new(catalog), AnalyzerSettings::default());
//! let model = recognizer.recognize(&parser, "SELECT u.id FROM users u", &NeverCancel)?;
//! for token in model.semantic_tokens() {
//!     println!("{:?} {:?}", token.range, token.class);
//! }
//! ```

mod builder;
mod context;
pub mod diagnostics;
pub mod error;
mod expr;
mod heuristic;
mod identifiers;
pub mod lexical;
pub mod model;
pub mod origin;
pub mod qualified_name;
pub mod recognizer;
mod resolution;
pub mod rows;
pub mod settings;
pub mod symbol;

pub use builder::{StatementContent, StatementKind};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use error::{SemanticError, SemanticResult};
pub use lexical::{
    LexicalIndex, LexicalItem, LexicalItemId, LexicalItemKind, LexicalScope, LexicalScopeId,
    ScopeKind,
};
pub use model::{SemanticModel, SemanticToken};
pub use origin::SymbolOrigin;
pub use qualified_name::QualifiedName;
pub use recognizer::ModelRecognizer;
pub use rows::{
    QueryScope, QueryScopeId, ResultColumn, RowsModel, RowsSource, RowsSourceId, RowsSourceKind,
};
pub use settings::AnalyzerSettings;
pub use symbol::{
    Symbol, SymbolClass, SymbolDefinition, SymbolEntry, SymbolEntryId, SymbolId, SymbolTable,
    TokenType,
};
