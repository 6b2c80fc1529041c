// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Insight - Intermediate Representation
//!
//! Shared vocabulary of the workspace:
//! - The syntax tree contract produced by an external parser
//! - Dialect lexical rules (case-folding, quoting, reserved words)
//! - The metadata object model returned by catalogs
//! - Cooperative cancellation

pub mod cancel;
pub mod dialect;
pub mod metadata;
pub mod parser;
pub mod syntax;

// Re-export commonly used types
pub use cancel::{CancellationFlag, CancellationMonitor, Canceled, NeverCancel};
pub use dialect::{
    CanonicalName, Dialect, DialectFamily, GlobalVariable, IdentifierCase, SqlDialect,
};
pub use metadata::{
    ColumnMetadata, CompositeField, CompositeType, DataKind, DataType, DbObject, ForeignKey,
    FunctionMetadata, FunctionParameter, FunctionType, ObjectKind, ObjectKindSet,
    RoutineSignature, TableMetadata, TableReference, TableType,
};
pub use parser::{ParseError, ParseResult, Parser, TreeSitterParser};
pub use syntax::{NodeId, NodeKind, SyntaxNode, SyntaxTree, SyntaxTreeBuilder, TextRange};
