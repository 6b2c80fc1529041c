// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Diagnostics
//!
//! Append-only sink of problems found while building one semantic model.

use serde::Serialize;
use sql_insight_ir::TextRange;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

/// Category of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticCode {
    /// No metadata object matches a name
    NotFound,
    /// More than one metadata object matches a name
    Ambiguous,
    /// The metadata provider failed
    MetadataAccess,
    /// Statement could not be modeled and was classified heuristically
    Unrecognized,
    /// Nesting limit reached
    DepthLimit,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::NotFound => "not-found",
            DiagnosticCode::Ambiguous => "ambiguous",
            DiagnosticCode::MetadataAccess => "metadata-access",
            DiagnosticCode::Unrecognized => "unrecognized",
            DiagnosticCode::DepthLimit => "depth-limit",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub range: TextRange,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
}

impl Diagnostic {
    pub fn error(range: TextRange, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(range: TextRange, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.as_str(), self.range, self.message)
    }
}
