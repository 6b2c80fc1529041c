// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Error types for semantic analysis
//!
//! Invalid SQL never surfaces as an error: it degrades to heuristic output and
//! diagnostics. The only failure a caller normally sees is [`SemanticError::Canceled`].

use sql_insight_ir::Canceled;
use thiserror::Error;

/// Result type alias for semantic operations
pub type SemanticResult<T> = Result<T, SemanticError>;

/// Errors that can occur during semantic analysis
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SemanticError {
    /// The cancellation monitor was signalled; no model was produced
    #[error("Semantic analysis canceled")]
    Canceled,

    /// A statement subtree does not have the shape its builder requires
    #[error("Malformed {construct}: {reason}")]
    MalformedSyntax { construct: String, reason: String },

    /// No statement builder handles the outermost production
    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),

    /// Nested queries exceed the configured depth
    #[error("Nesting depth limit ({limit}) exceeded")]
    DepthLimitExceeded { limit: usize },

    /// Settings payload could not be deserialized
    #[error("Invalid analyzer settings: {0}")]
    InvalidSettings(String),
}

impl SemanticError {
    pub fn malformed(construct: impl Into<String>, reason: impl Into<String>) -> Self {
        SemanticError::MalformedSyntax {
            construct: construct.into(),
            reason: reason.into(),
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, SemanticError::Canceled)
    }
}

impl From<Canceled> for SemanticError {
    fn from(_: Canceled) -> Self {
        SemanticError::Canceled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_insight_catalog::CatalogError;

    #[test]
    fn test_error_display_malformed() {
        let err = SemanticError::malformed("table reference", "missing table name");
        let msg = format!("{}", err);
        assert!(msg.contains("table reference"));
        assert!(msg.contains("missing table name"));
    }

    #[test]
    fn test_cancellation_converts() {
        let err: SemanticError = Canceled.into();
        assert!(err.is_canceled());
        assert!(!SemanticError::UnsupportedStatement("GRANT".into()).is_canceled());
    }

    #[test]
    fn test_catalog_cancellation_is_distinguishable() {
        assert!(CatalogError::Canceled.is_canceled());
        assert!(!CatalogError::QueryTimeout(1).is_canceled());
    }
}
