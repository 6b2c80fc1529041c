// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion error types
//!
//! This module defines error types for the completion engine.

use sql_insight_semantic::SemanticError;

/// Errors that can occur during completion
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// The request was canceled through its monitor
    #[error("Completion canceled")]
    Canceled,

    /// Cursor offset outside the text or inside a character
    #[error("Invalid offset {offset} (text length {len})")]
    InvalidOffset { offset: usize, len: usize },

    /// Settings payload could not be decoded
    #[error("Invalid completion settings: {0}")]
    InvalidSettings(String),

    /// Semantic analysis error
    #[error("Semantic error: {0}")]
    Semantic(SemanticError),
}

impl From<SemanticError> for CompletionError {
    fn from(error: SemanticError) -> Self {
        match error {
            SemanticError::Canceled => CompletionError::Canceled,
            other => CompletionError::Semantic(other),
        }
    }
}

impl CompletionError {
    /// Check if this error should result in an empty completion list
    /// (vs. propagating the error to the client)
    pub fn should_return_empty(&self) -> bool {
        matches!(
            self,
            CompletionError::Canceled | CompletionError::InvalidOffset { .. }
        )
    }
}

/// Result type for completion operations
pub type CompletionResult<T> = Result<T, CompletionError>;
