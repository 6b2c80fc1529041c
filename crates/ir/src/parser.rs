// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Parser contract
//!
//! Turning SQL text into a tree is the job of an external grammar. This module
//! only defines the [`Parser`] seam and ships [`TreeSitterParser`], an adapter
//! that converts any tree-sitter SQL grammar into a [`SyntaxTree`].

use crate::syntax::{NodeKind, SyntaxTree, SyntaxTreeBuilder, TextRange};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// Result type alias for parser setup
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors raised while preparing a parser
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The grammar could not be loaded into the parser
    #[error("Failed to set language: {message}")]
    Language { message: String },
}

/// Source of syntax trees
pub trait Parser: Send + Sync {
    /// Parse `text`; `None` when the grammar produced nothing at all
    fn parse(&self, text: &str) -> Option<SyntaxTree>;
}

/// Adapter over a tree-sitter grammar
///
/// Named grammar nodes are mapped through [`NodeKind::from_name`] unless an
/// explicit alias was registered. Error and missing nodes become
/// [`NodeKind::Error`]; anonymous word tokens become keywords.
#[derive(Clone)]
pub struct TreeSitterParser {
    language: tree_sitter::Language,
    aliases: HashMap<String, NodeKind>,
}

impl TreeSitterParser {
    /// Create an adapter, checking that the grammar can be loaded
    pub fn new(language: tree_sitter::Language) -> ParseResult<Self> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| ParseError::Language {
                message: e.to_string(),
            })?;
        Ok(Self {
            language,
            aliases: HashMap::new(),
        })
    }

    /// Builder method: map a grammar-specific node name onto a kind
    pub fn with_alias(mut self, grammar_name: impl Into<String>, kind: NodeKind) -> Self {
        self.aliases.insert(grammar_name.into(), kind);
        self
    }

    fn node_kind(&self, node: &tree_sitter::Node<'_>, text: &str) -> NodeKind {
        if node.is_error() || node.is_missing() {
            return NodeKind::Error;
        }
        if let Some(kind) = self.aliases.get(node.kind()) {
            return *kind;
        }
        let token = text.get(node.start_byte()..node.end_byte()).unwrap_or("");
        map_grammar_node(node.kind(), node.is_named(), token)
    }
}

impl Parser for TreeSitterParser {
    fn parse(&self, text: &str) -> Option<SyntaxTree> {
        let mut parser = tree_sitter::Parser::new();
        if let Err(e) = parser.set_language(&self.language) {
            warn!("Failed to set language: {}", e);
            return None;
        }
        let tree = parser.parse(text, None)?;
        debug!(
            "Converting tree-sitter tree ({} bytes, errors: {})",
            text.len(),
            tree.root_node().has_error()
        );

        let mut builder = SyntaxTreeBuilder::new(text);
        let mut cursor = tree.walk();
        'walk: loop {
            let node = cursor.node();
            let kind = self.node_kind(&node, text);
            if node.child_count() == 0 {
                builder.token(kind, TextRange::new(node.start_byte(), node.end_byte()));
            } else {
                builder.start_node(kind);
                if cursor.goto_first_child() {
                    continue;
                }
                builder.finish_node();
            }
            loop {
                if cursor.goto_next_sibling() {
                    continue 'walk;
                }
                if !cursor.goto_parent() {
                    break 'walk;
                }
                builder.finish_node();
            }
        }
        Some(builder.finish())
    }
}

/// Map a grammar node name onto the node-kind vocabulary
///
/// Anonymous tokens carry their literal text as name, so punctuation maps
/// directly and alphabetic words are keywords.
pub fn map_grammar_node(name: &str, named: bool, text: &str) -> NodeKind {
    if name == "ERROR" {
        return NodeKind::Error;
    }
    let kind = NodeKind::from_name(name);
    if named || kind != NodeKind::Unknown {
        return kind;
    }
    if !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_') {
        NodeKind::Keyword
    } else {
        NodeKind::Operator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_nodes_map_through_vocabulary() {
        assert_eq!(map_grammar_node("select_statement", true, ""), NodeKind::SelectStatement);
        assert_eq!(map_grammar_node("ERROR", true, "x"), NodeKind::Error);
        assert_eq!(map_grammar_node("window_clause", true, ""), NodeKind::Unknown);
    }

    #[test]
    fn test_anonymous_tokens() {
        assert_eq!(map_grammar_node(".", false, "."), NodeKind::Period);
        assert_eq!(map_grammar_node("SELECT", false, "select"), NodeKind::Keyword);
        assert_eq!(map_grammar_node("=", false, "="), NodeKind::Operator);
    }
}
