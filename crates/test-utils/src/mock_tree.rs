// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock syntax tree builders
//!
//! Provides a fluent API for building [`SyntaxTree`]s without a grammar, plus
//! generators for pathologically deep trees.

use sql_insight_ir::{NodeKind, SyntaxTree, SyntaxTreeBuilder, TextRange};

/// Owned tree description, turned into a [`SyntaxTree`] by [`build_tree`]
#[derive(Debug, Clone, PartialEq)]
pub enum MockNode {
    Token { kind: NodeKind, range: TextRange },
    Node { kind: NodeKind, children: Vec<MockNode> },
}

impl MockNode {
    pub fn token(kind: NodeKind, range: TextRange) -> Self {
        MockNode::Token { kind, range }
    }

    pub fn node(kind: NodeKind, children: Vec<MockNode>) -> Self {
        MockNode::Node { kind, children }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            MockNode::Token { kind, .. } | MockNode::Node { kind, .. } => *kind,
        }
    }
}

/// Emit `root` into a tree over `source`
///
/// Works with an explicit stack, so arbitrarily deep descriptions are fine.
pub fn build_tree(source: &str, root: &MockNode) -> SyntaxTree {
    let mut builder = SyntaxTreeBuilder::new(source);
    let mut stack: Vec<(&MockNode, usize)> = vec![(root, 0)];
    while let Some((node, next)) = stack.pop() {
        match node {
            MockNode::Token { kind, range } => {
                builder.token(*kind, *range);
            }
            MockNode::Node { kind, children } => {
                if next == 0 {
                    builder.start_node(*kind);
                }
                match children.get(next) {
                    Some(child) => {
                        stack.push((node, next + 1));
                        stack.push((child, 0));
                    }
                    None => {
                        builder.finish_node();
                    }
                }
            }
        }
    }
    builder.finish()
}

/// Fluent builder locating tokens by their text
///
/// ```rust,ignore
/// let tree = MockTreeBuilder::new("a.b")
///     .start(NodeKind::ColumnReference)
///     .token(NodeKind::Identifier, "a")
///     .token(NodeKind::Period, ".")
///     .token(NodeKind::Identifier, "b")
///     .finish()
///     .build();
/// ```
pub struct MockTreeBuilder {
    source: String,
    builder: SyntaxTreeBuilder,
    cursor: usize,
}

impl MockTreeBuilder {
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        Self {
            builder: SyntaxTreeBuilder::new(source.as_str()),
            source,
            cursor: 0,
        }
    }

    /// Open a node; it spans the tokens added until [`finish`](Self::finish)
    pub fn start(mut self, kind: NodeKind) -> Self {
        self.builder.start_node(kind);
        self
    }

    pub fn finish(mut self) -> Self {
        self.builder.finish_node();
        self
    }

    /// Add a token for the next occurrence of `text` after the previous token
    ///
    /// # Panics
    ///
    /// Panics when `text` does not occur in the rest of the source.
    pub fn token(mut self, kind: NodeKind, text: &str) -> Self {
        let Some(found) = self.source[self.cursor..].find(text) else {
            panic!("token '{}' not found after offset {}", text, self.cursor);
        };
        let start = self.cursor + found;
        let end = start + text.len();
        self.builder.token(kind, TextRange::new(start, end));
        self.cursor = end;
        self
    }

    pub fn build(self) -> SyntaxTree {
        self.builder.finish()
    }
}

/// `SELECT (SELECT (... SELECT 1 ...))` nested `depth` times
pub fn deep_subquery_tree(depth: usize) -> SyntaxTree {
    let mut source = "SELECT (".repeat(depth);
    source.push_str("SELECT 1");
    source.push_str(&")".repeat(depth));

    let mut builder = SyntaxTreeBuilder::new(source.as_str());
    builder.start_node(NodeKind::Root);
    for level in 0..depth {
        let start = level * 8;
        builder
            .start_node(NodeKind::SelectStatement)
            .token(NodeKind::Keyword, TextRange::new(start, start + 6))
            .start_node(NodeKind::SelectList)
            .start_node(NodeKind::SelectItem)
            .start_node(NodeKind::ScalarSubquery)
            .token(NodeKind::LeftParen, TextRange::new(start + 7, start + 8));
    }
    let inner = depth * 8;
    builder
        .start_node(NodeKind::SelectStatement)
        .token(NodeKind::Keyword, TextRange::new(inner, inner + 6))
        .start_node(NodeKind::SelectList)
        .start_node(NodeKind::SelectItem)
        .token(NodeKind::Literal, TextRange::new(inner + 7, inner + 8))
        .finish_node()
        .finish_node()
        .finish_node();
    for level in 0..depth {
        let paren = inner + 8 + level;
        builder
            .token(NodeKind::RightParen, TextRange::new(paren, paren + 1))
            .finish_node()
            .finish_node()
            .finish_node()
            .finish_node();
    }
    builder.finish_node();
    builder.finish()
}

/// `SELECT ((...(id)...)) FROM users` with `depth` parentheses
pub fn deep_parenthesized_tree(depth: usize) -> SyntaxTree {
    let mut source = String::from("SELECT ");
    source.push_str(&"(".repeat(depth));
    source.push_str("id");
    source.push_str(&")".repeat(depth));
    source.push_str(" FROM users");

    let open = 7;
    let id = open + depth;
    let close = id + 2;
    let from = close + depth + 1;

    let mut builder = SyntaxTreeBuilder::new(source.as_str());
    builder
        .start_node(NodeKind::Root)
        .start_node(NodeKind::SelectStatement)
        .token(NodeKind::Keyword, TextRange::new(0, 6))
        .start_node(NodeKind::SelectList)
        .start_node(NodeKind::SelectItem);
    for level in 0..depth {
        builder
            .start_node(NodeKind::ParenthesizedExpression)
            .token(NodeKind::LeftParen, TextRange::new(open + level, open + level + 1));
    }
    builder
        .start_node(NodeKind::ColumnReference)
        .token(NodeKind::Identifier, TextRange::new(id, id + 2))
        .finish_node();
    for level in 0..depth {
        builder
            .token(NodeKind::RightParen, TextRange::new(close + level, close + level + 1))
            .finish_node();
    }
    builder
        .finish_node()
        .finish_node()
        .start_node(NodeKind::FromClause)
        .token(NodeKind::Keyword, TextRange::new(from, from + 4))
        .start_node(NodeKind::TableReference)
        .start_node(NodeKind::TableName)
        .token(NodeKind::Identifier, TextRange::new(from + 5, from + 10))
        .finish_node()
        .finish_node()
        .finish_node()
        .finish_node()
        .finish_node();
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fluent_builder_finds_tokens_in_order() {
        let tree = MockTreeBuilder::new("a.a")
            .start(NodeKind::ColumnReference)
            .token(NodeKind::Identifier, "a")
            .token(NodeKind::Period, ".")
            .token(NodeKind::Identifier, "a")
            .finish()
            .build();
        let root = tree.root().unwrap();
        let ranges: Vec<TextRange> = root.children().map(|c| c.range()).collect();
        assert_eq!(ranges[2], TextRange::new(2, 3));
        assert_eq!(root.text(), "a.a");
    }

    #[test]
    fn test_build_tree_from_description() {
        let description = MockNode::node(
            NodeKind::TableName,
            vec![MockNode::token(NodeKind::Identifier, TextRange::new(0, 5))],
        );
        let tree = build_tree("users", &description);
        assert_eq!(tree.node_count(), 2);
        assert_eq!(tree.root().unwrap().text(), "users");
    }

    #[test]
    fn test_deep_subquery_tree_shape() {
        let tree = deep_subquery_tree(3);
        assert_eq!(tree.source(), "SELECT (SELECT (SELECT (SELECT 1)))");
        let literal = tree.descendant_at(31).unwrap();
        assert_eq!(literal.kind(), NodeKind::Literal);
        assert_eq!(literal.text(), "1");
        let selects = tree
            .root()
            .unwrap()
            .descendants()
            .filter(|n| n.kind() == NodeKind::SelectStatement)
            .count();
        assert_eq!(selects, 4);
    }

    #[test]
    fn test_deep_parenthesized_tree_ranges() {
        let tree = deep_parenthesized_tree(2);
        assert_eq!(tree.source(), "SELECT ((id)) FROM users");
        assert_eq!(tree.descendant_at(10).unwrap().text(), "id");
        assert_eq!(tree.descendant_at(22).unwrap().text(), "users");
    }
}
