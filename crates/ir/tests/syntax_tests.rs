// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Syntax tree behavior on large and awkward inputs

use sql_insight_ir::{NodeKind, SyntaxTree, SyntaxTreeBuilder, TextRange};

/// `((((x))))` with `depth` parenthesized expressions around one identifier
fn nested_parens(depth: usize) -> SyntaxTree {
    let mut source = "(".repeat(depth);
    source.push('x');
    source.push_str(&")".repeat(depth));

    let mut builder = SyntaxTreeBuilder::new(source.as_str());
    builder.start_node(NodeKind::Root);
    for level in 0..depth {
        builder
            .start_node(NodeKind::ParenthesizedExpression)
            .token(NodeKind::LeftParen, TextRange::new(level, level + 1));
    }
    builder.token(NodeKind::Identifier, TextRange::new(depth, depth + 1));
    for level in 0..depth {
        let close = depth + 1 + level;
        builder
            .token(NodeKind::RightParen, TextRange::new(close, close + 1))
            .finish_node();
    }
    assert_eq!(builder.depth(), 1);
    builder.finish()
}

#[test]
fn test_deep_tree_walks_without_recursion() {
    let depth = 20_000;
    let tree = nested_parens(depth);
    let root = tree.root().unwrap();
    assert_eq!(root.range(), TextRange::new(0, 2 * depth + 1));

    let identifiers = root
        .descendants()
        .filter(|node| node.kind() == NodeKind::Identifier)
        .count();
    assert_eq!(identifiers, 1);

    let leaf = tree.descendant_at(depth).unwrap();
    assert_eq!(leaf.kind(), NodeKind::Identifier);
    assert_eq!(leaf.text(), "x");
    let outer = leaf.ancestor_of_kind(NodeKind::Root).unwrap();
    assert_eq!(outer, root);
}

#[test]
fn test_unfinished_nodes_are_closed() {
    let source = "SELECT id";
    let mut builder = SyntaxTreeBuilder::new(source);
    builder
        .start_node(NodeKind::Root)
        .start_node(NodeKind::SelectStatement)
        .token(NodeKind::Keyword, TextRange::new(0, 6))
        .start_node(NodeKind::SelectList)
        .token(NodeKind::Identifier, TextRange::new(7, 9));
    assert_eq!(builder.depth(), 3);

    let tree = builder.finish();
    let root = tree.root().unwrap();
    assert_eq!(root.range(), TextRange::new(0, 9));
    let select = root.first_child_of_kind(NodeKind::SelectStatement).unwrap();
    assert!(select.has_keyword("select"));
    assert_eq!(select.text(), "SELECT id");
}

#[test]
fn test_cursor_after_trailing_period() {
    // SELECT u. FROM users u
    let source = "SELECT u. FROM users u";
    let mut builder = SyntaxTreeBuilder::new(source);
    builder
        .start_node(NodeKind::Root)
        .start_node(NodeKind::SelectStatement)
        .token(NodeKind::Keyword, TextRange::new(0, 6))
        .start_node(NodeKind::SelectList)
        .start_node(NodeKind::SelectItem)
        .start_node(NodeKind::ColumnReference)
        .token(NodeKind::Identifier, TextRange::new(7, 8))
        .token(NodeKind::Period, TextRange::new(8, 9))
        .finish_node()
        .finish_node()
        .finish_node();
    let tree = builder.finish();

    let at_cursor = tree.descendant_at(9).unwrap();
    assert_eq!(at_cursor.kind(), NodeKind::Period);
    assert_eq!(at_cursor.parent().unwrap().kind(), NodeKind::ColumnReference);
    assert!(tree.descendant_at(source.len() + 5).is_none());
}

#[test]
fn test_empty_root_is_degenerate() {
    let mut builder = SyntaxTreeBuilder::new("");
    builder.start_node(NodeKind::Root).finish_node();
    let tree = builder.finish();
    assert!(tree.is_degenerate());
    assert!(SyntaxTree::empty("  ").is_degenerate());
}
