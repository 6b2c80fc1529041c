// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Syntax tree contract
//!
//! The lexer/parser that turns SQL text into a tree lives outside this workspace.
//! Whatever produces the tree hands it over as a [`SyntaxTree`]: an arena of nodes,
//! each with a [`NodeKind`], a byte [`TextRange`] and ordered children.
//!
//! The tree is flat in memory (no recursive ownership), so very deep trees can be
//! built, walked and dropped without exhausting the stack.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Half-open byte interval `[start, end)` in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    /// Create a new range; `end` is clamped so the range is never inverted
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Empty range positioned at `offset`
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// `start <= offset < end`
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// `start <= offset <= end`: the offset is inside or adjacent to the range
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Smallest range covering both
    pub fn cover(self, other: TextRange) -> TextRange {
        TextRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

macro_rules! node_kinds {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Node-kind vocabulary understood by the recognizer
        ///
        /// Grammar adapters map their own node names onto these kinds through
        /// [`NodeKind::from_name`]; anything unmapped becomes [`NodeKind::Unknown`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum NodeKind {
            $($variant,)*
        }

        impl NodeKind {
            /// Snake-case grammar name of this kind
            pub fn name(self) -> &'static str {
                match self {
                    $(NodeKind::$variant => $name,)*
                }
            }

            /// Map a grammar node name onto a kind
            pub fn from_name(name: &str) -> NodeKind {
                match name {
                    $($name => NodeKind::$variant,)*
                    _ => NodeKind::Unknown,
                }
            }
        }
    };
}

node_kinds! {
    Root => "source_file",
    // Statements
    SelectStatement => "select_statement",
    InsertStatement => "insert_statement",
    UpdateStatement => "update_statement",
    DeleteStatement => "delete_statement",
    CreateTableStatement => "create_table_statement",
    AlterTableStatement => "alter_table_statement",
    DropStatement => "drop_statement",
    CallStatement => "call_statement",
    // Query structure
    WithClause => "with_clause",
    CommonTableExpression => "common_table_expression",
    SetOperation => "set_operation",
    SelectList => "select_list",
    SelectItem => "select_item",
    Alias => "alias",
    FromClause => "from_clause",
    TableReference => "table_reference",
    DerivedTable => "derived_table",
    JoinedTable => "joined_table",
    JoinCondition => "join_condition",
    WhereClause => "where_clause",
    GroupByClause => "group_by_clause",
    HavingClause => "having_clause",
    OrderByClause => "order_by_clause",
    OrderItem => "order_item",
    // DML / DDL pieces
    ColumnList => "column_list",
    ValuesClause => "values_clause",
    ValuesRow => "values_row",
    SetClause => "set_clause",
    Assignment => "assignment",
    ColumnDefinition => "column_definition",
    AlterAction => "alter_action",
    DataTypeName => "data_type",
    // Names
    TableName => "table_name",
    ColumnName => "column_name",
    ColumnReference => "column_reference",
    QualifiedName => "qualified_name",
    CorrelationName => "correlation_name",
    // Expressions
    BinaryExpression => "binary_expression",
    UnaryExpression => "unary_expression",
    ParenthesizedExpression => "parenthesized_expression",
    CaseExpression => "case_expression",
    InList => "in_list",
    FunctionCall => "function_call",
    ArgumentList => "argument_list",
    MemberAccess => "member_access",
    TupleReference => "tuple_reference",
    ScalarSubquery => "subquery",
    Literal => "literal",
    StringLiteral => "string_literal",
    BatchVariable => "batch_variable",
    ExternalVariable => "external_variable",
    ExternalParameter => "parameter",
    // Terminals
    Identifier => "identifier",
    QuotedIdentifier => "quoted_identifier",
    Keyword => "keyword",
    Operator => "operator",
    Period => ".",
    Comma => ",",
    Asterisk => "*",
    LeftParen => "(",
    RightParen => ")",
    Semicolon => ";",
    // Recovery
    Error => "ERROR",
    Unknown => "unknown",
}

impl NodeKind {
    /// Top-level statement productions
    pub fn is_statement(self) -> bool {
        matches!(
            self,
            NodeKind::SelectStatement
                | NodeKind::InsertStatement
                | NodeKind::UpdateStatement
                | NodeKind::DeleteStatement
                | NodeKind::CreateTableStatement
                | NodeKind::AlterTableStatement
                | NodeKind::DropStatement
                | NodeKind::CallStatement
        )
    }

    /// Nodes that may hold a dotted identifier sequence
    pub fn is_name_container(self) -> bool {
        matches!(
            self,
            NodeKind::TableName
                | NodeKind::ColumnName
                | NodeKind::ColumnReference
                | NodeKind::QualifiedName
                | NodeKind::CorrelationName
        )
    }

    pub fn is_identifier(self) -> bool {
        matches!(self, NodeKind::Identifier | NodeKind::QuotedIdentifier)
    }

    /// Leaf tokens
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeKind::Identifier
                | NodeKind::QuotedIdentifier
                | NodeKind::Keyword
                | NodeKind::Operator
                | NodeKind::Period
                | NodeKind::Comma
                | NodeKind::Asterisk
                | NodeKind::LeftParen
                | NodeKind::RightParen
                | NodeKind::Semicolon
        )
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index of a node inside its [`SyntaxTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    range: TextRange,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Immutable syntax tree handed over by the external parser
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    source: Arc<str>,
    nodes: Vec<NodeData>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    /// Tree without any node (what a parser produces for blank input)
    pub fn empty(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
            root: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> Option<SyntaxNode<'_>> {
        self.root.map(|id| SyntaxNode { tree: self, id })
    }

    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        SyntaxNode { tree: self, id }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// A tree is degenerate when it has no root or the root covers no tokens
    pub fn is_degenerate(&self) -> bool {
        match self.root() {
            None => true,
            Some(root) => root.children().next().is_none() && root.range().is_empty(),
        }
    }

    /// Deepest node whose range touches `offset`
    ///
    /// When the offset sits exactly between two nodes, the node ending at the
    /// offset wins so a cursor placed right after an identifier lands on it.
    pub fn descendant_at(&self, offset: usize) -> Option<SyntaxNode<'_>> {
        let mut current = self.root()?;
        if !current.range().touches(offset) {
            return None;
        }
        loop {
            let mut next = None;
            for child in current.children() {
                let range = child.range();
                if range.contains(offset) {
                    next = Some(child);
                    break;
                }
                if range.end == offset && !range.is_empty() && next.is_none() {
                    next = Some(child);
                }
            }
            match next {
                Some(child) => current = child,
                None => return Some(current),
            }
        }
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

/// Cheap handle onto a node of a [`SyntaxTree`]
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    pub fn kind(&self) -> NodeKind {
        self.tree.data(self.id).kind
    }

    pub fn range(&self) -> TextRange {
        self.tree.data(self.id).range
    }

    /// Source text covered by this node
    pub fn text(&self) -> &'t str {
        let range = self.range();
        self.tree.source.get(range.start..range.end).unwrap_or("")
    }

    pub fn is_error(&self) -> bool {
        self.kind() == NodeKind::Error
    }

    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.tree
            .data(self.id)
            .parent
            .map(|id| SyntaxNode { tree: self.tree, id })
    }

    pub fn children(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        tree.data(self.id)
            .children
            .iter()
            .map(move |&id| SyntaxNode { tree, id })
    }

    pub fn child_count(&self) -> usize {
        self.tree.data(self.id).children.len()
    }

    /// Children with the content of `Error` nodes spliced in place
    ///
    /// Recovery nodes are transparent: their children are visited as if they
    /// were direct children of this node. Nested error nodes are flattened too.
    pub fn children_skip_errors(&self) -> Vec<SyntaxNode<'t>> {
        let mut out = Vec::new();
        let mut stack: Vec<SyntaxNode<'t>> = self.children().collect();
        stack.reverse();
        while let Some(node) = stack.pop() {
            if node.is_error() {
                let mut inner: Vec<SyntaxNode<'t>> = node.children().collect();
                inner.reverse();
                stack.extend(inner);
            } else {
                out.push(node);
            }
        }
        out
    }

    /// First non-error child (error nodes spliced) of the given kind
    pub fn first_child_of_kind(&self, kind: NodeKind) -> Option<SyntaxNode<'t>> {
        self.children_skip_errors()
            .into_iter()
            .find(|child| child.kind() == kind)
    }

    /// All non-error children (error nodes spliced) of the given kind
    pub fn children_of_kind(&self, kind: NodeKind) -> Vec<SyntaxNode<'t>> {
        self.children_skip_errors()
            .into_iter()
            .filter(|child| child.kind() == kind)
            .collect()
    }

    /// Whether a keyword child with this (case-insensitive) text exists
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.children_skip_errors()
            .iter()
            .any(|child| {
                child.kind() == NodeKind::Keyword && child.text().eq_ignore_ascii_case(keyword)
            })
    }

    /// Pre-order iterator over this node and all its descendants
    pub fn descendants(&self) -> Descendants<'t> {
        Descendants {
            tree: self.tree,
            stack: vec![self.id],
        }
    }

    /// Closest ancestor (excluding self) of the given kind
    pub fn ancestor_of_kind(&self, kind: NodeKind) -> Option<SyntaxNode<'t>> {
        let mut current = self.parent();
        while let Some(node) = current {
            if node.kind() == kind {
                return Some(node);
            }
            current = node.parent();
        }
        None
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.kind(), self.range())
    }
}

/// Iterator returned by [`SyntaxNode::descendants`]
pub struct Descendants<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl<'t> Iterator for Descendants<'t> {
    type Item = SyntaxNode<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let children = &self.tree.data(id).children;
        self.stack.extend(children.iter().rev().copied());
        Some(SyntaxNode {
            tree: self.tree,
            id,
        })
    }
}

/// Incremental builder for [`SyntaxTree`]
///
/// Nodes are opened with [`start_node`](Self::start_node), leaves are appended
/// with [`token`](Self::token) and nodes are closed with
/// [`finish_node`](Self::finish_node). A closed node spans its children; an
/// empty node is placed at the end of the last token seen.
#[derive(Debug)]
pub struct SyntaxTreeBuilder {
    source: Arc<str>,
    nodes: Vec<NodeData>,
    open: Vec<NodeId>,
    root: Option<NodeId>,
    last_end: usize,
}

impl SyntaxTreeBuilder {
    pub fn new(source: impl Into<Arc<str>>) -> Self {
        Self {
            source: source.into(),
            nodes: Vec::new(),
            open: Vec::new(),
            root: None,
            last_end: 0,
        }
    }

    pub fn start_node(&mut self, kind: NodeKind) -> &mut Self {
        let id = self.push(kind, TextRange::empty(self.last_end));
        self.open.push(id);
        self
    }

    pub fn token(&mut self, kind: NodeKind, range: TextRange) -> &mut Self {
        self.push(kind, range);
        self.last_end = self.last_end.max(range.end);
        self
    }

    pub fn finish_node(&mut self) -> &mut Self {
        if let Some(id) = self.open.pop() {
            let children = &self.nodes[id.index()].children;
            let range = match (children.first(), children.last()) {
                (Some(first), Some(last)) => {
                    let first = self.nodes[first.index()].range;
                    let last = self.nodes[last.index()].range;
                    first.cover(last)
                }
                _ => TextRange::empty(self.last_end),
            };
            self.nodes[id.index()].range = range;
        }
        self
    }

    /// Number of currently open nodes
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Close any node left open and produce the tree
    pub fn finish(mut self) -> SyntaxTree {
        while !self.open.is_empty() {
            self.finish_node();
        }
        SyntaxTree {
            source: self.source,
            nodes: self.nodes,
            root: self.root,
        }
    }

    fn push(&mut self, kind: NodeKind, range: TextRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        let parent = self.open.last().copied();
        self.nodes.push(NodeData {
            kind,
            range,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(parent) => self.nodes[parent.index()].children.push(id),
            None => {
                if self.root.is_none() {
                    self.root = Some(id);
                }
            }
        }
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_tree() -> SyntaxTree {
        // "a.b c"
        let mut builder = SyntaxTreeBuilder::new("a.b c");
        builder.start_node(NodeKind::Root);
        builder.start_node(NodeKind::ColumnReference);
        builder.token(NodeKind::Identifier, TextRange::new(0, 1));
        builder.token(NodeKind::Period, TextRange::new(1, 2));
        builder.token(NodeKind::Identifier, TextRange::new(2, 3));
        builder.finish_node();
        builder.start_node(NodeKind::Error);
        builder.token(NodeKind::Identifier, TextRange::new(4, 5));
        builder.finish_node();
        builder.finish_node();
        builder.finish()
    }

    #[test]
    fn test_node_kind_names_round_trip() {
        assert_eq!(NodeKind::from_name("select_statement"), NodeKind::SelectStatement);
        assert_eq!(NodeKind::from_name("table_name"), NodeKind::TableName);
        assert_eq!(NodeKind::from_name("something_else"), NodeKind::Unknown);
        assert_eq!(NodeKind::Period.name(), ".");
    }

    #[test]
    fn test_builder_computes_ranges() {
        let tree = small_tree();
        let root = tree.root().unwrap();
        assert_eq!(root.range(), TextRange::new(0, 5));
        let column = root.children().next().unwrap();
        assert_eq!(column.kind(), NodeKind::ColumnReference);
        assert_eq!(column.text(), "a.b");
    }

    #[test]
    fn test_children_skip_errors_splices_recovery_nodes() {
        let tree = small_tree();
        let root = tree.root().unwrap();
        let kinds: Vec<NodeKind> = root
            .children_skip_errors()
            .iter()
            .map(|n| n.kind())
            .collect();
        assert_eq!(kinds, vec![NodeKind::ColumnReference, NodeKind::Identifier]);
    }

    #[test]
    fn test_descendant_at_prefers_node_ending_at_offset() {
        let tree = small_tree();
        let node = tree.descendant_at(3).unwrap();
        assert_eq!(node.kind(), NodeKind::Identifier);
        assert_eq!(node.text(), "b");

        let node = tree.descendant_at(1).unwrap();
        assert_eq!(node.kind(), NodeKind::Period);
    }

    #[test]
    fn test_descendants_is_preorder() {
        let tree = small_tree();
        let kinds: Vec<NodeKind> = tree.root().unwrap().descendants().map(|n| n.kind()).collect();
        assert_eq!(kinds[0], NodeKind::Root);
        assert_eq!(kinds[1], NodeKind::ColumnReference);
        assert_eq!(kinds[2], NodeKind::Identifier);
        assert_eq!(kinds.len(), 7);
    }

    #[test]
    fn test_empty_tree_is_degenerate() {
        assert!(SyntaxTree::empty("").is_degenerate());
        assert!(!small_tree().is_degenerate());
    }

    #[test]
    fn test_text_range_helpers() {
        let range = TextRange::new(2, 5);
        assert!(range.contains(2));
        assert!(!range.contains(5));
        assert!(range.touches(5));
        assert_eq!(range.len(), 3);
        assert_eq!(TextRange::new(5, 2), TextRange::empty(5));
    }
}
