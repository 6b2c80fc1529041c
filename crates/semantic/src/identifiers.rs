// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Identifier collection
//!
//! Turns name-container nodes (`table_name`, `column_reference`, ...) into
//! [`QualifiedName`]s, registering one symbol entry per identifier part.

use sql_insight_ir::{NodeKind, SyntaxNode, TextRange};

use crate::context::AnalysisContext;
use crate::lexical::LexicalItemKind;
use crate::qualified_name::QualifiedName;

fn is_name_term(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Identifier | NodeKind::QuotedIdentifier | NodeKind::Keyword | NodeKind::Period
    )
}

/// Name terms of `node`, with nested name containers flattened
fn name_terms(node: SyntaxNode<'_>) -> Vec<SyntaxNode<'_>> {
    let mut terms = Vec::new();
    let mut stack: Vec<SyntaxNode<'_>> = node.children_skip_errors();
    stack.reverse();
    while let Some(child) = stack.pop() {
        if is_name_term(child.kind()) {
            terms.push(child);
        } else if child.kind().is_name_container() {
            let mut inner = child.children_skip_errors();
            inner.reverse();
            stack.extend(inner);
        }
    }
    terms
}

impl AnalysisContext<'_> {
    /// Collect the dotted name held by `node`
    ///
    /// Returns `None` when the node is neither an identifier nor a name
    /// container with at least one name term.
    pub(crate) fn collect_name(&mut self, node: SyntaxNode<'_>) -> Option<QualifiedName> {
        if node.kind().is_identifier() || node.kind() == NodeKind::Keyword {
            let entry = self.new_entry(node, None);
            return Some(QualifiedName::single(entry, node.text()));
        }
        if !node.kind().is_name_container() {
            return None;
        }
        self.collect_terms(name_terms(node))
    }

    /// Qualifier of a tuple reference (`t` in `t.*`)
    pub(crate) fn collect_tuple_qualifier(
        &mut self,
        node: SyntaxNode<'_>,
    ) -> Option<QualifiedName> {
        self.collect_terms(name_terms(node))
    }

    fn collect_terms(&mut self, terms: Vec<SyntaxNode<'_>>) -> Option<QualifiedName> {
        if terms.is_empty() {
            return None;
        }

        let mut parts = Vec::with_capacity(terms.len());
        let mut raw_parts = Vec::with_capacity(terms.len());
        let mut expect_identifier = true;
        let mut pending_period: Option<TextRange> = None;

        for term in terms {
            if term.kind() == NodeKind::Period {
                if expect_identifier {
                    parts.push(None);
                    raw_parts.push(String::new());
                }
                pending_period = Some(term.range());
                expect_identifier = true;
            } else {
                if !expect_identifier {
                    parts.push(None);
                    raw_parts.push(String::new());
                }
                let entry = self.new_entry(term, pending_period.take());
                parts.push(Some(entry));
                raw_parts.push(term.text().to_string());
                expect_identifier = false;
            }
        }

        // A period with nothing after it is a pending member access
        let member_access = pending_period;
        if let Some(range) = member_access {
            self.new_marker(LexicalItemKind::MemberAccess, range);
            if parts.last().is_some_and(|p| p.is_none()) {
                parts.pop();
                raw_parts.pop();
            }
        }

        Some(QualifiedName::new(parts, raw_parts, member_access))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AnalyzerSettings;
    use sql_insight_catalog::StaticCatalog;
    use sql_insight_ir::{Dialect, NeverCancel, SyntaxTree, SyntaxTreeBuilder};

    fn name_tree(source: &str, terms: &[(NodeKind, usize, usize)]) -> SyntaxTree {
        let mut builder = SyntaxTreeBuilder::new(source);
        builder.start_node(NodeKind::ColumnReference);
        for (kind, start, end) in terms {
            builder.token(*kind, TextRange::new(*start, *end));
        }
        builder.finish_node();
        builder.finish()
    }

    fn collect(dialect: Dialect, tree: &SyntaxTree) -> (QualifiedName, Vec<String>) {
        let catalog = StaticCatalog::builder().build();
        let settings = AnalyzerSettings::new(dialect);
        let mut ctx = AnalysisContext::new(&dialect, &catalog, &NeverCancel, &settings);
        let name = ctx.collect_name(tree.root().unwrap()).unwrap();
        let canonical = name
            .entries()
            .map(|id| ctx.symbols.entry(id).name.clone())
            .collect();
        (name, canonical)
    }

    #[test]
    fn test_dotted_name_is_canonicalized_per_dialect() {
        let tree = name_tree(
            "Sales.\"Orders\".Id",
            &[
                (NodeKind::Identifier, 0, 5),
                (NodeKind::Period, 5, 6),
                (NodeKind::QuotedIdentifier, 6, 14),
                (NodeKind::Period, 14, 15),
                (NodeKind::Identifier, 15, 17),
            ],
        );
        let (name, canonical) = collect(Dialect::Oracle, &tree);
        assert!(name.is_valid());
        assert_eq!(canonical, vec!["SALES", "Orders", "ID"]);

        let (_, canonical) = collect(Dialect::PostgreSQL, &tree);
        assert_eq!(canonical, vec!["sales", "Orders", "id"]);
    }

    #[test]
    fn test_double_period_inserts_placeholder() {
        let tree = name_tree(
            "a..b",
            &[
                (NodeKind::Identifier, 0, 1),
                (NodeKind::Period, 1, 2),
                (NodeKind::Period, 2, 3),
                (NodeKind::Identifier, 3, 4),
            ],
        );
        let (name, _) = collect(Dialect::PostgreSQL, &tree);
        assert_eq!(name.len(), 3);
        assert_eq!(name.invalid_parts(), 1);
        assert_eq!(name.raw_parts()[1], "");
        assert!(name.member_access().is_none());
    }

    #[test]
    fn test_trailing_period_is_member_access() {
        let tree = name_tree(
            "u.",
            &[(NodeKind::Identifier, 0, 1), (NodeKind::Period, 1, 2)],
        );
        let (name, _) = collect(Dialect::PostgreSQL, &tree);
        assert_eq!(name.len(), 1);
        assert_eq!(name.member_access(), Some(TextRange::new(1, 2)));
        assert_eq!(name.to_string(), "u.");
    }
}
