// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # LSP rendering
//!
//! Conversion of completion sets and semantic tokens to `lsp-types`.
//! Offsets are byte offsets into the document; LSP positions count UTF-16
//! code units per line.

use lsp_types::{
    CompletionItem as LspCompletionItem, CompletionItemKind as LspKind, CompletionTextEdit,
    Position, Range, SemanticToken as LspSemanticToken, SemanticTokenType, SemanticTokens,
    SemanticTokensLegend, TextEdit,
};
use sql_insight_semantic::{SemanticModel, TokenType};

use crate::items::{CompletionItemKind, CompletionSet};

/// LSP position of a byte offset, clamped to the text
pub fn offset_to_position(source: &str, offset: usize) -> Position {
    let mut line = 0u32;
    let mut character = 0u32;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            character = 0;
        } else {
            character += c.len_utf16() as u32;
        }
    }
    Position::new(line, character)
}

fn lsp_kind(kind: CompletionItemKind) -> LspKind {
    match kind {
        CompletionItemKind::JoinCondition => LspKind::SNIPPET,
        CompletionItemKind::Tuple => LspKind::SNIPPET,
        CompletionItemKind::Column | CompletionItemKind::ColumnDerived => LspKind::FIELD,
        CompletionItemKind::Field => LspKind::PROPERTY,
        CompletionItemKind::TableAlias => LspKind::REFERENCE,
        CompletionItemKind::Table => LspKind::CLASS,
        CompletionItemKind::View => LspKind::INTERFACE,
        CompletionItemKind::Function => LspKind::FUNCTION,
        CompletionItemKind::Procedure => LspKind::METHOD,
        CompletionItemKind::Sequence => LspKind::CONSTANT,
        CompletionItemKind::DataType => LspKind::STRUCT,
        CompletionItemKind::Variable => LspKind::VARIABLE,
        CompletionItemKind::Schema | CompletionItemKind::Catalog => LspKind::MODULE,
        CompletionItemKind::Keyword => LspKind::KEYWORD,
    }
}

/// Items of one set as LSP completion items replacing the set's range
///
/// `sort_text` preserves the set's order.
pub fn to_lsp_completion_items(set: &CompletionSet, source: &str) -> Vec<LspCompletionItem> {
    let range = Range::new(
        offset_to_position(source, set.replace_start),
        offset_to_position(source, set.replace_start + set.replace_len),
    );
    set.items
        .iter()
        .enumerate()
        .map(|(index, item)| LspCompletionItem {
            label: item.label.clone(),
            kind: Some(lsp_kind(item.kind)),
            detail: item.detail.clone(),
            sort_text: Some(format!("{:04}_{}", index, item.label)),
            filter_text: Some(item.label.clone()),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit::new(
                range,
                item.insert_text.clone(),
            ))),
            ..Default::default()
        })
        .collect()
}

/// Legend whose indices match [`TokenType::index`]
pub fn semantic_token_legend() -> SemanticTokensLegend {
    SemanticTokensLegend {
        token_types: TokenType::ALL
            .iter()
            .map(|token| SemanticTokenType::new(token.as_str()))
            .collect(),
        token_modifiers: Vec::new(),
    }
}

/// Delta-encoded semantic tokens of a model
pub fn to_lsp_semantic_tokens(model: &SemanticModel) -> SemanticTokens {
    let source = model.source();
    let mut data = Vec::new();
    let mut previous = Position::new(0, 0);
    for token in model.semantic_tokens() {
        let start = offset_to_position(source, token.range.start);
        let length: u32 = source
            .get(token.range.start..token.range.end)
            .map(|text| text.chars().map(|c| c.len_utf16() as u32).sum())
            .unwrap_or(0);
        let delta_line = start.line - previous.line;
        let delta_start = if delta_line == 0 {
            start.character - previous.character
        } else {
            start.character
        };
        data.push(LspSemanticToken {
            delta_line,
            delta_start,
            length,
            token_type: token.token_type.index(),
            token_modifiers_bitset: 0,
        });
        previous = start;
    }
    SemanticTokens {
        result_id: None,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::CompletionItem;

    #[test]
    fn test_offset_to_position() {
        let source = "SELECT id\nFROM users";
        assert_eq!(offset_to_position(source, 0), Position::new(0, 0));
        assert_eq!(offset_to_position(source, 7), Position::new(0, 7));
        assert_eq!(offset_to_position(source, 15), Position::new(1, 5));
        assert_eq!(offset_to_position(source, 500), Position::new(1, 10));
    }

    #[test]
    fn test_positions_count_utf16_units() {
        let source = "SELECT '😀', x";
        let x = source.find('x').unwrap();
        // The emoji takes two UTF-16 units and four bytes
        assert_eq!(offset_to_position(source, x), Position::new(0, 13));
    }

    #[test]
    fn test_completion_items_share_the_set_range() {
        let source = "SELECT u.na FROM users u";
        let mut set = CompletionSet::new(9, 2);
        set.push(CompletionItem::new("name", CompletionItemKind::Column).with_score(120));
        set.push(CompletionItem::new("NATURAL", CompletionItemKind::Keyword).with_score(120));
        let items = to_lsp_completion_items(&set, source);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].kind, Some(LspKind::FIELD));
        assert_eq!(items[1].kind, Some(LspKind::KEYWORD));
        match &items[0].text_edit {
            Some(CompletionTextEdit::Edit(edit)) => {
                assert_eq!(edit.range, Range::new(Position::new(0, 9), Position::new(0, 11)));
                assert_eq!(edit.new_text, "name");
            }
            other => panic!("unexpected edit {:?}", other),
        }
        assert!(items[0].sort_text < items[1].sort_text);
    }

    #[test]
    fn test_legend_matches_token_indices() {
        let legend = semantic_token_legend();
        assert_eq!(legend.token_types.len(), TokenType::ALL.len());
        for token in TokenType::ALL {
            assert_eq!(
                legend.token_types[token.index() as usize].as_str(),
                token.as_str()
            );
        }
    }
}
