// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion items and sets
//!
//! A [`CompletionSet`] groups proposals sharing one replacement range. The
//! engine may emit several sets for the same position, for example columns
//! reached through an alias and columns reached through a table name.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use sql_insight_ir::{DbObject, ObjectKind, TableType};

/// What a proposal inserts, used for fixed-rank ordering and rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompletionItemKind {
    JoinCondition,
    Tuple,
    Column,
    ColumnDerived,
    Field,
    TableAlias,
    Table,
    View,
    Function,
    Procedure,
    Sequence,
    DataType,
    Variable,
    Schema,
    Catalog,
    Keyword,
}

impl CompletionItemKind {
    /// Position in the fixed ordering used when scores tie
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Kind proposing a catalog object
    pub fn for_object(object: &DbObject) -> Self {
        match object.kind {
            ObjectKind::Catalog => CompletionItemKind::Catalog,
            ObjectKind::Schema => CompletionItemKind::Schema,
            ObjectKind::Table => match object.table_type {
                Some(TableType::View) | Some(TableType::MaterializedView) => {
                    CompletionItemKind::View
                }
                _ => CompletionItemKind::Table,
            },
            ObjectKind::View => CompletionItemKind::View,
            ObjectKind::Column => CompletionItemKind::Column,
            ObjectKind::Function => CompletionItemKind::Function,
            ObjectKind::Procedure => CompletionItemKind::Procedure,
            ObjectKind::Sequence => CompletionItemKind::Sequence,
            ObjectKind::DataType => CompletionItemKind::DataType,
        }
    }
}

/// One ranked proposal
#[derive(Debug, Clone, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub insert_text: String,
    pub kind: CompletionItemKind,
    /// Match quality against the filter, boost included
    pub score: i32,
    /// Type name, table kind or relationship hint
    pub detail: Option<String>,
    #[serde(skip)]
    pub object: Option<Arc<DbObject>>,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, kind: CompletionItemKind) -> Self {
        let label = label.into();
        Self {
            insert_text: label.clone(),
            label,
            kind,
            score: 0,
            detail: None,
            object: None,
        }
    }

    /// Item for a catalog object, labelled with its canonical name
    pub fn for_object(object: Arc<DbObject>) -> Self {
        let kind = CompletionItemKind::for_object(&object);
        let detail = object_detail(&object);
        let label = object.name.clone();
        Self {
            detail,
            object: Some(object),
            ..Self::new(label, kind)
        }
    }

    pub fn with_insert_text(mut self, text: impl Into<String>) -> Self {
        self.insert_text = text.into();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = score;
        self
    }
}

/// Short description shown next to an object proposal
fn object_detail(object: &DbObject) -> Option<String> {
    match object.kind {
        ObjectKind::Column => object.data_type.as_ref().map(|t| t.to_string()),
        ObjectKind::Table | ObjectKind::View => {
            let kind = match (object.kind, object.table_type.as_ref()) {
                (ObjectKind::View, _) | (_, Some(TableType::View)) => "VIEW",
                (_, Some(TableType::MaterializedView)) => "MATERIALIZED VIEW",
                _ => "TABLE",
            };
            let schema = object.parent.as_ref().map(|p| p.name.as_str());
            Some(match schema {
                Some(schema) => format!("{}.{} [{}]", schema, object.name, kind),
                None => format!("{} [{}]", object.name, kind),
            })
        }
        ObjectKind::Function | ObjectKind::Procedure => object
            .routine
            .as_ref()
            .map(|routine| format!("{}{} -> {}", object.name, routine, routine.return_type)),
        ObjectKind::Sequence => Some("SEQUENCE".to_string()),
        ObjectKind::DataType => Some("TYPE".to_string()),
        ObjectKind::Catalog | ObjectKind::Schema => object.comment.clone(),
    }
}

/// Proposals sharing one replacement range
#[derive(Debug, Clone, Serialize)]
pub struct CompletionSet {
    pub replace_start: usize,
    pub replace_len: usize,
    /// Group name for callers rendering sets separately
    pub title: Option<String>,
    pub items: Vec<CompletionItem>,
}

impl CompletionSet {
    pub fn new(replace_start: usize, replace_len: usize) -> Self {
        Self {
            replace_start,
            replace_len,
            title: None,
            items: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn push(&mut self, item: CompletionItem) {
        self.items.push(item);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.label.as_str()).collect()
    }

    /// Drop duplicates, order and cap the items
    ///
    /// With `by_score` the order is score descending, then kind rank, then
    /// case-insensitive label; otherwise score is ignored.
    pub fn finish(&mut self, by_score: bool, max_items: usize) {
        let mut seen = HashSet::new();
        self.items
            .retain(|item| seen.insert((item.label.clone(), item.kind)));
        self.items.sort_by(|a, b| {
            let by_rank = a
                .kind
                .rank()
                .cmp(&b.kind.rank())
                .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
            if by_score {
                b.score.cmp(&a.score).then(by_rank)
            } else {
                by_rank
            }
        });
        self.items.truncate(max_items);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(label: &str, kind: CompletionItemKind, score: i32) -> CompletionItem {
        CompletionItem::new(label, kind).with_score(score)
    }

    #[test]
    fn test_finish_orders_by_score_then_rank() {
        let mut set = CompletionSet::new(0, 0);
        set.push(item("users", CompletionItemKind::Table, 1));
        set.push(item("id", CompletionItemKind::Column, 1));
        set.push(item("Name", CompletionItemKind::Column, 1));
        set.push(item("o.user_id = u.id", CompletionItemKind::JoinCondition, 500));
        set.finish(true, 10);
        assert_eq!(set.labels(), vec!["o.user_id = u.id", "id", "Name", "users"]);
    }

    #[test]
    fn test_finish_dedupes_and_truncates() {
        let mut set = CompletionSet::new(0, 0);
        set.push(item("id", CompletionItemKind::Column, 3));
        set.push(item("id", CompletionItemKind::Column, 1));
        set.push(item("id", CompletionItemKind::ColumnDerived, 1));
        set.push(item("name", CompletionItemKind::Column, 2));
        set.finish(true, 2);
        assert_eq!(set.items.len(), 2);
        assert_eq!(set.items[0].label, "id");
        assert_eq!(set.items[0].score, 3);
        assert_eq!(set.items[1].label, "name");
    }

    #[test]
    fn test_finish_without_scores_uses_rank() {
        let mut set = CompletionSet::new(0, 0);
        set.push(item("users", CompletionItemKind::Table, 200));
        set.push(item("id", CompletionItemKind::Column, 1));
        set.finish(false, 10);
        assert_eq!(set.labels(), vec!["id", "users"]);
    }

    #[test]
    fn test_object_items() {
        let schema = Arc::new(DbObject::new("public", ObjectKind::Schema));
        let view = Arc::new(
            DbObject::new("big_orders", ObjectKind::Table)
                .with_parent(schema)
                .with_table_type(TableType::View),
        );
        let item = CompletionItem::for_object(view);
        assert_eq!(item.kind, CompletionItemKind::View);
        assert_eq!(item.detail.as_deref(), Some("public.big_orders [VIEW]"));
    }

    #[test]
    fn test_table_detail_reads_table_type_through_reference() {
        let schema = Arc::new(DbObject::new("public", ObjectKind::Schema));
        let totals = Arc::new(
            DbObject::new("order_totals", ObjectKind::Table)
                .with_parent(schema.clone())
                .with_table_type(TableType::MaterializedView),
        );
        let item = CompletionItem::for_object(totals.clone());
        assert_eq!(item.kind, CompletionItemKind::View);
        assert_eq!(
            item.detail.as_deref(),
            Some("public.order_totals [MATERIALIZED VIEW]")
        );
        // The object is still usable after its detail was computed
        assert_eq!(totals.table_type, Some(TableType::MaterializedView));

        let users = Arc::new(DbObject::new("users", ObjectKind::Table).with_parent(schema));
        let item = CompletionItem::for_object(users);
        assert_eq!(item.kind, CompletionItemKind::Table);
        assert_eq!(item.detail.as_deref(), Some("public.users [TABLE]"));
    }
}
