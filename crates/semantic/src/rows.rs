// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Rows sources and query scopes
//!
//! A query scope owns the rows sources of one `SELECT` (or DML statement) and
//! the result columns it produces. Nested scalar subqueries see their parent's
//! sources; derived tables do not.

use serde::Serialize;
use sql_insight_ir::{DataType, DbObject, TextRange};
use std::sync::Arc;

use crate::symbol::SymbolEntryId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct QueryScopeId(pub(crate) u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowsSourceId(pub(crate) u32);

/// Column produced by a query or exposed by a rows source
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: Option<DataType>,
    /// Real column this one comes from
    pub object: Option<Arc<DbObject>>,
    /// Occurrence that introduced the name (select alias, CTE column list)
    pub entry: Option<SymbolEntryId>,
}

impl ResultColumn {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: None,
            object: None,
            entry: None,
        }
    }

    /// Column backed by a real catalog column
    pub fn from_object(object: Arc<DbObject>) -> Self {
        Self {
            name: object.name.clone(),
            data_type: object.data_type.clone(),
            object: Some(object),
            entry: None,
        }
    }

    /// Builder method: set data type
    pub fn with_data_type(mut self, data_type: Option<DataType>) -> Self {
        self.data_type = data_type;
        self
    }

    /// Builder method: set introducing occurrence
    pub fn with_entry(mut self, entry: SymbolEntryId) -> Self {
        self.entry = Some(entry);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowsSourceKind {
    /// Real table or view
    Table(Arc<DbObject>),
    /// `(SELECT ...) alias`
    Derived(QueryScopeId),
    /// `WITH name AS (...)` declaration
    Cte(QueryScopeId),
    /// Use of a CTE declared in an enclosing `WITH`
    CteReference(RowsSourceId),
    /// Name that did not resolve
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct RowsSource {
    pub id: RowsSourceId,
    pub query: QueryScopeId,
    pub kind: RowsSourceKind,
    /// Canonical name of a CTE, or of the table as written
    pub name: Option<String>,
    /// Canonical alias and its declaring occurrence
    pub alias: Option<(String, SymbolEntryId)>,
    pub range: TextRange,
    pub columns: Vec<ResultColumn>,
    /// Whether `columns` is the complete column list
    pub columns_known: bool,
}

impl RowsSource {
    /// Real table behind this source
    pub fn table(&self) -> Option<&Arc<DbObject>> {
        match &self.kind {
            RowsSourceKind::Table(object) => Some(object),
            _ => None,
        }
    }

    /// Whether columns of this source are computed rather than catalog columns
    pub fn is_derived(&self) -> bool {
        matches!(
            self.kind,
            RowsSourceKind::Derived(_) | RowsSourceKind::Cte(_) | RowsSourceKind::CteReference(_)
        )
    }

    pub fn column(&self, name: &str) -> Option<(usize, &ResultColumn)> {
        self.columns.iter().enumerate().find(|(_, c)| c.name == name)
    }

    /// Name used to refer to this source inside the query
    pub fn reference_name(&self) -> Option<String> {
        if let Some((alias, _)) = &self.alias {
            return Some(alias.clone());
        }
        match &self.kind {
            RowsSourceKind::Table(object) => Some(object.name.clone()),
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueryScope {
    pub id: QueryScopeId,
    pub parent: Option<QueryScopeId>,
    /// Whether unresolved columns are looked up in the parent query
    pub correlated: bool,
    pub range: TextRange,
    pub sources: Vec<RowsSourceId>,
    /// CTE declarations of this query's `WITH` clause
    pub ctes: Vec<RowsSourceId>,
    pub result: Vec<ResultColumn>,
}

/// Arena of query scopes and rows sources
#[derive(Debug, Clone, Default)]
pub struct RowsModel {
    queries: Vec<QueryScope>,
    sources: Vec<RowsSource>,
}

impl RowsModel {
    pub fn add_query(
        &mut self,
        parent: Option<QueryScopeId>,
        correlated: bool,
        range: TextRange,
    ) -> QueryScopeId {
        let id = QueryScopeId(self.queries.len() as u32);
        self.queries.push(QueryScope {
            id,
            parent,
            correlated,
            range,
            sources: Vec::new(),
            ctes: Vec::new(),
            result: Vec::new(),
        });
        id
    }

    pub fn query(&self, id: QueryScopeId) -> &QueryScope {
        &self.queries[id.0 as usize]
    }

    pub fn query_mut(&mut self, id: QueryScopeId) -> &mut QueryScope {
        &mut self.queries[id.0 as usize]
    }

    pub fn queries(&self) -> impl Iterator<Item = &QueryScope> {
        self.queries.iter()
    }

    pub fn add_source(
        &mut self,
        query: QueryScopeId,
        kind: RowsSourceKind,
        name: Option<String>,
        range: TextRange,
    ) -> RowsSourceId {
        let id = RowsSourceId(self.sources.len() as u32);
        self.sources.push(RowsSource {
            id,
            query,
            kind,
            name,
            alias: None,
            range,
            columns: Vec::new(),
            columns_known: false,
        });
        id
    }

    /// Attach a source to the FROM list of its query
    pub fn attach_source(&mut self, query: QueryScopeId, source: RowsSourceId) {
        self.query_mut(query).sources.push(source);
    }

    pub fn source(&self, id: RowsSourceId) -> &RowsSource {
        &self.sources[id.0 as usize]
    }

    pub fn source_mut(&mut self, id: RowsSourceId) -> &mut RowsSource {
        &mut self.sources[id.0 as usize]
    }

    /// Query and its ancestors, innermost first
    pub fn ancestry(&self, query: QueryScopeId) -> impl Iterator<Item = &QueryScope> {
        std::iter::successors(Some(self.query(query)), |q| q.parent.map(|p| self.query(p)))
    }

    /// Sources whose columns are visible from `query`, innermost query first
    ///
    /// Parent sources are included only through correlated subqueries.
    pub fn visible_sources(&self, query: QueryScopeId) -> Vec<Vec<RowsSourceId>> {
        let mut levels = Vec::new();
        let mut current = Some(self.query(query));
        while let Some(scope) = current {
            levels.push(scope.sources.clone());
            current = match (scope.correlated, scope.parent) {
                (true, Some(parent)) => Some(self.query(parent)),
                _ => None,
            };
        }
        levels
    }

    /// CTE declared in `query` or an enclosing query under `name`
    pub fn find_cte(&self, query: QueryScopeId, name: &str) -> Option<RowsSourceId> {
        self.ancestry(query)
            .flat_map(|q| q.ctes.iter())
            .copied()
            .find(|id| self.source(*id).name.as_deref() == Some(name))
    }

    /// Source of `query` (or a correlated ancestor) whose alias or table name is `name`
    pub fn find_source_by_name(&self, query: QueryScopeId, parts: &[String]) -> Vec<RowsSourceId> {
        for level in self.visible_sources(query) {
            let found: Vec<RowsSourceId> = level
                .into_iter()
                .filter(|id| self.source_matches(*id, parts))
                .collect();
            if !found.is_empty() {
                return found;
            }
        }
        Vec::new()
    }

    /// Exact alias match, or suffix match against the table's full name
    pub fn source_matches(&self, id: RowsSourceId, parts: &[String]) -> bool {
        let source = self.source(id);
        if let Some((alias, _)) = &source.alias {
            return parts.len() == 1 && *alias == parts[0];
        }
        match &source.kind {
            RowsSourceKind::Table(object) => {
                let path = object.path();
                path.len() >= parts.len()
                    && path[path.len() - parts.len()..]
                        .iter()
                        .zip(parts)
                        .all(|(a, b)| *a == b.as_str())
            }
            _ => parts.len() == 1 && source.name.as_deref() == Some(parts[0].as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_insight_ir::ObjectKind;

    fn users() -> Arc<DbObject> {
        let schema = Arc::new(DbObject::new("public", ObjectKind::Schema));
        Arc::new(DbObject::new("users", ObjectKind::Table).with_parent(schema))
    }

    #[test]
    fn test_source_matching_by_alias_and_suffix() {
        let mut rows = RowsModel::default();
        let query = rows.add_query(None, false, TextRange::new(0, 10));
        let aliased =
            rows.add_source(query, RowsSourceKind::Table(users()), None, TextRange::new(0, 5));
        rows.source_mut(aliased).alias = Some(("u".to_string(), SymbolEntryId(0)));
        rows.attach_source(query, aliased);
        let plain =
            rows.add_source(query, RowsSourceKind::Table(users()), None, TextRange::new(6, 10));
        rows.attach_source(query, plain);

        assert!(rows.source_matches(aliased, &["u".to_string()]));
        assert!(!rows.source_matches(aliased, &["users".to_string()]));
        assert!(rows.source_matches(plain, &["users".to_string()]));
        assert!(rows.source_matches(plain, &["public".to_string(), "users".to_string()]));
        assert_eq!(rows.find_source_by_name(query, &["u".to_string()]), vec![aliased]);
    }

    #[test]
    fn test_correlated_visibility() {
        let mut rows = RowsModel::default();
        let outer = rows.add_query(None, false, TextRange::new(0, 100));
        let source =
            rows.add_source(outer, RowsSourceKind::Table(users()), None, TextRange::new(0, 5));
        rows.attach_source(outer, source);
        let correlated = rows.add_query(Some(outer), true, TextRange::new(10, 50));
        let derived = rows.add_query(Some(outer), false, TextRange::new(60, 90));

        assert_eq!(rows.visible_sources(correlated).len(), 2);
        assert_eq!(rows.visible_sources(derived).len(), 1);
        assert_eq!(
            rows.find_source_by_name(correlated, &["users".to_string()]),
            vec![source]
        );
        assert!(rows.find_source_by_name(derived, &["users".to_string()]).is_empty());
    }
}
