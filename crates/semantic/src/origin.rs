// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Symbol origins
//!
//! An origin records how an occurrence is to be resolved, independently of
//! whether resolution succeeded. Completion reads it back to decide which names
//! are valid at a cursor sitting on (or right after) the occurrence.

use sql_insight_ir::{CompositeType, DbObject, ObjectKindSet};
use std::sync::Arc;

use crate::rows::{QueryScopeId, RowsSourceId};

/// Closed set of resolution scopes
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolOrigin {
    /// Child name of an already resolved object (`schema.|`)
    ObjectScope {
        object: Arc<DbObject>,
        allowed: ObjectKindSet,
    },
    /// Object name resolved against the catalog and the query's named sources
    ContextScope {
        query: QueryScopeId,
        allowed: ObjectKindSet,
    },
    /// Column of one specific rows source (`alias.|`)
    ColumnFromSource { source: RowsSourceId },
    /// Field of a composite value (`t.address.|`)
    MemberOfType { data_type: CompositeType },
    /// Reference to a rows source already introduced in the query
    RowsSourceRef { query: QueryScopeId },
    /// Value position where any in-scope column may appear
    RowsDataRef { query: QueryScopeId },
    /// Column name of a fixed rows source (INSERT column list, SET target)
    ColumnNameFromRowsData { source: RowsSourceId },
    /// Whole-row placeholder (`*`, `t.*`)
    ExpandableTupleRef {
        query: QueryScopeId,
        source: Option<RowsSourceId>,
    },
    /// Classified without a statement model
    SyntaxFallback,
}

impl SymbolOrigin {
    /// Whether resolving this origin depends on another symbol being resolved first
    pub fn is_chained(&self) -> bool {
        match self {
            SymbolOrigin::ObjectScope { .. }
            | SymbolOrigin::ColumnFromSource { .. }
            | SymbolOrigin::MemberOfType { .. } => true,
            SymbolOrigin::ExpandableTupleRef { source, .. } => source.is_some(),
            SymbolOrigin::ContextScope { .. }
            | SymbolOrigin::RowsSourceRef { .. }
            | SymbolOrigin::RowsDataRef { .. }
            | SymbolOrigin::ColumnNameFromRowsData { .. }
            | SymbolOrigin::SyntaxFallback => false,
        }
    }

    /// Query whose scope this origin belongs to, when it names one directly
    pub fn query(&self) -> Option<QueryScopeId> {
        match self {
            SymbolOrigin::ContextScope { query, .. }
            | SymbolOrigin::RowsSourceRef { query }
            | SymbolOrigin::RowsDataRef { query }
            | SymbolOrigin::ExpandableTupleRef { query, .. } => Some(*query),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_insight_ir::ObjectKind;

    #[test]
    fn test_chained_variants() {
        let object = Arc::new(DbObject::new("public", ObjectKind::Schema));
        assert!(
            SymbolOrigin::ObjectScope {
                object,
                allowed: ObjectKindSet::ROWS_SOURCES
            }
            .is_chained()
        );
        assert!(SymbolOrigin::ColumnFromSource { source: RowsSourceId(0) }.is_chained());
        assert!(!SymbolOrigin::RowsDataRef { query: QueryScopeId(0) }.is_chained());
        assert!(
            !SymbolOrigin::ExpandableTupleRef {
                query: QueryScopeId(0),
                source: None
            }
            .is_chained()
        );
        assert!(!SymbolOrigin::SyntaxFallback.is_chained());
    }
}
