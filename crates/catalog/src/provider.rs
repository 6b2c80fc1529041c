// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata provider trait
//!
//! Name resolution and completion never talk to a database directly. They go
//! through [`MetadataProvider`], which may be backed by a live connection, a
//! snapshot file or an in-memory fixture.

use crate::error::CatalogResult;
use sql_insight_ir::{CancellationMonitor, DbObject, ForeignKey, ObjectKindSet};
use std::sync::Arc;

/// Read-only source of database metadata
///
/// Every operation receives the caller's cancellation monitor. Implementations
/// backed by remote calls should check it before each round trip and return
/// [`CatalogError::Canceled`](crate::CatalogError::Canceled) when signalled.
///
/// # Examples
///
/// ```rust,ignore
/// use sql_insight_catalog::MetadataProvider;
/// use sql_insight_ir::{NeverCancel, ObjectKindSet};
///
/// fn table_exists(provider: &dyn MetadataProvider, name: &str) -> bool {
///     provider
///         .find_real_objects(&NeverCancel, ObjectKindSet::ROWS_SOURCES, &[name.to_string()])
///         .map(|found| !found.is_empty())
///         .unwrap_or(false)
/// }
/// ```
pub trait MetadataProvider: Send + Sync {
    /// Objects whose name path ends with `parts`, restricted to `allowed` kinds
    ///
    /// Matching is exact on canonical names. `["users"]` finds every table named
    /// `users`; `["public", "users"]` only the one in schema `public`.
    fn find_real_objects(
        &self,
        monitor: &dyn CancellationMonitor,
        allowed: ObjectKindSet,
        parts: &[String],
    ) -> CatalogResult<Vec<Arc<DbObject>>>;

    /// Immediate children of a container or entity
    fn children(
        &self,
        monitor: &dyn CancellationMonitor,
        container: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>>;

    /// Containers searched for unqualified names (the search path)
    fn default_containers(
        &self,
        monitor: &dyn CancellationMonitor,
    ) -> CatalogResult<Vec<Arc<DbObject>>>;

    /// Columns of a table or view
    fn attributes(
        &self,
        monitor: &dyn CancellationMonitor,
        entity: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>>;

    /// Foreign keys declared on `entity`
    fn associations(
        &self,
        monitor: &dyn CancellationMonitor,
        entity: &DbObject,
    ) -> CatalogResult<Vec<ForeignKey>>;

    /// Whether the provider can enumerate catalog contents right now
    fn is_connected(&self) -> bool {
        true
    }
}
