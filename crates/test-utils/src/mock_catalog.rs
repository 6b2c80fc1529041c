// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Mock catalogs for testing
//!
//! [`MockCatalogBuilder`] wraps the static catalog builder with a ready-made
//! shop schema. [`FailingCatalog`] and [`CancelAfter`] exercise the error and
//! cancellation paths of metadata consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use sql_insight_catalog::{
    CatalogError, CatalogResult, MetadataProvider, StaticCatalog, StaticCatalogBuilder,
};
use sql_insight_ir::{
    CancellationMonitor, ColumnMetadata, CompositeType, DataType, DbObject, ForeignKey,
    FunctionMetadata, FunctionParameter, FunctionType, ObjectKindSet, TableMetadata, TableType,
};

/// Builder for test catalogs with a fluent API
#[derive(Debug)]
pub struct MockCatalogBuilder {
    inner: StaticCatalogBuilder,
}

impl Default for MockCatalogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalogBuilder {
    pub fn new() -> Self {
        Self {
            inner: StaticCatalog::builder().with_default_schema("public"),
        }
    }

    /// Add the standard test schema to `public`
    ///
    /// - `users(id, name)`
    /// - `orders(id, user_id -> users.id, total, status, shipping address)`
    /// - `products(id, name, price)`
    /// - view `big_orders(id, total)`
    /// - composite type `address(street, city, zip)`
    /// - functions `f(integer)`, `f(decimal)`, `g(integer)`, `g(text)`
    /// - procedures `archive_orders(days)` and `archive_orders(days, dry_run)`
    /// - sequence `order_seq`
    pub fn with_standard_schema(mut self) -> Self {
        let address = CompositeType::new("address")
            .with_field("street", DataType::Text)
            .with_field("city", DataType::Text)
            .with_field("zip", DataType::Varchar(Some(10)));

        self.inner = self
            .inner
            .with_type("public", address.clone())
            .with_table(
                TableMetadata::new("users", "public")
                    .with_columns(vec![
                        ColumnMetadata::new("id", DataType::Integer)
                            .with_nullable(false)
                            .with_primary_key(),
                        ColumnMetadata::new("name", DataType::Varchar(Some(100))),
                    ])
                    .with_comment("User accounts"),
            )
            .with_table(TableMetadata::new("orders", "public").with_columns(vec![
                ColumnMetadata::new("id", DataType::Integer)
                    .with_nullable(false)
                    .with_primary_key(),
                ColumnMetadata::new("user_id", DataType::Integer)
                    .with_nullable(false)
                    .with_foreign_key("users", "id"),
                ColumnMetadata::new("total", DataType::Decimal),
                ColumnMetadata::new("status", DataType::Varchar(Some(50))),
                ColumnMetadata::new("shipping", DataType::Composite(address)),
            ]))
            .with_table(TableMetadata::new("products", "public").with_columns(vec![
                ColumnMetadata::new("id", DataType::Integer).with_primary_key(),
                ColumnMetadata::new("name", DataType::Varchar(Some(255))),
                ColumnMetadata::new("price", DataType::Decimal),
            ]))
            .with_table(
                TableMetadata::new("big_orders", "public")
                    .with_type(TableType::View)
                    .with_columns(vec![
                        ColumnMetadata::new("id", DataType::Integer),
                        ColumnMetadata::new("total", DataType::Decimal),
                    ]),
            )
            .with_function(
                "public",
                FunctionMetadata::new("f", DataType::Integer)
                    .with_parameters(vec![FunctionParameter::new("x", DataType::Integer)]),
            )
            .with_function(
                "public",
                FunctionMetadata::new("f", DataType::Decimal)
                    .with_parameters(vec![FunctionParameter::new("x", DataType::Decimal)]),
            )
            .with_function(
                "public",
                FunctionMetadata::new("g", DataType::Integer)
                    .with_parameters(vec![FunctionParameter::new("x", DataType::Integer)]),
            )
            .with_function(
                "public",
                FunctionMetadata::new("g", DataType::Text)
                    .with_parameters(vec![FunctionParameter::new("x", DataType::Text)]),
            )
            .with_function(
                "public",
                FunctionMetadata::new("archive_orders", DataType::Other("void".to_string()))
                    .with_type(FunctionType::Procedure)
                    .with_parameters(vec![FunctionParameter::new("days", DataType::Integer)])
                    .with_description("Move old orders to the archive"),
            )
            .with_function(
                "public",
                FunctionMetadata::new("archive_orders", DataType::Other("void".to_string()))
                    .with_type(FunctionType::Procedure)
                    .with_parameters(vec![
                        FunctionParameter::new("days", DataType::Integer),
                        FunctionParameter::new("dry_run", DataType::Boolean),
                    ]),
            )
            .with_sequence("public", "order_seq");
        self
    }

    /// Add an `archive` schema whose `users` table shadows `public.users`
    pub fn with_archive_schema(mut self) -> Self {
        self.inner = self.inner.with_table(
            TableMetadata::new("users", "archive").with_columns(vec![
                ColumnMetadata::new("id", DataType::Integer),
                ColumnMetadata::new("archived_at", DataType::Timestamp),
            ]),
        );
        self
    }

    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self.inner = self.inner.with_table(table);
        self
    }

    pub fn with_function(mut self, schema: impl Into<String>, function: FunctionMetadata) -> Self {
        self.inner = self.inner.with_function(schema, function);
        self
    }

    pub fn build(self) -> StaticCatalog {
        self.inner.build()
    }

    /// Build and erase the type, ready for a recognizer
    pub fn build_provider(self) -> Arc<dyn MetadataProvider> {
        Arc::new(self.build())
    }

    /// Same catalog, reporting no live connection
    pub fn build_offline_provider(self) -> Arc<dyn MetadataProvider> {
        Arc::new(OfflineCatalog {
            inner: self.build(),
        })
    }
}

/// Answers lookups from a static catalog but reports no live connection
pub struct OfflineCatalog {
    inner: StaticCatalog,
}

impl MetadataProvider for OfflineCatalog {
    fn find_real_objects(
        &self,
        monitor: &dyn CancellationMonitor,
        allowed: ObjectKindSet,
        parts: &[String],
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.inner.find_real_objects(monitor, allowed, parts)
    }

    fn children(
        &self,
        monitor: &dyn CancellationMonitor,
        container: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.inner.children(monitor, container)
    }

    fn default_containers(
        &self,
        monitor: &dyn CancellationMonitor,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.inner.default_containers(monitor)
    }

    fn attributes(
        &self,
        monitor: &dyn CancellationMonitor,
        entity: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.inner.attributes(monitor, entity)
    }

    fn associations(
        &self,
        monitor: &dyn CancellationMonitor,
        entity: &DbObject,
    ) -> CatalogResult<Vec<ForeignKey>> {
        self.inner.associations(monitor, entity)
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Provider whose every lookup fails, as if the connection was lost
#[derive(Debug, Clone)]
pub struct FailingCatalog {
    reason: String,
}

impl FailingCatalog {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn fail<T>(&self) -> CatalogResult<T> {
        Err(CatalogError::ConnectionFailed(self.reason.clone()))
    }
}

impl Default for FailingCatalog {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

impl MetadataProvider for FailingCatalog {
    fn find_real_objects(
        &self,
        _monitor: &dyn CancellationMonitor,
        _allowed: ObjectKindSet,
        _parts: &[String],
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.fail()
    }

    fn children(
        &self,
        _monitor: &dyn CancellationMonitor,
        _container: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.fail()
    }

    fn default_containers(
        &self,
        _monitor: &dyn CancellationMonitor,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.fail()
    }

    fn attributes(
        &self,
        _monitor: &dyn CancellationMonitor,
        _entity: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        self.fail()
    }

    fn associations(
        &self,
        _monitor: &dyn CancellationMonitor,
        _entity: &DbObject,
    ) -> CatalogResult<Vec<ForeignKey>> {
        self.fail()
    }

    fn is_connected(&self) -> bool {
        false
    }
}

/// Monitor that reports cancellation once it has been polled `checks` times
#[derive(Debug)]
pub struct CancelAfter {
    remaining: AtomicUsize,
}

impl CancelAfter {
    pub fn new(checks: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(checks),
        }
    }
}

impl CancellationMonitor for CancelAfter {
    fn is_canceled(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sql_insight_ir::{NeverCancel, ObjectKind};

    fn parts(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_standard_schema_contents() {
        let catalog = MockCatalogBuilder::new().with_standard_schema().build();
        let users = catalog
            .find_real_objects(&NeverCancel, ObjectKindSet::ROWS_SOURCES, &parts(&["users"]))
            .unwrap();
        assert_eq!(users.len(), 1);
        let columns = catalog.attributes(&NeverCancel, &users[0]).unwrap();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "name"]);

        let overloads = catalog
            .find_real_objects(&NeverCancel, ObjectKindSet::ROUTINES, &parts(&["archive_orders"]))
            .unwrap();
        assert_eq!(overloads.len(), 2);
        assert!(overloads.iter().all(|o| o.kind == ObjectKind::Procedure));
    }

    #[test]
    fn test_archive_schema_makes_users_ambiguous() {
        let catalog = MockCatalogBuilder::new()
            .with_standard_schema()
            .with_archive_schema()
            .build();
        let users = catalog
            .find_real_objects(&NeverCancel, ObjectKindSet::ROWS_SOURCES, &parts(&["users"]))
            .unwrap();
        assert_eq!(users.len(), 2);
    }

    #[test]
    fn test_failing_catalog() {
        let catalog = FailingCatalog::default();
        assert!(!catalog.is_connected());
        let result = catalog.default_containers(&NeverCancel);
        assert!(matches!(result, Err(CatalogError::ConnectionFailed(_))));
    }

    #[test]
    fn test_cancel_after_counts_down() {
        let monitor = CancelAfter::new(2);
        assert!(!monitor.is_canceled());
        assert!(!monitor.is_canceled());
        assert!(monitor.is_canceled());
        assert!(monitor.is_canceled());
    }
}
