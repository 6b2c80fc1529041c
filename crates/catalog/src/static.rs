// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Static Catalog
//!
//! In-memory [`MetadataProvider`] over predefined schema data, used for offline
//! analysis and for tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sql_insight_catalog::StaticCatalog;
//! use sql_insight_ir::{ColumnMetadata, DataType, TableMetadata};
//!
//! let catalog = StaticCatalog::builder()
//!     .with_table(TableMetadata::new("users", "public").with_columns(vec![
//!         ColumnMetadata::new("id", DataType::Integer).with_primary_key(),
//!     ]))
//!     .build();
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use sql_insight_ir::cancel::check;
use sql_insight_ir::{
    CancellationMonitor, CompositeType, DataType, DbObject, ForeignKey, FunctionMetadata,
    FunctionType, ObjectKind, ObjectKindSet, TableMetadata,
};
use tracing::debug;

use crate::snapshot::CatalogSnapshot;
use crate::{CatalogResult, MetadataProvider};

type ObjectKey = (ObjectKind, Vec<String>);

/// Static catalog with predefined schema data
#[derive(Debug, Default)]
pub struct StaticCatalog {
    objects: Vec<Arc<DbObject>>,
    children: HashMap<ObjectKey, Vec<Arc<DbObject>>>,
    associations: HashMap<ObjectKey, Vec<ForeignKey>>,
    default_containers: Vec<Arc<DbObject>>,
}

impl StaticCatalog {
    pub fn builder() -> StaticCatalogBuilder {
        StaticCatalogBuilder::default()
    }

    /// Load a catalog from a YAML snapshot
    pub fn from_yaml_str(text: &str) -> CatalogResult<Self> {
        let snapshot: CatalogSnapshot = serde_yaml::from_str(text)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load a catalog from a JSON snapshot
    pub fn from_json_str(text: &str) -> CatalogResult<Self> {
        let snapshot: CatalogSnapshot = serde_json::from_str(text)?;
        Ok(Self::from_snapshot(snapshot))
    }

    pub fn from_snapshot(snapshot: CatalogSnapshot) -> Self {
        let mut builder = StaticCatalog::builder();
        if let Some(catalog) = snapshot.catalog {
            builder = builder.with_catalog_name(catalog);
        }
        if let Some(schema) = snapshot.default_schema {
            builder = builder.with_default_schema(schema);
        }
        for schema in &snapshot.schemas {
            builder = builder.with_schema(&schema.name);
            for composite in schema.composite_types() {
                builder = builder.with_type(&schema.name, composite);
            }
            for table in schema.tables() {
                builder = builder.with_table(table);
            }
            for function in schema.functions() {
                builder = builder.with_function(&schema.name, function);
            }
            for sequence in &schema.sequences {
                builder = builder.with_sequence(&schema.name, sequence);
            }
        }
        builder.build()
    }

    /// Every object of the given kinds
    pub fn objects(&self, allowed: ObjectKindSet) -> impl Iterator<Item = &Arc<DbObject>> {
        self.objects
            .iter()
            .filter(move |object| allowed.contains(object.kind))
    }

    fn key(object: &DbObject) -> ObjectKey {
        (
            object.kind,
            object.path().into_iter().map(str::to_string).collect(),
        )
    }
}

impl MetadataProvider for StaticCatalog {
    fn find_real_objects(
        &self,
        monitor: &dyn CancellationMonitor,
        allowed: ObjectKindSet,
        parts: &[String],
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        check(monitor)?;
        if parts.is_empty() {
            return Ok(Vec::new());
        }
        let found: Vec<Arc<DbObject>> = self
            .objects(allowed)
            .filter(|object| {
                let path = object.path();
                path.len() >= parts.len()
                    && path[path.len() - parts.len()..]
                        .iter()
                        .zip(parts)
                        .all(|(a, b)| *a == b.as_str())
            })
            .cloned()
            .collect();
        debug!("find_real_objects({:?}) -> {} match(es)", parts, found.len());
        Ok(found)
    }

    fn children(
        &self,
        monitor: &dyn CancellationMonitor,
        container: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        check(monitor)?;
        Ok(self
            .children
            .get(&Self::key(container))
            .cloned()
            .unwrap_or_default())
    }

    fn default_containers(
        &self,
        monitor: &dyn CancellationMonitor,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        check(monitor)?;
        Ok(self.default_containers.clone())
    }

    fn attributes(
        &self,
        monitor: &dyn CancellationMonitor,
        entity: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        Ok(self
            .children(monitor, entity)?
            .into_iter()
            .filter(|child| child.kind == ObjectKind::Column)
            .collect())
    }

    fn associations(
        &self,
        monitor: &dyn CancellationMonitor,
        entity: &DbObject,
    ) -> CatalogResult<Vec<ForeignKey>> {
        check(monitor)?;
        Ok(self
            .associations
            .get(&Self::key(entity))
            .cloned()
            .unwrap_or_default())
    }
}

/// Builder for [`StaticCatalog`]
///
/// Objects are materialized in [`build`](Self::build) so that foreign keys and
/// composite column types can refer to objects declared later.
#[derive(Debug, Default)]
pub struct StaticCatalogBuilder {
    catalog_name: Option<String>,
    default_schema: Option<String>,
    schemas: Vec<String>,
    tables: Vec<TableMetadata>,
    functions: Vec<(String, FunctionMetadata)>,
    types: Vec<(String, CompositeType)>,
    sequences: Vec<(String, String)>,
}

impl StaticCatalogBuilder {
    /// Builder method: nest every schema under a catalog object
    pub fn with_catalog_name(mut self, name: impl Into<String>) -> Self {
        self.catalog_name = Some(name.into());
        self
    }

    /// Builder method: schema searched for unqualified names
    pub fn with_default_schema(mut self, name: impl Into<String>) -> Self {
        self.default_schema = Some(name.into());
        self
    }

    /// Builder method: declare an (possibly empty) schema
    pub fn with_schema(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.schemas.contains(&name) {
            self.schemas.push(name);
        }
        self
    }

    /// Builder method: add a table; its schema is declared implicitly
    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self = self.with_schema(table.schema.clone());
        self.tables.push(table);
        self
    }

    /// Builder method: add a function or procedure (overloads allowed)
    pub fn with_function(mut self, schema: impl Into<String>, function: FunctionMetadata) -> Self {
        let schema = schema.into();
        self = self.with_schema(schema.clone());
        self.functions.push((schema, function));
        self
    }

    /// Builder method: add a composite data type
    pub fn with_type(mut self, schema: impl Into<String>, composite: CompositeType) -> Self {
        let schema = schema.into();
        self = self.with_schema(schema.clone());
        self.types.push((schema, composite));
        self
    }

    /// Builder method: add a sequence
    pub fn with_sequence(mut self, schema: impl Into<String>, name: impl Into<String>) -> Self {
        let schema = schema.into();
        self = self.with_schema(schema.clone());
        self.sequences.push((schema, name.into()));
        self
    }

    pub fn build(self) -> StaticCatalog {
        let mut catalog = StaticCatalog::default();
        let root = self
            .catalog_name
            .map(|name| Arc::new(DbObject::new(name, ObjectKind::Catalog)));
        if let Some(root) = &root {
            catalog.insert(root.clone());
        }

        let mut schemas: HashMap<String, Arc<DbObject>> = HashMap::new();
        for name in &self.schemas {
            let mut schema = DbObject::new(name, ObjectKind::Schema);
            if let Some(root) = &root {
                schema = schema.with_parent(root.clone());
            }
            let schema = Arc::new(schema);
            catalog.insert(schema.clone());
            schemas.insert(name.clone(), schema);
        }

        for (schema_name, composite) in self.types {
            if let Some(schema) = schemas.get(&schema_name) {
                let object = DbObject::new(&composite.name, ObjectKind::DataType)
                    .with_parent(schema.clone())
                    .with_data_type(DataType::Composite(composite));
                catalog.insert(Arc::new(object));
            }
        }

        let mut tables: Vec<(Arc<DbObject>, &TableMetadata)> = Vec::new();
        for table in &self.tables {
            let Some(schema) = schemas.get(&table.schema) else {
                continue;
            };
            let entity = Arc::new(
                DbObject::new(&table.name, ObjectKind::Table)
                    .with_parent(schema.clone())
                    .with_comment(table.comment.clone())
                    .with_table_type(table.table_type.clone()),
            );
            catalog.insert(entity.clone());
            for column in &table.columns {
                let object = DbObject::new(&column.name, ObjectKind::Column)
                    .with_parent(entity.clone())
                    .with_data_type(column.data_type.clone())
                    .with_comment(column.comment.clone());
                catalog.insert(Arc::new(object));
            }
            tables.push((entity, table));
        }

        for (entity, table) in &tables {
            for column in &table.columns {
                let Some(reference) = &column.references else {
                    continue;
                };
                let target = tables.iter().find(|(candidate, _)| {
                    let qualified = candidate.qualified_name();
                    candidate.name == reference.table
                        || qualified.ends_with(&format!(".{}", reference.table))
                });
                if let Some((target, _)) = target {
                    let key = StaticCatalog::key(entity);
                    catalog.associations.entry(key).or_default().push(ForeignKey {
                        name: format!("fk_{}_{}", table.name, column.name),
                        source_columns: vec![column.name.clone()],
                        target: target.clone(),
                        target_columns: vec![reference.column.clone()],
                    });
                }
            }
        }

        for (schema_name, function) in self.functions {
            if let Some(schema) = schemas.get(&schema_name) {
                let kind = if function.function_type == FunctionType::Procedure {
                    ObjectKind::Procedure
                } else {
                    ObjectKind::Function
                };
                let object = DbObject::new(&function.name, kind)
                    .with_parent(schema.clone())
                    .with_comment(function.description.clone())
                    .with_data_type(function.return_type.clone())
                    .with_routine(function.signature());
                catalog.insert(Arc::new(object));
            }
        }

        for (schema_name, name) in self.sequences {
            if let Some(schema) = schemas.get(&schema_name) {
                let object = DbObject::new(name, ObjectKind::Sequence)
                    .with_parent(schema.clone())
                    .with_data_type(DataType::BigInt);
                catalog.insert(Arc::new(object));
            }
        }

        catalog.default_containers = match self.default_schema.and_then(|s| schemas.remove(&s)) {
            Some(schema) => vec![schema],
            None => self
                .schemas
                .iter()
                .filter_map(|name| schemas.get(name).cloned())
                .collect(),
        };
        catalog
    }
}

impl StaticCatalog {
    fn insert(&mut self, object: Arc<DbObject>) {
        if let Some(parent) = &object.parent {
            self.children
                .entry(Self::key(parent))
                .or_default()
                .push(object.clone());
        }
        self.objects.push(object);
    }
}
