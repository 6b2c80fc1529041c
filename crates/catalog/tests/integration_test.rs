// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! Integration tests for the catalog crate

use std::sync::Arc;

use sql_insight_catalog::{CatalogError, CatalogResult, MetadataProvider, StaticCatalog};
use sql_insight_ir::{
    CancellationMonitor, DbObject, ForeignKey, NeverCancel, ObjectKind, ObjectKindSet,
};

// Provider that has lost its connection, for integration testing
struct DisconnectedCatalog;

impl MetadataProvider for DisconnectedCatalog {
    fn find_real_objects(
        &self,
        _monitor: &dyn CancellationMonitor,
        _allowed: ObjectKindSet,
        _parts: &[String],
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        Err(CatalogError::ConnectionFailed("connection reset".to_string()))
    }

    fn children(
        &self,
        _monitor: &dyn CancellationMonitor,
        _container: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        Err(CatalogError::ConnectionFailed("connection reset".to_string()))
    }

    fn default_containers(
        &self,
        _monitor: &dyn CancellationMonitor,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        Ok(Vec::new())
    }

    fn attributes(
        &self,
        _monitor: &dyn CancellationMonitor,
        _entity: &DbObject,
    ) -> CatalogResult<Vec<Arc<DbObject>>> {
        Err(CatalogError::QueryTimeout(30))
    }

    fn associations(
        &self,
        _monitor: &dyn CancellationMonitor,
        _entity: &DbObject,
    ) -> CatalogResult<Vec<ForeignKey>> {
        Ok(Vec::new())
    }

    fn is_connected(&self) -> bool {
        false
    }
}

const SNAPSHOT: &str = r#"{
  "default_schema": "public",
  "schemas": [
    {
      "name": "public",
      "tables": [
        {
          "name": "users",
          "comment": "User accounts",
          "columns": [
            {"name": "id", "type": "bigint", "primary_key": true, "nullable": false},
            {"name": "email", "type": "varchar(255)"},
            {"name": "address", "type": "address"}
          ]
        },
        {
          "name": "active_users",
          "kind": "view",
          "columns": [{"name": "id", "type": "bigint"}]
        }
      ],
      "functions": [
        {"name": "lower", "returns": "text", "parameters": [{"name": "s", "type": "text"}]},
        {"name": "count", "returns": "bigint", "kind": "aggregate",
         "parameters": [{"name": "v", "type": "any", "variadic": true}]}
      ],
      "types": [
        {"name": "address", "fields": [
          {"name": "city", "type": "text"},
          {"name": "zip", "type": "char(5)"}
        ]}
      ]
    }
  ]
}"#;

fn parts(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_json_snapshot_objects() {
    let catalog = StaticCatalog::from_json_str(SNAPSHOT).unwrap();

    let users = catalog
        .find_real_objects(&NeverCancel, ObjectKindSet::ROWS_SOURCES, &parts(&["users"]))
        .unwrap();
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].comment.as_deref(), Some("User accounts"));
    assert_eq!(users[0].kind_label(), "table");

    let view = catalog
        .find_real_objects(&NeverCancel, ObjectKindSet::ROWS_SOURCES, &parts(&["active_users"]))
        .unwrap();
    assert_eq!(view[0].kind_label(), "view");
}

#[test]
fn test_composite_column_type() {
    let catalog = StaticCatalog::from_json_str(SNAPSHOT).unwrap();
    let address = catalog
        .find_real_objects(
            &NeverCancel,
            ObjectKindSet::COLUMNS,
            &parts(&["users", "address"]),
        )
        .unwrap()
        .remove(0);
    let composite = address
        .data_type
        .as_ref()
        .and_then(|t| t.as_composite())
        .unwrap();
    let fields: Vec<&str> = composite.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(fields, vec!["city", "zip"]);

    let types = catalog
        .find_real_objects(
            &NeverCancel,
            ObjectKindSet::of(&[ObjectKind::DataType]),
            &parts(&["address"]),
        )
        .unwrap();
    assert_eq!(types.len(), 1);
}

#[test]
fn test_variadic_function_signature() {
    let catalog = StaticCatalog::from_json_str(SNAPSHOT).unwrap();
    let count = catalog
        .find_real_objects(&NeverCancel, ObjectKindSet::ROUTINES, &parts(&["count"]))
        .unwrap()
        .remove(0);
    let routine = count.routine.as_ref().unwrap();
    assert!(routine.accepts_argument_count(3));
    assert_eq!(count.unique_name(), "public.count(any)");
}

#[test]
fn test_provider_failures_are_reported() {
    let catalog = DisconnectedCatalog;
    assert!(!catalog.is_connected());
    let result = catalog.find_real_objects(&NeverCancel, ObjectKindSet::ALL, &parts(&["users"]));
    assert!(matches!(result, Err(CatalogError::ConnectionFailed(_))));
    let table = DbObject::new("users", ObjectKind::Table);
    assert!(matches!(
        catalog.attributes(&NeverCancel, &table),
        Err(CatalogError::QueryTimeout(30))
    ));
}
