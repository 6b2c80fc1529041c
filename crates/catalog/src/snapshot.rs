// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Schema snapshots
//!
//! Offline description of a database, loadable from YAML or JSON:
//!
//! ```yaml
//! catalog: shop
//! default_schema: public
//! schemas:
//!   - name: public
//!     tables:
//!       - name: users
//!         columns:
//!           - { name: id, type: integer, primary_key: true }
//!           - { name: address, type: address }
//!       - name: orders
//!         columns:
//!           - { name: user_id, type: integer, references: users.id }
//!     functions:
//!       - name: total
//!         returns: decimal
//!         parameters:
//!           - { name: order_id, type: integer }
//!     types:
//!       - name: address
//!         fields:
//!           - { name: city, type: text }
//!     sequences: [order_seq]
//! ```

use serde::Deserialize;
use sql_insight_ir::{
    ColumnMetadata, CompositeType, DataType, FunctionMetadata, FunctionParameter, FunctionType,
    TableMetadata, TableType,
};

/// Root of a schema snapshot document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSnapshot {
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub default_schema: Option<String>,
    #[serde(default)]
    pub schemas: Vec<SchemaSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchemaSnapshot {
    pub name: String,
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
    #[serde(default)]
    pub functions: Vec<FunctionSnapshot>,
    #[serde(default)]
    pub types: Vec<TypeSnapshot>,
    #[serde(default)]
    pub sequences: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableSnapshot {
    pub name: String,
    #[serde(default)]
    pub kind: TableType,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// `table.column` target of a foreign key
    #[serde(default)]
    pub references: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionSnapshot {
    pub name: String,
    #[serde(default = "default_return_type")]
    pub returns: String,
    #[serde(default)]
    pub kind: FunctionType,
    #[serde(default)]
    pub parameters: Vec<ParameterSnapshot>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_return_type() -> String {
    "void".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParameterSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub variadic: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TypeSnapshot {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldSnapshot>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FieldSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
}

impl SchemaSnapshot {
    /// Resolve a type name against this schema's composite types first
    fn data_type(&self, name: &str) -> DataType {
        self.types
            .iter()
            .find(|t| t.name == name)
            .map(|t| DataType::Composite(self.composite(t)))
            .unwrap_or_else(|| DataType::from_name(name))
    }

    fn composite(&self, snapshot: &TypeSnapshot) -> CompositeType {
        snapshot
            .fields
            .iter()
            .fold(CompositeType::new(&snapshot.name), |composite, field| {
                composite.with_field(&field.name, DataType::from_name(&field.data_type))
            })
    }

    pub(crate) fn composite_types(&self) -> Vec<CompositeType> {
        self.types.iter().map(|t| self.composite(t)).collect()
    }

    pub(crate) fn tables(&self) -> Vec<TableMetadata> {
        self.tables
            .iter()
            .map(|table| {
                let columns = table
                    .columns
                    .iter()
                    .map(|column| {
                        let mut metadata =
                            ColumnMetadata::new(&column.name, self.data_type(&column.data_type))
                                .with_nullable(column.nullable);
                        if column.primary_key {
                            metadata = metadata.with_primary_key();
                        }
                        if let Some(comment) = &column.comment {
                            metadata = metadata.with_comment(comment);
                        }
                        if let Some((table, target)) =
                            column.references.as_deref().and_then(|r| r.rsplit_once('.'))
                        {
                            metadata = metadata.with_foreign_key(table, target);
                        }
                        metadata
                    })
                    .collect();
                let mut metadata = TableMetadata::new(&table.name, &self.name)
                    .with_columns(columns)
                    .with_type(table.kind.clone());
                if let Some(comment) = &table.comment {
                    metadata = metadata.with_comment(comment);
                }
                metadata
            })
            .collect()
    }

    pub(crate) fn functions(&self) -> Vec<FunctionMetadata> {
        self.functions
            .iter()
            .map(|function| {
                let parameters = function
                    .parameters
                    .iter()
                    .map(|p| {
                        let mut parameter =
                            FunctionParameter::new(&p.name, self.data_type(&p.data_type));
                        if p.default {
                            parameter = parameter.with_default();
                        }
                        if p.variadic {
                            parameter = parameter.variadic();
                        }
                        parameter
                    })
                    .collect();
                let mut metadata =
                    FunctionMetadata::new(&function.name, self.data_type(&function.returns))
                        .with_parameters(parameters)
                        .with_type(function.kind);
                if let Some(description) = &function.description {
                    metadata = metadata.with_description(description);
                }
                metadata
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_types_resolve_composites() {
        let schema: SchemaSnapshot = serde_json::from_value(serde_json::json!({
            "name": "public",
            "tables": [{
                "name": "users",
                "columns": [
                    {"name": "id", "type": "integer", "primary_key": true},
                    {"name": "home", "type": "address"}
                ]
            }],
            "types": [{"name": "address", "fields": [{"name": "city", "type": "text"}]}]
        }))
        .unwrap();

        let tables = schema.tables();
        let home = tables[0].get_column("home").unwrap();
        let composite = home.data_type.as_composite().unwrap();
        assert_eq!(composite.name, "address");
        assert!(composite.field("city").is_some());
        assert!(tables[0].get_column("id").unwrap().is_primary_key);
    }
}
