// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Metadata types for database schema information
//!
//! This module defines the types used to represent database schema metadata.
//! Two layers live here:
//!
//! - Description types (`TableMetadata`, `ColumnMetadata`, `FunctionMetadata`)
//!   used to populate a catalog
//! - The object model (`DbObject`, `ObjectKind`, `ForeignKey`) that a metadata
//!   provider hands back to name resolution

use crate::dialect::SqlDialect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// SQL data types (unified across dialects)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    // Numeric types
    Integer,
    BigInt,
    SmallInt,
    TinyInt,
    Decimal,
    Float,
    Double,

    // String types
    Varchar(Option<usize>),
    Char(Option<usize>),
    Text,

    // Binary types
    Binary,
    Blob,

    // Date/Time types
    Date,
    Time,
    DateTime,
    Timestamp,

    Boolean,
    Json,
    Uuid,
    Array(Box<DataType>),

    /// Structured type whose fields are reachable through member access
    Composite(CompositeType),

    // Unknown/Other (with original type name)
    Other(String),
}

/// Named structured type (`CREATE TYPE address AS (street text, ...)`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeType {
    pub name: String,
    pub fields: Vec<CompositeField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositeField {
    pub name: String,
    pub data_type: DataType,
}

impl CompositeType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder method: append a field
    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.push(CompositeField {
            name: name.into(),
            data_type,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&CompositeField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Coarse classification of data types used for argument compatibility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    Numeric,
    String,
    Binary,
    DateTime,
    Boolean,
    Json,
    Uuid,
    Array,
    Composite,
    Unknown,
}

impl DataKind {
    /// Whether a value of kind `argument` may be passed where `self` is expected
    pub fn accepts(self, argument: DataKind) -> bool {
        if self == DataKind::Unknown || argument == DataKind::Unknown || self == argument {
            return true;
        }
        matches!(
            (self, argument),
            (DataKind::String, DataKind::Uuid)
                | (DataKind::DateTime, DataKind::String)
                | (DataKind::Json, DataKind::String)
                | (DataKind::Uuid, DataKind::String)
        )
    }
}

impl DataType {
    pub fn kind(&self) -> DataKind {
        match self {
            DataType::Integer
            | DataType::BigInt
            | DataType::SmallInt
            | DataType::TinyInt
            | DataType::Decimal
            | DataType::Float
            | DataType::Double => DataKind::Numeric,
            DataType::Varchar(_) | DataType::Char(_) | DataType::Text => DataKind::String,
            DataType::Binary | DataType::Blob => DataKind::Binary,
            DataType::Date | DataType::Time | DataType::DateTime | DataType::Timestamp => {
                DataKind::DateTime
            }
            DataType::Boolean => DataKind::Boolean,
            DataType::Json => DataKind::Json,
            DataType::Uuid => DataKind::Uuid,
            DataType::Array(_) => DataKind::Array,
            DataType::Composite(_) => DataKind::Composite,
            DataType::Other(_) => DataKind::Unknown,
        }
    }

    pub fn as_composite(&self) -> Option<&CompositeType> {
        match self {
            DataType::Composite(composite) => Some(composite),
            _ => None,
        }
    }

    /// Parse a type name as written in DDL or in a catalog snapshot
    ///
    /// Unrecognized names are kept verbatim in [`DataType::Other`].
    pub fn from_name(name: &str) -> DataType {
        let trimmed = name.trim();
        if let Some(element) = trimmed.strip_suffix("[]") {
            return DataType::Array(Box::new(DataType::from_name(element)));
        }
        let (base, length) = match trimmed.split_once('(') {
            Some((base, rest)) => (
                base.trim(),
                rest.trim_end_matches(')')
                    .split(',')
                    .next()
                    .and_then(|n| n.trim().parse::<usize>().ok()),
            ),
            None => (trimmed, None),
        };
        match base.to_ascii_lowercase().as_str() {
            "int" | "integer" | "int4" | "mediumint" | "serial" => DataType::Integer,
            "bigint" | "int8" | "bigserial" => DataType::BigInt,
            "smallint" | "int2" => DataType::SmallInt,
            "tinyint" => DataType::TinyInt,
            "decimal" | "numeric" | "number" => DataType::Decimal,
            "float" | "real" | "float4" => DataType::Float,
            "double" | "double precision" | "float8" => DataType::Double,
            "varchar" | "character varying" | "varchar2" | "nvarchar" => DataType::Varchar(length),
            "char" | "character" | "nchar" => DataType::Char(length),
            "text" | "clob" | "longtext" | "mediumtext" => DataType::Text,
            "binary" | "varbinary" | "bytea" | "raw" => DataType::Binary,
            "blob" | "longblob" => DataType::Blob,
            "date" => DataType::Date,
            "time" => DataType::Time,
            "datetime" => DataType::DateTime,
            "timestamp" | "timestamptz" => DataType::Timestamp,
            "bool" | "boolean" => DataType::Boolean,
            "json" | "jsonb" => DataType::Json,
            "uuid" => DataType::Uuid,
            _ => DataType::Other(trimmed.to_string()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => f.write_str("INTEGER"),
            DataType::BigInt => f.write_str("BIGINT"),
            DataType::SmallInt => f.write_str("SMALLINT"),
            DataType::TinyInt => f.write_str("TINYINT"),
            DataType::Decimal => f.write_str("DECIMAL"),
            DataType::Float => f.write_str("FLOAT"),
            DataType::Double => f.write_str("DOUBLE"),
            DataType::Varchar(Some(n)) => write!(f, "VARCHAR({n})"),
            DataType::Varchar(None) => f.write_str("VARCHAR"),
            DataType::Char(Some(n)) => write!(f, "CHAR({n})"),
            DataType::Char(None) => f.write_str("CHAR"),
            DataType::Text => f.write_str("TEXT"),
            DataType::Binary => f.write_str("BINARY"),
            DataType::Blob => f.write_str("BLOB"),
            DataType::Date => f.write_str("DATE"),
            DataType::Time => f.write_str("TIME"),
            DataType::DateTime => f.write_str("DATETIME"),
            DataType::Timestamp => f.write_str("TIMESTAMP"),
            DataType::Boolean => f.write_str("BOOLEAN"),
            DataType::Json => f.write_str("JSON"),
            DataType::Uuid => f.write_str("UUID"),
            DataType::Array(element) => write!(f, "{element}[]"),
            DataType::Composite(composite) => f.write_str(&composite.name),
            DataType::Other(name) => f.write_str(name),
        }
    }
}

/// Table type classification
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableType {
    #[default]
    Table,
    View,
    MaterializedView,
    Temporary,
    System,
}

/// Reference to a table (for foreign keys)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableReference {
    pub table: String,
    pub column: String,
}

/// Metadata for a database column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMetadata {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
    pub comment: Option<String>,
    pub is_primary_key: bool,
    /// Referenced table (if foreign key)
    pub references: Option<TableReference>,
}

impl ColumnMetadata {
    /// Create a new column metadata with builder pattern
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: false,
            comment: None,
            is_primary_key: false,
            references: None,
        }
    }

    /// Builder method: set nullable
    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Builder method: set comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builder method: mark as primary key
    pub fn with_primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    /// Builder method: set foreign key reference
    pub fn with_foreign_key(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.references = Some(TableReference {
            table: table.into(),
            column: column.into(),
        });
        self
    }
}

/// Metadata for a database table
#[derive(Debug, Clone, PartialEq)]
pub struct TableMetadata {
    pub name: String,
    /// Schema/database name
    pub schema: String,
    pub columns: Vec<ColumnMetadata>,
    pub comment: Option<String>,
    pub table_type: TableType,
}

impl TableMetadata {
    /// Create new table metadata with builder pattern
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
            columns: Vec::new(),
            comment: None,
            table_type: TableType::Table,
        }
    }

    /// Builder method: add columns
    pub fn with_columns(mut self, columns: Vec<ColumnMetadata>) -> Self {
        self.columns = columns;
        self
    }

    /// Builder method: set comment
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Builder method: set table type
    pub fn with_type(mut self, table_type: TableType) -> Self {
        self.table_type = table_type;
        self
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Function parameter definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionParameter {
    pub name: String,
    pub data_type: DataType,
    /// Whether the parameter may be omitted
    pub has_default: bool,
    /// Whether this parameter absorbs any number of trailing arguments
    pub is_variadic: bool,
}

impl FunctionParameter {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            has_default: false,
            is_variadic: false,
        }
    }

    /// Builder method: parameter may be omitted
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    /// Builder method: parameter is variadic
    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }
}

/// Function classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionType {
    #[default]
    Scalar,
    Aggregate,
    Window,
    Table,
    Procedure,
}

/// Metadata for a database function or procedure
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionMetadata {
    pub name: String,
    pub return_type: DataType,
    pub parameters: Vec<FunctionParameter>,
    pub function_type: FunctionType,
    pub description: Option<String>,
}

impl FunctionMetadata {
    /// Create new function metadata with builder pattern
    pub fn new(name: impl Into<String>, return_type: DataType) -> Self {
        Self {
            name: name.into(),
            return_type,
            parameters: Vec::new(),
            function_type: FunctionType::Scalar,
            description: None,
        }
    }

    /// Builder method: add parameters
    pub fn with_parameters(mut self, params: Vec<FunctionParameter>) -> Self {
        self.parameters = params;
        self
    }

    /// Builder method: set function type
    pub fn with_type(mut self, function_type: FunctionType) -> Self {
        self.function_type = function_type;
        self
    }

    /// Builder method: set description
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn signature(&self) -> RoutineSignature {
        RoutineSignature {
            parameters: self.parameters.clone(),
            return_type: self.return_type.clone(),
            function_type: self.function_type,
        }
    }
}

/// Parameter list and result of a function or procedure object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoutineSignature {
    pub parameters: Vec<FunctionParameter>,
    pub return_type: DataType,
    pub function_type: FunctionType,
}

impl RoutineSignature {
    /// Minimum number of arguments a call must supply
    pub fn required_arguments(&self) -> usize {
        self.parameters
            .iter()
            .filter(|p| !p.has_default && !p.is_variadic)
            .count()
    }

    /// Whether `count` arguments satisfy the parameter list
    pub fn accepts_argument_count(&self, count: usize) -> bool {
        let variadic = self.parameters.iter().any(|p| p.is_variadic);
        count >= self.required_arguments() && (variadic || count <= self.parameters.len())
    }

    /// Expected type of the argument at `index`, following a trailing variadic parameter
    pub fn parameter_for(&self, index: usize) -> Option<&FunctionParameter> {
        self.parameters.get(index).or_else(|| {
            self.parameters
                .last()
                .filter(|p| p.is_variadic)
        })
    }
}

impl fmt::Display for RoutineSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| p.data_type.to_string())
            .collect();
        write!(f, "({})", params.join(", "))
    }
}

/// Kind of a catalog object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectKind {
    Catalog,
    Schema,
    Table,
    View,
    Column,
    Procedure,
    Function,
    Sequence,
    DataType,
}

impl ObjectKind {
    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn is_container(self) -> bool {
        matches!(self, ObjectKind::Catalog | ObjectKind::Schema)
    }

    pub fn is_rows_source(self) -> bool {
        matches!(self, ObjectKind::Table | ObjectKind::View)
    }

    pub fn is_routine(self) -> bool {
        matches!(self, ObjectKind::Procedure | ObjectKind::Function)
    }
}

/// Set of object kinds a lookup is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ObjectKindSet(u16);

impl ObjectKindSet {
    pub const EMPTY: ObjectKindSet = ObjectKindSet(0);
    pub const CONTAINERS: ObjectKindSet = ObjectKindSet(0b11);
    pub const ROWS_SOURCES: ObjectKindSet = ObjectKindSet(0b1100);
    pub const ROUTINES: ObjectKindSet = ObjectKindSet(0b110_0000);
    pub const SEQUENCES: ObjectKindSet = ObjectKindSet(0b1000_0000);
    pub const COLUMNS: ObjectKindSet = ObjectKindSet(0b1_0000);
    pub const ALL: ObjectKindSet = ObjectKindSet(0b1_1111_1111);

    pub fn of(kinds: &[ObjectKind]) -> Self {
        Self(kinds.iter().fold(0, |acc, kind| acc | kind.bit()))
    }

    pub fn contains(self, kind: ObjectKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn union(self, other: ObjectKindSet) -> Self {
        Self(self.0 | other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Real object known to a metadata provider
///
/// Objects form a tree through `parent`: a column's parent is its table, a
/// table's parent its schema, and so on. `name` is the canonical name.
#[derive(Debug, Clone, PartialEq)]
pub struct DbObject {
    pub name: String,
    pub kind: ObjectKind,
    pub parent: Option<Arc<DbObject>>,
    /// Column type, or the type a data-type object describes
    pub data_type: Option<DataType>,
    pub comment: Option<String>,
    pub routine: Option<RoutineSignature>,
    pub table_type: Option<TableType>,
}

impl DbObject {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            kind,
            parent: None,
            data_type: None,
            comment: None,
            routine: None,
            table_type: None,
        }
    }

    /// Builder method: set parent object
    pub fn with_parent(mut self, parent: Arc<DbObject>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Builder method: set data type
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Builder method: set comment
    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment;
        self
    }

    /// Builder method: attach a routine signature
    pub fn with_routine(mut self, routine: RoutineSignature) -> Self {
        self.routine = Some(routine);
        self
    }

    /// Builder method: set table type
    pub fn with_table_type(mut self, table_type: TableType) -> Self {
        self.table_type = Some(table_type);
        self
    }

    /// Ancestors from the nearest parent outwards
    pub fn parents(&self) -> impl Iterator<Item = &DbObject> {
        std::iter::successors(self.parent.as_deref(), |p| p.parent.as_deref())
    }

    /// Name path from the outermost container down to this object
    pub fn path(&self) -> Vec<&str> {
        let mut path: Vec<&str> = self.parents().map(|p| p.name.as_str()).collect();
        path.reverse();
        path.push(&self.name);
        path
    }

    /// Dotted full name (`catalog.schema.table`)
    pub fn qualified_name(&self) -> String {
        self.path().join(".")
    }

    /// Qualified name that also distinguishes routine overloads
    pub fn unique_name(&self) -> String {
        match &self.routine {
            Some(routine) => format!("{}{}", self.qualified_name(), routine),
            None => self.qualified_name(),
        }
    }

    /// Name as it must be written in SQL to resolve back to this object
    pub fn quoted_identifier(&self, dialect: &dyn SqlDialect) -> String {
        dialect.quote_if_needed(&self.name)
    }

    /// Whether this object lives under `ancestor` (same kind and name path)
    pub fn is_descendant_of(&self, ancestor: &DbObject) -> bool {
        self.parents()
            .any(|p| p.kind == ancestor.kind && p.path() == ancestor.path())
    }

    /// Human readable kind label used in completion details
    pub fn kind_label(&self) -> &'static str {
        match (self.kind, &self.table_type) {
            (ObjectKind::Table, Some(TableType::View)) | (ObjectKind::View, _) => "view",
            (ObjectKind::Table, Some(TableType::MaterializedView)) => "materialized view",
            (ObjectKind::Table, _) => "table",
            (ObjectKind::Catalog, _) => "catalog",
            (ObjectKind::Schema, _) => "schema",
            (ObjectKind::Column, _) => "column",
            (ObjectKind::Procedure, _) => "procedure",
            (ObjectKind::Function, _) => "function",
            (ObjectKind::Sequence, _) => "sequence",
            (ObjectKind::DataType, _) => "type",
        }
    }
}

/// Foreign key owned by an entity
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub name: String,
    pub source_columns: Vec<String>,
    pub target: Arc<DbObject>,
    pub target_columns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    fn users_table() -> DbObject {
        let schema = Arc::new(DbObject::new("public", ObjectKind::Schema));
        DbObject::new("users", ObjectKind::Table).with_parent(schema)
    }

    #[test]
    fn test_object_paths() {
        let table = Arc::new(users_table());
        let column = DbObject::new("id", ObjectKind::Column).with_parent(table.clone());
        assert_eq!(column.qualified_name(), "public.users.id");
        assert_eq!(column.parents().count(), 2);
        assert!(column.is_descendant_of(&table));
    }

    #[test]
    fn test_unique_name_includes_signature() {
        let routine = FunctionMetadata::new("f", DataType::Integer)
            .with_parameters(vec![FunctionParameter::new("x", DataType::Integer)])
            .signature();
        let object = DbObject::new("f", ObjectKind::Function).with_routine(routine);
        assert_eq!(object.unique_name(), "f(INTEGER)");
    }

    #[test]
    fn test_object_kind_sets() {
        assert!(ObjectKindSet::ROWS_SOURCES.contains(ObjectKind::Table));
        assert!(ObjectKindSet::ROWS_SOURCES.contains(ObjectKind::View));
        assert!(!ObjectKindSet::ROWS_SOURCES.contains(ObjectKind::Column));
        assert!(ObjectKindSet::ROUTINES.contains(ObjectKind::Procedure));
        assert!(ObjectKindSet::ROUTINES.contains(ObjectKind::Function));
        assert!(ObjectKindSet::CONTAINERS.contains(ObjectKind::Schema));
        assert!(ObjectKindSet::SEQUENCES.contains(ObjectKind::Sequence));
        assert!(ObjectKindSet::COLUMNS.contains(ObjectKind::Column));
        assert!(ObjectKindSet::ALL.contains(ObjectKind::DataType));
        assert_eq!(
            ObjectKindSet::of(&[ObjectKind::Table, ObjectKind::View]),
            ObjectKindSet::ROWS_SOURCES
        );
    }

    #[test]
    fn test_data_type_from_name() {
        assert_eq!(DataType::from_name("VARCHAR(255)"), DataType::Varchar(Some(255)));
        assert_eq!(DataType::from_name("int"), DataType::Integer);
        assert_eq!(
            DataType::from_name("text[]"),
            DataType::Array(Box::new(DataType::Text))
        );
        assert_eq!(DataType::from_name("geometry"), DataType::Other("geometry".into()));
    }

    #[test]
    fn test_data_kind_compatibility() {
        assert!(DataKind::Numeric.accepts(DataKind::Numeric));
        assert!(!DataKind::Numeric.accepts(DataKind::String));
        assert!(DataKind::DateTime.accepts(DataKind::String));
        assert!(DataKind::Boolean.accepts(DataKind::Unknown));
    }

    #[test]
    fn test_argument_count_rules() {
        let signature = RoutineSignature {
            parameters: vec![
                FunctionParameter::new("a", DataType::Integer),
                FunctionParameter::new("b", DataType::Integer).with_default(),
            ],
            return_type: DataType::Integer,
            function_type: FunctionType::Scalar,
        };
        assert!(!signature.accepts_argument_count(0));
        assert!(signature.accepts_argument_count(1));
        assert!(signature.accepts_argument_count(2));
        assert!(!signature.accepts_argument_count(3));
    }

    #[test]
    fn test_quoted_identifier_uses_dialect() {
        let object = DbObject::new("Users", ObjectKind::Table);
        assert_eq!(object.quoted_identifier(&Dialect::PostgreSQL), "\"Users\"");
        assert_eq!(object.quoted_identifier(&Dialect::MySQL), "Users");
    }
}
