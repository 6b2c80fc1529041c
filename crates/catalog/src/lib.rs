// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Insight - Catalog Layer
//!
//! This crate provides the database metadata abstraction consumed by name
//! resolution and completion. It defines the [`MetadataProvider`] trait and
//! an in-memory implementation:
//!
//! - **Static Catalogs**: Schema definitions built in code or loaded from YAML/JSON snapshots
//!
//! ## Implementing the MetadataProvider Trait
//!
//! ```rust,ignore
//! use sql_insight_catalog::{CatalogResult, MetadataProvider};
//!
//! struct MyCatalog;
//!
//! impl MetadataProvider for MyCatalog {
//!     fn find_real_objects(&self, monitor, allowed, parts) -> CatalogResult<Vec<Arc<DbObject>>> {
//!         // Your implementation here
//!     }
//!     // ...
//! }
//! ```

pub mod error;
pub mod provider;
pub mod snapshot;
pub mod r#static;

// Re-exports
pub use error::{CatalogError, CatalogResult};
pub use provider::MetadataProvider;
pub use snapshot::CatalogSnapshot;
pub use r#static::{StaticCatalog, StaticCatalogBuilder};
