// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # SQL Insight - Completion Context Engine
//!
//! This crate turns a cursor position inside a recognized
//! [`SemanticModel`](sql_insight_semantic::SemanticModel) into ranked
//! completion proposals.
//!
//! ## Overview
//!
//! Completion runs in two steps:
//!
//! 1. [`CompletionEngine::prepare`] locates the cursor: the lexical item
//!    under it, the name fragment being typed and the query scope.
//! 2. [`CompletionContext::prepare_proposal`] collects candidates from the
//!    semantic model and the metadata provider, scores them against the typed
//!    fragment and groups them into [`CompletionSet`]s.
//!
//! A lightweight [`SyntaxInspection`] of the text before the cursor supplies
//! the expected kind of name and the keywords that fit.
//!
//! ## Examples
//!
//! ```rust,ignore
//! use sql_insight_context::{CompletionEngine, CompletionSettings};
//! use sql_insight_ir::NeverCancel;
//!
//! let engine = CompletionEngine::new(provider, CompletionSettings::default());
//! let sets = engine.complete(&recognizer, &parser, "SELECT u.| FROM users u", 9, &NeverCancel)?;
//! for item in &sets[0].items {
//!     println!("{} ({:?})", item.label, item.kind);
//! }
//! ```

pub mod engine;
pub mod error;
pub mod inspection;
pub mod items;
pub mod keywords;
pub mod render;
pub mod scoring;
pub mod settings;

pub use engine::{CompletionContext, CompletionEngine};
pub use error::{CompletionError, CompletionResult};
pub use inspection::{Expectation, SyntaxInspection};
pub use items::{CompletionItem, CompletionItemKind, CompletionSet};
pub use keywords::{KeywordProvider, KeywordSet, SqlKeyword};
pub use settings::{AliasPolicy, CompletionSettings, KeywordCase};
