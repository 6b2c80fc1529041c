// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Analyzer settings
//!
//! Settings arrive from the host as a JSON payload, either bare or nested under
//! an `analyzer` key:
//!
//! ```json
//! { "analyzer": { "dialect": "postgresql", "errorTolerantFunctions": true } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sql_insight_ir::Dialect;

use crate::error::{SemanticError, SemanticResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzerSettings {
    /// SQL dialect whose identifier rules apply
    pub dialect: Dialect,

    /// Classify unknown functions as FUNCTION instead of ERROR
    pub error_tolerant_functions: bool,

    /// Emit "not found" diagnostics for unresolved names
    pub report_unresolved: bool,

    /// Maximum nesting of subqueries inside one statement
    pub max_expression_depth: usize,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::Generic,
            error_tolerant_functions: false,
            report_unresolved: true,
            max_expression_depth: 64,
        }
    }
}

impl AnalyzerSettings {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    /// Builder method: tolerate unknown functions
    pub fn with_error_tolerant_functions(mut self, tolerant: bool) -> Self {
        self.error_tolerant_functions = tolerant;
        self
    }

    /// Builder method: toggle not-found diagnostics
    pub fn with_report_unresolved(mut self, report: bool) -> Self {
        self.report_unresolved = report;
        self
    }

    /// Builder method: set the nesting limit
    pub fn with_max_expression_depth(mut self, depth: usize) -> Self {
        self.max_expression_depth = depth;
        self
    }

    /// Parse settings from a client payload
    pub fn from_json(value: &Value) -> SemanticResult<Self> {
        let section = value.get("analyzer").unwrap_or(value);
        serde_json::from_value(section.clone())
            .map_err(|e| SemanticError::InvalidSettings(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = AnalyzerSettings::default();
        assert_eq!(settings.dialect, Dialect::Generic);
        assert!(settings.report_unresolved);
        assert!(!settings.error_tolerant_functions);
    }

    #[test]
    fn test_from_json_nested_and_partial() {
        let settings = AnalyzerSettings::from_json(&json!({
            "analyzer": { "dialect": "postgresql", "errorTolerantFunctions": true }
        }))
        .unwrap();
        assert_eq!(settings.dialect, Dialect::PostgreSQL);
        assert!(settings.error_tolerant_functions);
        assert_eq!(settings.max_expression_depth, 64);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        let result = AnalyzerSettings::from_json(&json!({ "dialect": "cobol" }));
        assert!(matches!(result, Err(SemanticError::InvalidSettings(_))));
    }
}
