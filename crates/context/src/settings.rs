// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Completion settings
//!
//! Loaded from the host's JSON payload, bare or nested under `completion`:
//!
//! ```json
//! { "completion": { "searchInsideNames": true, "insertTableAlias": "firstLetter" } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CompletionError, CompletionResult};

/// Alias appended when a table is inserted in FROM position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AliasPolicy {
    #[default]
    None,
    /// `users` becomes `users u`, `u1`, `u2` when taken
    FirstLetter,
}

/// Spelling of proposed keywords
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KeywordCase {
    #[default]
    Upper,
    Lower,
    AsIs,
}

impl KeywordCase {
    pub fn apply(self, keyword: &str) -> String {
        match self {
            KeywordCase::Upper => keyword.to_uppercase(),
            KeywordCase::Lower => keyword.to_lowercase(),
            KeywordCase::AsIs => keyword.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompletionSettings {
    /// Match the filter anywhere in a name, not only as a prefix
    pub search_inside_names: bool,

    /// Order by score first; otherwise by item kind and name only
    pub sort_by_score: bool,

    pub insert_table_alias: AliasPolicy,

    /// Offer `a.fk = b.pk` predicates after ON
    pub propose_join_conditions: bool,

    /// Upper bound on items per completion set
    pub max_items: usize,

    pub keyword_case: KeywordCase,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            search_inside_names: false,
            sort_by_score: true,
            insert_table_alias: AliasPolicy::None,
            propose_join_conditions: true,
            max_items: 200,
            keyword_case: KeywordCase::Upper,
        }
    }
}

impl CompletionSettings {
    /// Builder method: enable substring and fuzzy matching
    pub fn with_search_inside_names(mut self, enabled: bool) -> Self {
        self.search_inside_names = enabled;
        self
    }

    /// Builder method: set the table alias policy
    pub fn with_table_alias(mut self, policy: AliasPolicy) -> Self {
        self.insert_table_alias = policy;
        self
    }

    pub fn with_keyword_case(mut self, case: KeywordCase) -> Self {
        self.keyword_case = case;
        self
    }

    /// Parse settings from a client payload
    pub fn from_json(value: &Value) -> CompletionResult<Self> {
        let section = value.get("completion").unwrap_or(value);
        let settings: CompletionSettings = serde_json::from_value(section.clone())
            .map_err(|e| CompletionError::InvalidSettings(e.to_string()))?;
        if settings.max_items == 0 {
            return Err(CompletionError::InvalidSettings(
                "maxItems must be positive".to_string(),
            ));
        }
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let settings = CompletionSettings::default();
        assert!(settings.sort_by_score);
        assert!(!settings.search_inside_names);
        assert!(settings.propose_join_conditions);
        assert_eq!(settings.insert_table_alias, AliasPolicy::None);
    }

    #[test]
    fn test_from_json_nested() {
        let settings = CompletionSettings::from_json(&json!({
            "completion": {
                "searchInsideNames": true,
                "insertTableAlias": "firstLetter",
                "keywordCase": "lower"
            }
        }))
        .unwrap();
        assert!(settings.search_inside_names);
        assert_eq!(settings.insert_table_alias, AliasPolicy::FirstLetter);
        assert_eq!(settings.keyword_case, KeywordCase::Lower);
        assert_eq!(settings.max_items, 200);
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        let result = CompletionSettings::from_json(&json!({ "maxItems": 0 }));
        assert!(matches!(result, Err(CompletionError::InvalidSettings(_))));

        let result = CompletionSettings::from_json(&json!({ "keywordCase": "title" }));
        assert!(matches!(result, Err(CompletionError::InvalidSettings(_))));
    }

    #[test]
    fn test_keyword_case() {
        assert_eq!(KeywordCase::Upper.apply("order by"), "ORDER BY");
        assert_eq!(KeywordCase::Lower.apply("ORDER BY"), "order by");
        assert_eq!(KeywordCase::AsIs.apply("Order"), "Order");
    }
}
