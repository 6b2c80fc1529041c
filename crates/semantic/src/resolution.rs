// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Partial name resolution
//!
//! Longest-prefix lookup of a dotted name against real metadata objects. The
//! same routine resolves tables, routines and sequences; callers only choose
//! the allowed object kinds and the class applied when nothing matches.
//!
//! ```text
//! cat.public.users.x
//! ^^^^^^^^^^^^^^^^       users found at length 3
//!                  ^     ObjectScope(users) origin, fallback class
//! ^^^ ^^^^^^             backfilled from the parent chain
//! ```

use std::cmp::{max, min};
use std::sync::Arc;

use sql_insight_ir::{DbObject, ObjectKindSet};
use tracing::{debug, instrument};

use crate::context::AnalysisContext;
use crate::diagnostics::{Diagnostic, DiagnosticCode};
use crate::error::SemanticResult;
use crate::origin::SymbolOrigin;
use crate::qualified_name::QualifiedName;
use crate::symbol::{SymbolClass, SymbolDefinition, SymbolEntryId};

/// Outcome of [`AnalysisContext::perform_partial_resolution`]
#[derive(Debug, Clone, Default)]
pub(crate) struct PartialResolution {
    /// Object matched by the longest resolvable prefix
    pub object: Option<Arc<DbObject>>,
    /// Length of that prefix
    pub matched_parts: usize,
}

impl PartialResolution {
    /// Whether every part of the name was resolved
    pub fn is_complete(&self, name: &QualifiedName) -> bool {
        self.object.is_some() && self.matched_parts == name.len()
    }
}

impl AnalysisContext<'_> {
    /// Resolve the longest prefix of `name` that denotes a real object
    ///
    /// Lengths are tried from the number of valid leading parts down to one.
    /// More than one match at a length marks that part ERROR, reports the
    /// candidates and stops. When nothing matches, the first part receives
    /// `origin_on_failure`, the last part `fallback` and one not-found
    /// diagnostic is reported.
    #[instrument(skip(self, name, origin_on_failure), fields(name = %name))]
    pub(crate) fn perform_partial_resolution(
        &mut self,
        name: &QualifiedName,
        origin_on_failure: Option<SymbolOrigin>,
        allowed: ObjectKindSet,
        fallback: SymbolClass,
    ) -> SemanticResult<PartialResolution> {
        let valid = name.valid_leading_parts();
        let Some(range) = name.range(&self.symbols) else {
            return Ok(PartialResolution::default());
        };

        for len in (1..=valid).rev() {
            let prefix = name.canonical_prefix(&self.symbols, len);
            let Some(found) = self.find_objects(range, allowed, &prefix)? else {
                self.degrade_to_unknown(name);
                return Ok(PartialResolution::default());
            };
            match found.as_slice() {
                [] => continue,
                [object] => {
                    let object = object.clone();
                    debug!("Resolved '{}' to {}", prefix.join("."), object.unique_name());
                    self.define_prefix(name, len, &object);
                    if len < name.len() {
                        self.set_part_origin(
                            name,
                            len,
                            SymbolOrigin::ObjectScope {
                                object: object.clone(),
                                allowed,
                            },
                        );
                        self.fail_remaining(name, len, fallback);
                    }
                    return Ok(PartialResolution {
                        object: Some(object),
                        matched_parts: len,
                    });
                }
                candidates => {
                    let mut names: Vec<String> =
                        candidates.iter().map(|c| c.unique_name()).collect();
                    names.sort();
                    if let Some(entry) = name.parts()[len - 1] {
                        self.symbols.override_class(entry, SymbolClass::Error);
                        let entry_range = self.symbols.entry(entry).range;
                        self.report(Diagnostic::error(
                            entry_range,
                            DiagnosticCode::Ambiguous,
                            format!(
                                "Ambiguous name '{}', candidates: {}",
                                prefix.join("."),
                                names.join(", ")
                            ),
                        ));
                    }
                    debug!("Ambiguous '{}' at length {}", prefix.join("."), len);
                    return Ok(PartialResolution {
                        object: None,
                        matched_parts: len,
                    });
                }
            }
        }

        // No object: look for a container so completion can list its children
        let longest = if name.member_access().is_some() {
            valid
        } else {
            valid.saturating_sub(1)
        };
        for len in (1..=longest).rev() {
            let prefix = name.canonical_prefix(&self.symbols, len);
            let Some(found) = self.find_objects(range, ObjectKindSet::CONTAINERS, &prefix)? else {
                self.degrade_to_unknown(name);
                return Ok(PartialResolution::default());
            };
            if let [container] = found.as_slice() {
                let container = container.clone();
                self.define_prefix(name, len, &container);
                self.set_part_origin(
                    name,
                    len,
                    SymbolOrigin::ObjectScope {
                        object: container,
                        allowed,
                    },
                );
                if len < name.len() {
                    self.fail_remaining(name, len, fallback);
                }
                return Ok(PartialResolution {
                    object: None,
                    matched_parts: len,
                });
            }
        }

        if let (Some(origin), Some(first)) = (origin_on_failure, name.first()) {
            self.set_origin(first, origin);
        }
        if let Some(last) = name.parts().iter().rev().flatten().next().copied() {
            self.classify(last, fallback);
            let last_range = self.symbols.entry(last).range;
            self.report_not_found(last_range, format!("'{}' not found", name));
        }
        Ok(PartialResolution::default())
    }

    /// Define the first `len` parts from `object` and its parent chain
    ///
    /// Parts left of the matched one are compared with the parents' names,
    /// skipping parent levels the name does not spell out.
    pub(crate) fn define_prefix(
        &mut self,
        name: &QualifiedName,
        len: usize,
        object: &Arc<DbObject>,
    ) {
        let entries: Vec<SymbolEntryId> = name.parts()[..len].iter().flatten().copied().collect();
        let Some((&last, rest)) = entries.split_last() else {
            return;
        };
        self.define_object(last, object.clone());

        let mut parent = object.parent.clone();
        for &entry in rest.iter().rev() {
            let wanted = self.symbols.entry(entry).name.clone();
            let mut cursor = parent.clone();
            let matched = loop {
                match cursor {
                    Some(candidate) if candidate.name == wanted => break Some(candidate),
                    Some(candidate) => cursor = candidate.parent.clone(),
                    None => break None,
                }
            };
            let Some(matched) = matched else {
                break;
            };
            parent = matched.parent.clone();
            self.define_object(entry, matched);
        }
    }

    pub(crate) fn define_object(&mut self, entry: SymbolEntryId, object: Arc<DbObject>) {
        self.classify(entry, SymbolClass::for_object_kind(object.kind));
        self.symbols
            .set_definition(entry, SymbolDefinition::Object(object));
    }

    /// Assign `origin` to part `index`, or to the trailing period when the
    /// name has no such part
    pub(crate) fn set_part_origin(
        &mut self,
        name: &QualifiedName,
        index: usize,
        origin: SymbolOrigin,
    ) {
        match name.parts().get(index) {
            Some(Some(entry)) => self.set_origin(*entry, origin),
            Some(None) => {}
            None => {
                let item = name
                    .member_access()
                    .and_then(|period| self.lexical.item_starting_at(period.start));
                if let Some(item) = item {
                    self.lexical.set_origin(item, origin);
                }
            }
        }
    }

    /// Parts after `resolved` get `fallback` and the last one a diagnostic
    fn fail_remaining(&mut self, name: &QualifiedName, resolved: usize, fallback: SymbolClass) {
        let remaining: Vec<SymbolEntryId> =
            name.parts()[resolved..].iter().flatten().copied().collect();
        for entry in &remaining {
            self.classify(*entry, fallback);
        }
        if let Some(last) = remaining.last() {
            let entry = self.symbols.entry(*last);
            let (range, raw) = (entry.range, entry.raw_name.clone());
            self.report_not_found(range, format!("'{}' not found in '{}'", raw, name.trim_end()));
        }
    }

    /// Metadata is unavailable: leave the name UNKNOWN
    fn degrade_to_unknown(&mut self, name: &QualifiedName) {
        for entry in name.entries() {
            self.classify(entry, SymbolClass::Unknown);
        }
    }
}

/// Calculate Levenshtein distance between two strings
/// Uses Wagner-Fischer algorithm with O(min(m,n)) space optimization
pub(crate) fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m < n {
        return levenshtein_distance(b, a);
    }

    let mut previous: Vec<usize> = (0..=n).collect();

    for (i, &ca) in a_chars.iter().enumerate() {
        let mut current = vec![i + 1];

        for (j, &cb) in b_chars.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            current.push(min(
                min(previous[j + 1] + 1, current[j] + 1),
                previous[j] + cost,
            ));
        }

        previous = current;
    }

    previous[n]
}

/// Calculate similarity score (0.0 to 1.0) based on edit distance
pub(crate) fn similarity_score(a: &str, b: &str) -> f64 {
    let max_len = max(a.chars().count(), b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let distance = levenshtein_distance(a, b);
    1.0 - (distance as f64 / max_len as f64)
}

/// Names close enough to `name` to be offered as "did you mean" hints
pub(crate) fn similar_names<'n>(
    name: &str,
    candidates: impl IntoIterator<Item = &'n str>,
) -> Vec<String> {
    const MAX_DISTANCE: usize = 2;
    const MIN_SIMILARITY: f64 = 0.5;
    const MAX_SUGGESTIONS: usize = 3;

    let lowered = name.to_lowercase();
    let mut scored: Vec<(f64, &str)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let other = candidate.to_lowercase();
            let score = similarity_score(&lowered, &other);
            (levenshtein_distance(&lowered, &other) <= MAX_DISTANCE && score >= MIN_SIMILARITY)
                .then_some((score, candidate))
        })
        .collect();
    scored.sort_by(|a, b| b.0.total_cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levenshtein_distance() {
        assert_eq!(levenshtein_distance("kitten", "sitting"), 3);
        assert_eq!(levenshtein_distance("", "abc"), 3);
        assert_eq!(levenshtein_distance("same", "same"), 0);
    }

    #[test]
    fn test_similarity_score() {
        assert_eq!(similarity_score("", ""), 1.0);
        assert!(similarity_score("user_id", "user_ids") > 0.8);
        assert!(similarity_score("abc", "xyz") < 0.1);
    }

    #[test]
    fn test_similar_names() {
        let candidates = ["email", "name", "created_at"];
        assert_eq!(similar_names("emial", candidates), vec!["email".to_string()]);
        assert_eq!(similar_names("nme", candidates), vec!["name".to_string()]);
        assert!(similar_names("zzzzzz", candidates).is_empty());
    }
}
