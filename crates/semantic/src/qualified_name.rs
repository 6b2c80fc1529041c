// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details
//
//! # Qualified names
//!
//! A dotted identifier sequence such as `catalog.schema.table` where some parts
//! may be missing (`a..b`) and the sequence may end on a dangling period (`u.`).

use sql_insight_ir::TextRange;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::symbol::{SymbolEntryId, SymbolTable};

/// Dotted identifier sequence
///
/// `parts` and `raw_parts` always have the same length. An invalid part is
/// `None` in `parts` and an empty string in `raw_parts`. Equality and hashing
/// only consider `raw_parts`.
#[derive(Debug, Clone)]
pub struct QualifiedName {
    parts: Vec<Option<SymbolEntryId>>,
    raw_parts: Vec<String>,
    invalid_parts: usize,
    member_access: Option<TextRange>,
}

impl QualifiedName {
    pub fn new(
        parts: Vec<Option<SymbolEntryId>>,
        raw_parts: Vec<String>,
        member_access: Option<TextRange>,
    ) -> Self {
        debug_assert_eq!(parts.len(), raw_parts.len());
        let invalid_parts = parts.iter().filter(|p| p.is_none()).count();
        Self {
            parts,
            raw_parts,
            invalid_parts,
            member_access,
        }
    }

    /// Single valid part
    pub fn single(entry: SymbolEntryId, raw: impl Into<String>) -> Self {
        Self::new(vec![Some(entry)], vec![raw.into()], None)
    }

    pub fn parts(&self) -> &[Option<SymbolEntryId>] {
        &self.parts
    }

    pub fn raw_parts(&self) -> &[String] {
        &self.raw_parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn invalid_parts(&self) -> usize {
        self.invalid_parts
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_parts == 0 && !self.parts.is_empty()
    }

    /// Trailing dangling period, if any
    pub fn member_access(&self) -> Option<TextRange> {
        self.member_access
    }

    /// Number of valid parts before the first invalid one
    pub fn valid_leading_parts(&self) -> usize {
        self.parts.iter().take_while(|p| p.is_some()).count()
    }

    pub fn first(&self) -> Option<SymbolEntryId> {
        self.parts.first().copied().flatten()
    }

    pub fn last(&self) -> Option<SymbolEntryId> {
        self.parts.last().copied().flatten()
    }

    /// Valid entries in order
    pub fn entries(&self) -> impl Iterator<Item = SymbolEntryId> + '_ {
        self.parts.iter().flatten().copied()
    }

    /// Canonical names of the leading `count` parts
    pub fn canonical_prefix(&self, symbols: &SymbolTable, count: usize) -> Vec<String> {
        self.parts
            .iter()
            .take(count)
            .map(|p| p.map(|id| symbols.entry(id).name.clone()).unwrap_or_default())
            .collect()
    }

    /// Source range covered by the valid parts and trailing period
    pub fn range(&self, symbols: &SymbolTable) -> Option<TextRange> {
        let mut ranges = self
            .entries()
            .map(|id| symbols.entry(id).range)
            .chain(self.member_access);
        let first = ranges.next()?;
        Some(ranges.fold(first, TextRange::cover))
    }

    /// Name without its first part
    pub fn trim_start(&self) -> QualifiedName {
        let skip = usize::from(!self.parts.is_empty());
        QualifiedName::new(
            self.parts[skip..].to_vec(),
            self.raw_parts[skip..].to_vec(),
            self.member_access,
        )
    }

    /// Name without its last part
    ///
    /// The result has no trailing member access, so `s.t.c` and `s.t.c.`
    /// both trim to the container name `s.t`.
    pub fn trim_end(&self) -> QualifiedName {
        let keep = self.parts.len().saturating_sub(1);
        QualifiedName::new(
            self.parts[..keep].to_vec(),
            self.raw_parts[..keep].to_vec(),
            None,
        )
    }

    /// New name with `entry` in front
    pub fn prepend(&self, entry: Option<SymbolEntryId>, raw: impl Into<String>) -> QualifiedName {
        let mut parts = Vec::with_capacity(self.parts.len() + 1);
        parts.push(entry);
        parts.extend_from_slice(&self.parts);
        let mut raw_parts = Vec::with_capacity(self.raw_parts.len() + 1);
        raw_parts.push(raw.into());
        raw_parts.extend_from_slice(&self.raw_parts);
        QualifiedName::new(parts, raw_parts, self.member_access)
    }

    /// New name with `entry` at the end
    pub fn append(&self, entry: Option<SymbolEntryId>, raw: impl Into<String>) -> QualifiedName {
        let mut parts = self.parts.clone();
        parts.push(entry);
        let mut raw_parts = self.raw_parts.clone();
        raw_parts.push(raw.into());
        QualifiedName::new(parts, raw_parts, None)
    }
}

impl PartialEq for QualifiedName {
    fn eq(&self, other: &Self) -> bool {
        self.raw_parts == other.raw_parts
    }
}

impl Eq for QualifiedName {}

impl Hash for QualifiedName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw_parts.hash(state);
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw_parts.join("."))?;
        if self.member_access.is_some() {
            f.write_str(".")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn name(raw: &[&str]) -> QualifiedName {
        QualifiedName::new(
            raw.iter()
                .enumerate()
                .map(|(i, r)| (!r.is_empty()).then_some(SymbolEntryId(i as u32)))
                .collect(),
            raw.iter().map(|r| r.to_string()).collect(),
            None,
        )
    }

    #[test]
    fn test_trim_end_drops_last_part() {
        let full = name(&["s", "t", "c"]);
        let trimmed = full.trim_end();
        assert_eq!(trimmed.parts(), &full.parts()[..2]);
        assert_eq!(trimmed.raw_parts(), &["s".to_string(), "t".to_string()]);
    }

    #[test]
    fn test_trim_end_drops_member_access() {
        let pending = QualifiedName::new(
            vec![Some(SymbolEntryId(0)), Some(SymbolEntryId(1))],
            vec!["s".to_string(), "t".to_string()],
            Some(TextRange::new(3, 4)),
        );
        assert_eq!(pending.to_string(), "s.t.");
        let trimmed = pending.trim_end();
        assert!(trimmed.member_access().is_none());
        assert_eq!(trimmed.to_string(), "s");
        assert_eq!(name(&["s", "t", "c"]).trim_end().to_string(), "s.t");
    }

    #[test]
    fn test_trim_and_restore_round_trip() {
        let full = name(&["s", "t", "c"]);
        let first = full.parts()[0];
        let restored = full.trim_start().prepend(first, "s");
        assert_eq!(restored, full);
        assert_eq!(restored.parts(), full.parts());

        let last = full.parts()[2];
        let restored = full.trim_end().append(last, "c");
        assert_eq!(restored, full);
    }

    #[test]
    fn test_invalid_parts_are_counted() {
        let broken = name(&["a", "", "b"]);
        assert_eq!(broken.invalid_parts(), 1);
        assert_eq!(broken.valid_leading_parts(), 1);
        assert!(!broken.is_valid());
    }

    #[test]
    fn test_equality_ignores_entry_identity() {
        let a = QualifiedName::single(SymbolEntryId(1), "users");
        let b = QualifiedName::single(SymbolEntryId(7), "users");
        assert_eq!(a, b);
        let set: HashSet<QualifiedName> = [a, b].into_iter().collect();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_display() {
        let dangling = QualifiedName::new(
            vec![Some(SymbolEntryId(0))],
            vec!["u".to_string()],
            Some(TextRange::new(1, 2)),
        );
        assert_eq!(dangling.to_string(), "u.");
    }
}
