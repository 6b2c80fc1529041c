// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # Candidate scoring
//!
//! A score of zero excludes the candidate. Prefix matches always outrank
//! substring matches, which outrank scattered subsequence matches. Under prefix
//! scoring a longer matching filter never lowers a candidate's score.

/// Score of a candidate against an empty filter
pub const BASE_SCORE: i32 = 1;

const PREFIX_BASE: i32 = 100;
const SUBSTRING_BASE: i32 = 50;
const SUBSEQUENCE_BASE: i32 = 10;

/// Case-insensitive prefix score
pub fn prefix_score(candidate: &str, filter: &str) -> i32 {
    if filter.is_empty() {
        return BASE_SCORE;
    }
    let candidate = candidate.to_lowercase();
    let filter = filter.to_lowercase();
    if !candidate.starts_with(&filter) {
        return 0;
    }
    let matched = filter.chars().count() as i32;
    let exact = if candidate == filter { 5 } else { 0 };
    PREFIX_BASE + 10 * matched + exact
}

/// Prefix, then substring, then subsequence matching
pub fn fuzzy_score(candidate: &str, filter: &str) -> i32 {
    let prefix = prefix_score(candidate, filter);
    if prefix > 0 {
        return prefix;
    }
    let lower = candidate.to_lowercase();
    let filter = filter.to_lowercase();
    let matched = filter.chars().count() as i32;
    if lower.contains(&filter) {
        return SUBSTRING_BASE + 5 * matched;
    }

    let mut wanted = filter.chars().peekable();
    let mut gaps = 0;
    for c in lower.chars() {
        match wanted.peek() {
            Some(w) if *w == c => {
                wanted.next();
            }
            Some(_) => gaps += 1,
            None => break,
        }
    }
    if wanted.peek().is_some() {
        return 0;
    }
    (SUBSEQUENCE_BASE + matched - gaps).max(1)
}

/// Score `candidate` with the matching mode chosen by the settings
pub fn score(candidate: &str, filter: &str, search_inside_names: bool) -> i32 {
    if search_inside_names {
        fuzzy_score(candidate, filter)
    } else {
        prefix_score(candidate, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_scoring() {
        assert_eq!(prefix_score("users", ""), BASE_SCORE);
        assert!(prefix_score("users", "us") > 0);
        assert!(prefix_score("Users", "uS") > 0);
        assert_eq!(prefix_score("orders", "us"), 0);
        assert!(prefix_score("users", "users") > prefix_score("users_archive", "users"));
    }

    #[test]
    fn test_prefix_scoring_is_monotonic() {
        for candidate in ["user_id", "total", "big_orders", "Status"] {
            let mut previous = prefix_score(candidate, "");
            for end in 1..=candidate.len() {
                let current = prefix_score(candidate, &candidate[..end]);
                assert!(current >= previous, "{} at {}", candidate, end);
                previous = current;
            }
        }
    }

    #[test]
    fn test_fuzzy_scoring_tiers() {
        let prefix = fuzzy_score("orders", "ord");
        let substring = fuzzy_score("big_orders", "ord");
        let subsequence = fuzzy_score("order_date", "odt");
        assert!(prefix > substring);
        assert!(substring > subsequence);
        assert!(subsequence > 0);
        assert_eq!(fuzzy_score("users", "xyz"), 0);
    }

    #[test]
    fn test_score_switches_on_settings() {
        assert_eq!(score("big_orders", "ord", false), 0);
        assert!(score("big_orders", "ord", true) > 0);
    }
}
