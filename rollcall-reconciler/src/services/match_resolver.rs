//! Participation identifier → roster percentage lookup
//!
//! Resolution tiers, tried in order:
//! 1. Exact normalized key
//! 2. Suffix: a roster key ending with the identifier (roster ids often carry
//!    an extra leading prefix such as a batch code)
//! 3. Substring: a roster key containing the identifier, only for identifiers
//!    of at least three characters
//!
//! When several keys qualify in tier 2 or 3, the key that first appeared in
//! the roster wins.

use serde::{Deserialize, Serialize};

use super::attendance_index::AttendanceIndex;
use super::identity_normalizer::normalize;

/// Shortest normalized identifier allowed to use the substring tier
pub const MIN_SUBSTRING_MATCH_LEN: usize = 3;

/// Which tier produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchTier {
    Exact,
    Suffix,
    Substring,
}

/// A resolved percentage and the tier that found it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOutcome {
    pub percentage: f64,
    pub tier: MatchTier,
}

/// Multi-tier lookup into an attendance index
#[derive(Debug, Clone, Copy)]
pub struct MatchResolver<'a> {
    index: &'a AttendanceIndex,
}

impl<'a> MatchResolver<'a> {
    pub fn new(index: &'a AttendanceIndex) -> Self {
        Self { index }
    }

    /// Percentage for a raw identifier, or None
    pub fn resolve(&self, raw_id: &str) -> Option<f64> {
        self.resolve_with_tier(raw_id).map(|m| m.percentage)
    }

    /// Percentage plus match tier for a raw identifier
    pub fn resolve_with_tier(&self, raw_id: &str) -> Option<MatchOutcome> {
        let needle = normalize(raw_id);
        if needle.is_empty() {
            return None;
        }

        if let Some(percentage) = self.index.get(&needle) {
            return Some(MatchOutcome {
                percentage,
                tier: MatchTier::Exact,
            });
        }

        if let Some((_, percentage)) = self
            .index
            .iter_in_row_order()
            .find(|(key, _)| key.ends_with(needle.as_str()))
        {
            return Some(MatchOutcome {
                percentage,
                tier: MatchTier::Suffix,
            });
        }

        if needle.len() >= MIN_SUBSTRING_MATCH_LEN {
            if let Some((_, percentage)) = self
                .index
                .iter_in_row_order()
                .find(|(key, _)| key.contains(needle.as_str()))
            {
                return Some(MatchOutcome {
                    percentage,
                    tier: MatchTier::Substring,
                });
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(entries: &[(&str, f64)]) -> AttendanceIndex {
        let mut index = AttendanceIndex::new();
        for (key, pct) in entries {
            index.insert(key.to_string(), *pct);
        }
        index
    }

    #[test]
    fn test_exact_match_after_normalization() {
        let idx = index(&[("231fa04c33", 82.0)]);
        let resolver = MatchResolver::new(&idx);
        assert_eq!(resolver.resolve("231FA04C33"), Some(82.0));
        assert_eq!(resolver.resolve(" 231-fa-04-c33 "), Some(82.0));
        assert_eq!(
            resolver.resolve_with_tier("231fa04c33").unwrap().tier,
            MatchTier::Exact
        );
    }

    #[test]
    fn test_exact_beats_suffix() {
        let idx = index(&[("x231fa04c33", 10.0), ("231fa04c33", 90.0)]);
        let resolver = MatchResolver::new(&idx);
        assert_eq!(resolver.resolve("231fa04c33"), Some(90.0));
    }

    #[test]
    fn test_suffix_fallback_for_prefixed_roster_ids() {
        let idx = index(&[("y22231fa04c33", 77.0)]);
        let outcome = MatchResolver::new(&idx).resolve_with_tier("231FA04C33").unwrap();
        assert_eq!(outcome.percentage, 77.0);
        assert_eq!(outcome.tier, MatchTier::Suffix);
    }

    #[test]
    fn test_suffix_beats_substring() {
        // "abc" is contained in the first key, but only the second ends with it
        let idx = index(&[("xabcx", 10.0), ("zzabc", 20.0)]);
        let outcome = MatchResolver::new(&idx).resolve_with_tier("abc").unwrap();
        assert_eq!(outcome.percentage, 20.0);
        assert_eq!(outcome.tier, MatchTier::Suffix);
    }

    #[test]
    fn test_substring_fallback_requires_three_chars() {
        let idx = index(&[("xx42yy", 55.0)]);
        let resolver = MatchResolver::new(&idx);
        assert_eq!(resolver.resolve("x42y"), Some(55.0));
        assert_eq!(
            resolver.resolve_with_tier("42y").unwrap().tier,
            MatchTier::Substring
        );
        // Two characters: substring tier not attempted
        assert_eq!(resolver.resolve("2y"), None);
    }

    #[test]
    fn test_fallback_tie_break_is_first_roster_occurrence() {
        let idx = index(&[("aa123", 40.0), ("bb123", 60.0)]);
        assert_eq!(MatchResolver::new(&idx).resolve("123"), Some(40.0));

        let idx = index(&[("bb123", 60.0), ("aa123", 40.0)]);
        assert_eq!(MatchResolver::new(&idx).resolve("123"), Some(60.0));
    }

    #[test]
    fn test_empty_or_unmatched_identifier_is_none() {
        let idx = index(&[("231fa04c33", 82.0)]);
        let resolver = MatchResolver::new(&idx);
        assert_eq!(resolver.resolve(""), None);
        assert_eq!(resolver.resolve("--"), None);
        assert_eq!(resolver.resolve("999zz"), None);
    }
}
