//! Trigram similarity, shared by the matching engine's scoring formula and
//! the persistence mock's simulated `pg_trgm`-style search so both sides of
//! the port agree on one definition.

use std::collections::HashSet;

/// Character trigrams of a normalized string, padded with one leading and
/// trailing space the way PostgreSQL's `pg_trgm` extension does, so short
/// strings still produce at least one trigram.
fn trigrams(s: &str) -> HashSet<String> {
    let normalized = format!(" {} ", s.trim().to_lowercase());
    let chars: Vec<char> = normalized.chars().collect();
    if chars.len() < 3 {
        return HashSet::from([normalized]);
    }
    chars
        .windows(3)
        .map(|w| w.iter().collect::<String>())
        .collect()
}

/// Jaccard similarity over trigram sets, in `[0,1]`. Two empty strings are
/// defined as dissimilar (`0.0`) rather than trivially identical, since an
/// empty catalog field should never auto-match.
pub fn trigram_similarity(a: &str, b: &str) -> f64 {
    if a.trim().is_empty() || b.trim().is_empty() {
        return 0.0;
    }
    let ta = trigrams(a);
    let tb = trigrams(b);
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(trigram_similarity("PROD-999", "PROD-999"), 1.0);
    }

    #[test]
    fn empty_strings_score_zero() {
        assert_eq!(trigram_similarity("", "abc"), 0.0);
        assert_eq!(trigram_similarity("", ""), 0.0);
    }

    #[test]
    fn similar_strings_score_high() {
        let s = trigram_similarity("ABC-1234", "ABC-1235");
        assert!(s > 0.5, "expected high similarity, got {s}");
    }

    #[test]
    fn dissimilar_strings_score_low() {
        let s = trigram_similarity("ABC-1234", "widget grommet");
        assert!(s < 0.2, "expected low similarity, got {s}");
    }

    #[test]
    fn is_case_insensitive() {
        assert_eq!(trigram_similarity("abc", "ABC"), 1.0);
    }

    #[test]
    fn is_symmetric() {
        assert_eq!(trigram_similarity("abcdef", "bcdefg"), trigram_similarity("bcdefg", "abcdef"));
    }
}
