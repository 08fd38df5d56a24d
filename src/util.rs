// src/util.rs — Shared helpers

use std::collections::HashSet;
use std::hash::Hash;

/// Truncate a string for log previews (UTF-8 safe).
///
/// Cuts at most `max_len` bytes, backing up to the nearest character
/// boundary so multi-byte characters are never split.
pub fn truncate_str(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Collapse duplicates while keeping first-occurrence order.
///
/// Cross-iteration bookkeeping keys by identifier, never by position, so
/// dedup must not reorder what it keeps.
pub fn dedup_preserving_order<T>(items: impl IntoIterator<Item = T>) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_unchanged() {
        assert_eq!(truncate_str("query", 16), "query");
    }

    #[test]
    fn test_truncate_cuts_at_limit() {
        assert_eq!(truncate_str("tax decisions council", 3), "tax");
    }

    #[test]
    fn test_truncate_respects_char_boundary() {
        // "Zürich" — 'ü' is two bytes; byte 2 falls inside it
        assert_eq!(truncate_str("Zürich", 2), "Z");
    }

    #[test]
    fn test_truncate_empty() {
        assert_eq!(truncate_str("", 8), "");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence_order() {
        let out = dedup_preserving_order(vec!["d1", "d1", "d2", "d1", "d3", "d2"]);
        assert_eq!(out, vec!["d1", "d2", "d3"]);
    }

    #[test]
    fn test_dedup_empty() {
        let out: Vec<String> = dedup_preserving_order(Vec::<String>::new());
        assert!(out.is_empty());
    }
}
