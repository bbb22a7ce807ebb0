//! Minimal, deterministic text normalization helpers.

use std::collections::HashSet;

/// Collapse whitespace runs to single spaces and trim both ends.
pub fn norm_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Keep the first occurrence of each string, drop later exact duplicates,
/// preserve relative order.
pub fn dedup_preserve_order<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let s: String = item.into();
        if seen.insert(s.clone()) {
            out.push(s);
        }
    }
    out
}

/// Char-safe truncation. When `s` is longer than `max_chars`, the result ends in
/// `...` and is exactly `max_chars` chars long.
pub fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 3 {
        return ".".repeat(max_chars);
    }
    let mut out: String = s.chars().take(max_chars - 3).collect();
    out.push_str("...");
    out
}

/// Lowercased alphanumeric tokens (apostrophes kept inside words).
pub fn words_lc(s: &str) -> Vec<String> {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|w| w.trim_matches('\'').to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}
