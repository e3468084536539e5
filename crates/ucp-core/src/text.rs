//! Text helpers shared by the dictionary, rules and compiler.

use std::ops::Range;

/// Find `needle` in `haystack` ignoring case.
///
/// The returned range indexes the original `haystack`, so callers can slice
/// the input with its casing intact. Matching is done on the Unicode
/// lowercase form of both strings.
pub fn find_ignore_case(haystack: &str, needle: &str) -> Option<Range<usize>> {
    if needle.is_empty() {
        return Some(0..0);
    }
    let needle = needle.to_lowercase();
    let mut folded = String::with_capacity(haystack.len());
    // origin[i] = byte offset in `haystack` of the char that produced folded byte i
    let mut origin = Vec::with_capacity(haystack.len() + 1);
    for (idx, ch) in haystack.char_indices() {
        for lower in ch.to_lowercase() {
            let before = folded.len();
            folded.push(lower);
            origin.extend(std::iter::repeat_n(idx, folded.len() - before));
        }
    }
    origin.push(haystack.len());

    let at = folded.find(&needle)?;
    let end = at + needle.len();
    let start = origin[at];
    // An end that lands inside a multi-char lowercase expansion snaps forward.
    let end = if end == folded.len() || origin[end] != origin[end - 1] {
        origin[end]
    } else {
        next_char_boundary(haystack, origin[end])
    };
    Some(start..end)
}

/// Whether `haystack` contains `needle`, ignoring case.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Strip `prefix` from the start of `s` ignoring ASCII case.
pub fn strip_prefix_ignore_ascii_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` bytes without splitting a character.
pub fn truncate_str(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

fn next_char_boundary(s: &str, from: usize) -> usize {
    s[from..]
        .chars()
        .next()
        .map_or(s.len(), |c| from + c.len_utf8())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
