//! Heuristic token estimator.
//!
//! Each whitespace-delimited unit is classified and priced:
//!
//! | Class | Tokens |
//! |---|---|
//! | pure punctuation | one per character |
//! | decimal number | ≤3 digits → 1, ≤6 → 2, else ⌈len/3⌉ |
//! | URL-like (`://`, `www.`) | ⌈len/4⌉ |
//! | protocol syntax (`[` `]` `:` `_`) | ⌈len/5⌉ |
//! | word | stripped length ≤4 → 1, ≤8 → 2, ≤12 → 3, else ⌈len/4⌉, plus attached punctuation |
//!
//! Every newline adds one token.

const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '\'', '"', '(', ')', '[', ']', '{', '}'];
const SYNTAX_MARKERS: &[char] = &['[', ']', ':', '_'];

/// Estimate the token cost of `text`.
///
/// Pure and deterministic. `estimate("") == 0`.
pub fn estimate(text: &str) -> u64 {
    let units: usize = text.split_whitespace().map(estimate_unit).sum();
    let newlines = text.matches('\n').count();
    (units + newlines) as u64
}

fn estimate_unit(unit: &str) -> usize {
    let len = unit.chars().count();

    if unit.chars().all(|c| PUNCTUATION.contains(&c)) {
        return len;
    }
    if unit.chars().all(|c| c.is_ascii_digit()) {
        return match len {
            0..=3 => 1,
            4..=6 => 2,
            _ => len.div_ceil(3),
        };
    }
    if unit.contains("://") || unit.starts_with("www.") {
        return len.div_ceil(4);
    }
    if unit.contains(SYNTAX_MARKERS) {
        return len.div_ceil(5);
    }

    let clean = unit.chars().filter(|c| c.is_alphanumeric() || *c == '_').count();
    let base = match clean {
        0..=4 => 1,
        5..=8 => 2,
        9..=12 => 3,
        _ => clean.div_ceil(4),
    };
    base + unit.chars().filter(|c| PUNCTUATION.contains(c)).count()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(estimate(""), 0);
        assert_eq!(estimate("   \t "), 0);
    }

    #[test]
    fn newlines_count() {
        assert_eq!(estimate("\n\n"), 2);
        assert_eq!(estimate("hi\nyou"), 3);
    }

    #[test]
    fn word_buckets() {
        assert_eq!(estimate("word"), 1);
        assert_eq!(estimate("compiles"), 2);
        assert_eq!(estimate("summarizing"), 3);
        assert_eq!(estimate("internationalization"), 5);
    }

    #[test]
    fn trailing_punctuation_adds_tokens() {
        assert_eq!(estimate("everything."), 3 + 1);
        assert_eq!(estimate("hi!?"), 1 + 2);
    }

    #[test]
    fn pure_punctuation_counts_each_char() {
        assert_eq!(estimate("..."), 3);
        assert_eq!(estimate("("), 1);
    }

    #[test]
    fn numbers() {
        assert_eq!(estimate("42"), 1);
        assert_eq!(estimate("123456"), 2);
        assert_eq!(estimate("1234567"), 3);
    }

    #[test]
    fn urls() {
        assert_eq!(estimate("https://example.com"), 5);
        assert_eq!(estimate("www.example.com"), 4);
    }

    #[test]
    fn protocol_syntax_is_compact() {
        // 20 chars / 5
        assert_eq!(estimate("[UCP:SUMMARIZE]abcde"), 4);
        assert_eq!(estimate("LANG:ES"), 2);
        assert_eq!(estimate("snake_case"), 2);
    }

    #[test]
    fn sentence() {
        // Please(2) summarize(3) the(1) following(3) text:(1) AI(1) is(1)
        // changing(2) everything.(3+1)
        assert_eq!(
            estimate("Please summarize the following text: AI is changing everything."),
            18
        );
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn deterministic(s in "\\PC{0,200}") {
                prop_assert_eq!(estimate(&s), estimate(&s));
            }

            #[test]
            fn monotonic_for_letters(n in 0usize..64) {
                let shorter = "a".repeat(n);
                let longer = "a".repeat(n + 1);
                prop_assert!(estimate(&shorter) <= estimate(&longer));
            }

            #[test]
            fn monotonic_for_digits(n in 0usize..64) {
                prop_assert!(estimate(&"7".repeat(n)) <= estimate(&"7".repeat(n + 1)));
            }

            #[test]
            fn non_blank_is_positive(s in "[a-zA-Z0-9.,:]{1,40}") {
                prop_assert!(estimate(&s) >= 1);
            }

            #[test]
            fn concatenation_with_space_is_additive(a in "[a-z]{1,20}", b in "[a-z]{1,20}") {
                let joined = format!("{a} {b}");
                prop_assert_eq!(estimate(&joined), estimate(&a) + estimate(&b));
            }
        }
    }
}
