//! Payload extraction after a keyword match.

use ucp_core::text::strip_prefix_ignore_ascii_case;

/// Leading words and labels dropped from the text after a keyword.
const CONNECTIVES: &[&str] = &[
    "the ", "this ", "these ", "that ", "those ", "a ", "an ", "of ", "for ", "about ", "on ",
    "in ", "to ", "following ", "text:", "data:",
];

/// Punctuation dropped when it leads the payload.
const LEADING_PUNCTUATION: &[char] = &[':', ',', '-'];

/// A colon this close to the start marks a label such as `spanish:`.
const COLON_WINDOW: usize = 30;

/// Derive the payload from the text that follows a matched keyword.
///
/// Connectives and leading punctuation are stripped repeatedly, then a short
/// leading label ending in a colon is dropped unless a colon was already
/// consumed. At most one label colon is removed. Casing is preserved.
pub fn derive_remainder(after_keyword: &str) -> String {
    let mut rest = after_keyword.trim();
    let mut colon_consumed = false;

    loop {
        let stripped = CONNECTIVES
            .iter()
            .find_map(|c| strip_prefix_ignore_ascii_case(rest, c).map(|s| (s, c.ends_with(':'))))
            .or_else(|| rest.strip_prefix(LEADING_PUNCTUATION).map(|s| (s, rest.starts_with(':'))));
        match stripped {
            Some((s, colon)) => {
                colon_consumed |= colon;
                rest = s.trim_start();
            }
            None => break,
        }
    }

    if !colon_consumed {
        let colon = rest
            .char_indices()
            .take(COLON_WINDOW)
            .find(|(_, c)| *c == ':')
            .map(|(byte, _)| byte);
        if let Some(byte) = colon {
            rest = &rest[byte + 1..];
        }
    }

    rest.trim().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_chained_connectives_and_label() {
        assert_eq!(
            derive_remainder(" the following text: AI is changing everything."),
            "AI is changing everything."
        );
    }

    #[test]
    fn strips_language_label() {
        assert_eq!(derive_remainder(" this to spanish: Hello world"), "Hello world");
    }

    #[test]
    fn keeps_casing() {
        assert_eq!(derive_remainder(" about Rust Ownership"), "Rust Ownership");
    }

    #[test]
    fn connectives_are_case_insensitive() {
        assert_eq!(derive_remainder("The Data: 42"), "42");
    }

    #[test]
    fn colon_beyond_window_is_kept() {
        let text = "a very long introduction that goes past the window: tail";
        assert_eq!(
            derive_remainder(text),
            "very long introduction that goes past the window: tail"
        );
    }

    #[test]
    fn leading_punctuation_is_stripped() {
        assert_eq!(derive_remainder(": Quarterly Results"), "Quarterly Results");
        assert_eq!(derive_remainder(" - the draft"), "draft");
    }

    #[test]
    fn leading_colon_counts_as_the_label() {
        assert_eq!(derive_remainder(": Meeting at 10:30 today"), "Meeting at 10:30 today");
        assert_eq!(derive_remainder(": Ratio 3:1 wins"), "Ratio 3:1 wins");
        assert_eq!(derive_remainder(": Note: call Bob: now"), "Note: call Bob: now");
    }

    #[test]
    fn only_one_label_colon_is_dropped() {
        assert_eq!(derive_remainder(" to spanish: 10:30 sharp"), "10:30 sharp");
        assert_eq!(derive_remainder(" data: key: value"), "key: value");
    }

    #[test]
    fn empty_after_stripping() {
        assert_eq!(derive_remainder("  "), "");
        assert_eq!(derive_remainder(" the text:"), "");
        assert_eq!(derive_remainder(" text:"), "");
    }

    #[test]
    fn word_prefixes_are_not_connectives() {
        assert_eq!(derive_remainder("theory of mind"), "theory of mind");
        assert_eq!(derive_remainder("another day"), "another day");
    }

    proptest! {
        #[test]
        fn remainder_is_a_trimmed_slice_of_the_input(text in "\\PC{0,60}") {
            let rest = derive_remainder(&text);
            prop_assert_eq!(rest.trim(), rest.as_str());
            prop_assert!(text.contains(&rest));
        }
    }
}
