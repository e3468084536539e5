//! Generic REQUEST encoding for prompts the dictionary cannot classify.

use ucp_core::text::{collapse_whitespace, strip_prefix_ignore_ascii_case};

/// Politeness and framing prefixes dropped from fallback payloads.
const FILLERS: &[&str] = &["please", "could you", "can you", "i would like you to", "i need", "i want"];

/// Strip leading filler phrases, repeatedly, and tidy whitespace.
///
/// `"Please, could you   help me"` becomes `"help me"`.
pub fn strip_fillers(text: &str) -> String {
    let collapsed = collapse_whitespace(text);
    let mut rest = collapsed.as_str();
    while let Some(next) = FILLERS.iter().find_map(|f| strip_filler(rest, f)) {
        rest = next;
    }
    rest.to_owned()
}

/// `filler` must end at a word boundary.
fn strip_filler<'a>(s: &'a str, filler: &str) -> Option<&'a str> {
    let after = strip_prefix_ignore_ascii_case(s, filler)?;
    (after.is_empty() || after.starts_with([' ', ','])).then(|| after.trim_start_matches([' ', ',']))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_stacked_fillers() {
        assert_eq!(strip_fillers("Please could you tell me a joke"), "tell me a joke");
        assert_eq!(strip_fillers("I would like you to   plan a trip"), "plan a trip");
        assert_eq!(strip_fillers("please, can you help"), "help");
    }

    #[test]
    fn fillers_only_match_at_the_start() {
        assert_eq!(strip_fillers("tell me why people say please "), "tell me why people say please");
    }

    #[test]
    fn fillers_must_be_whole_words() {
        assert_eq!(strip_fillers("Pleased to meet you"), "Pleased to meet you");
    }

    #[test]
    fn only_fillers_is_empty() {
        assert_eq!(strip_fillers("  please   "), "");
        assert_eq!(strip_fillers(""), "");
    }
}
