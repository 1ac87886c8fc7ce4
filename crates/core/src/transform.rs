// Post-processing for reassembled generation output
//
// Decision: Keep the literal pair-merge semantics. The regex is applied once, leftmost,
// non-overlapping, so a run of three words merges only its first pair ("a b c" -> "ab c").

use regex::Regex;
use std::sync::LazyLock;

static WORD_PAIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Za-z]+)\s([A-Za-z]+)").expect("valid word-pair regex"));

/// Normalize generated text.
///
/// 1. newlines become spaces
/// 2. backslashes are removed
/// 3. each `word<whitespace>word` pair of ASCII letters is joined, scanning left to right
///    without overlap
pub fn transform_text(input: &str) -> String {
    let text = input.replace('\n', " ").replace('\\', "");
    WORD_PAIR.replace_all(&text, "${1}${2}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words_are_rejoined() {
        assert_eq!(transform_text("He llo\nWor\\ld"), "Hello World");
    }

    #[test]
    fn test_newlines_and_backslashes() {
        assert_eq!(transform_text("1\n2\\3"), "1 23");
    }

    #[test]
    fn test_three_word_run_merges_first_pair_only() {
        assert_eq!(transform_text("a b c"), "ab c");
        assert_eq!(transform_text("a b c d"), "ab cd");
    }

    #[test]
    fn test_non_alphabetic_tokens_are_left_alone() {
        assert_eq!(transform_text("42 is 7 times 6"), "42 is 7 times 6");
        assert_eq!(transform_text("it's ok"), "it'sok");
    }

    #[test]
    fn test_trailing_fragment_separator_survives() {
        // Fragments are joined with a trailing space; trimming happens after the transform.
        assert_eq!(transform_text("Hi "), "Hi ");
        assert_eq!(transform_text("Hi there "), "Hithere ");
    }

    #[test]
    fn test_only_single_whitespace_is_bridged() {
        assert_eq!(transform_text("ab  cd"), "ab  cd");
        assert_eq!(transform_text("ab\tcd"), "abcd");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(transform_text(""), "");
    }
}
