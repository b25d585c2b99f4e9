//! Text normalization shared by ingestion and querying.
//!
//! Indexed course text and search phrases both go through [`clean`], so the
//! two sides of a similarity query always meet in the same canonical form.
//! Each pass is a function `&str -> String` applied in sequence.

mod stopwords;

use std::sync::LazyLock;

use regex::Regex;

pub use stopwords::{STOP_WORDS, is_stop_word};

/// Normalize `text` into lowercase ASCII alphanumeric tokens separated by
/// single spaces, with English stop words removed.
///
/// Total and idempotent: `clean(&clean(x)) == clean(x)` for every input, and
/// blank input yields an empty string.
pub fn clean(text: &str) -> String {
    let mut result = trim_and_lowercase(text);

    result = strip_special_chars(&result);
    result = remove_stop_words(&result);
    result = collapse_whitespace(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Trim and lowercase
// ---------------------------------------------------------------------------

fn trim_and_lowercase(text: &str) -> String {
    text.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Pass 2: Strip everything but ASCII letters, digits, and whitespace
// ---------------------------------------------------------------------------

fn strip_special_chars(text: &str) -> String {
    static SPECIAL_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9\s]").expect("valid regex"));

    SPECIAL_RE.replace_all(text, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Remove stop words
// ---------------------------------------------------------------------------

/// Tokens are split on whitespace runs, not single spaces: a tab or newline
/// must separate words here exactly as it will after pass 4, or a second
/// `clean` could find stop words the first one missed.
fn remove_stop_words(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| !is_stop_word(token))
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Pass 4: Collapse whitespace
// ---------------------------------------------------------------------------

fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_punctuation_and_stop_words() {
        assert_eq!(
            clean("  Introduction to the Theory of Computation!  "),
            "introduction theory computation"
        );
    }

    #[test]
    fn set_literal_becomes_plain_tokens() {
        assert_eq!(clean("{'Computer Science', 'Chess'}"), "computer science chess");
    }

    #[test]
    fn empty_and_blank_inputs() {
        assert_eq!(clean(""), "");
        assert_eq!(clean("   \t\n "), "");
        assert_eq!(clean("!!! ??? ..."), "");
        assert_eq!(clean("the of and"), "");
    }

    #[test]
    fn non_ascii_letters_are_dropped() {
        assert_eq!(clean("Café Résumé"), "caf rsum");
    }

    #[test]
    fn digits_survive() {
        assert_eq!(clean("CS 6200 - Fall 2024"), "cs 6200 fall 2024");
    }

    #[test]
    fn mixed_whitespace_collapses() {
        assert_eq!(clean("machine\tlearning\n\nsystems"), "machine learning systems");
    }

    #[test]
    fn stop_words_behind_tabs_are_removed() {
        assert_eq!(clean("graph\tthe\tdatabases"), "graph databases");
    }

    #[test]
    fn idempotent_on_awkward_inputs() {
        let inputs = [
            "",
            "   ",
            "a\tthe",
            "The Art of Computer Programming, Vol. 1",
            "don't stop-believing",
            "Ünïcödé\u{00a0}spaces\u{2003}and the Kelvin \u{212a}",
            "prereq: CS-5001; CS-5002 (or equivalent)",
            "{'Female', 'Norway', 'Machine Learning Engineer'}",
            "\n\nmulti\nline\n\ttext with  doubled   spaces\n",
        ];
        for input in inputs {
            let once = clean(input);
            assert_eq!(clean(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn output_shape_invariant() {
        let out = clean("  Hello,   World -- it's 2024!  ");
        assert!(!out.starts_with(' ') && !out.ends_with(' '));
        assert!(!out.contains("  "));
        assert!(
            out.chars()
                .all(|c| c == ' ' || c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }
}
