//! Spoken-number conversion — "twenty three" → "23".
//!
//! Dictation engines frequently emit numbers as words.  This module turns a
//! whitespace/hyphen-delimited run of number words (optionally containing
//! "and") into the digit string a listener would write down, and exposes a
//! text-level pass that rewrites every such run inside a larger transcript.
//!
//! Sequences made up entirely of single-digit words are concatenated
//! positionally rather than summed — "two two one" is a phone-pad style
//! "221", not "5".

use std::sync::LazyLock;

use regex::Regex;

// ---------------------------------------------------------------------------
// Word tables
// ---------------------------------------------------------------------------

const DIGIT_WORDS: &[(&str, u32)] = &[
    ("zero", 0),
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
];

const TEEN_WORDS: &[(&str, u32)] = &[
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("thirteen", 13),
    ("fourteen", 14),
    ("fifteen", 15),
    ("sixteen", 16),
    ("seventeen", 17),
    ("eighteen", 18),
    ("nineteen", 19),
];

const TENS_WORDS: &[(&str, u32)] = &[
    ("twenty", 20),
    ("thirty", 30),
    ("forty", 40),
    ("fifty", 50),
    ("sixty", 60),
    ("seventy", 70),
    ("eighty", 80),
    ("ninety", 90),
];

const SCALE_WORDS: &[&str] = &["hundred", "thousand"];

fn lookup(table: &[(&str, u32)], token: &str) -> Option<u32> {
    table
        .iter()
        .find(|(word, _)| *word == token)
        .map(|(_, value)| *value)
}

fn number_word_pattern() -> String {
    DIGIT_WORDS
        .iter()
        .chain(TEEN_WORDS)
        .chain(TENS_WORDS)
        .map(|(word, _)| *word)
        .chain(SCALE_WORDS.iter().copied())
        .collect::<Vec<_>>()
        .join("|")
}

static NUMBER_SEQUENCE: LazyLock<Regex> = LazyLock::new(|| {
    let words = number_word_pattern();
    Regex::new(&format!(
        r"(?i)\b(?:{words})(?:[\s-]+(?:{words}|and))*\b"
    ))
    .expect("invalid number sequence pattern")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

// ---------------------------------------------------------------------------
// Phrase conversion
// ---------------------------------------------------------------------------

/// Convert a run of number words to its digit string.
///
/// Returns `None` if any token is not a recognized number word (or "and"),
/// or if the phrase consumes no number word at all.
///
/// ```
/// use voice_rewrite::rules::numbers::convert_number_phrase;
///
/// assert_eq!(convert_number_phrase("twenty three"), Some("23".into()));
/// assert_eq!(convert_number_phrase("three hundred and twelve"), Some("312".into()));
/// assert_eq!(convert_number_phrase("two two one"), Some("221".into()));
/// assert_eq!(convert_number_phrase("two bananas"), None);
/// ```
pub fn convert_number_phrase(phrase: &str) -> Option<String> {
    let lowered = phrase.to_lowercase().replace('-', " ");
    let tokens: Vec<&str> = WHITESPACE
        .split(&lowered)
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.is_empty() {
        return None;
    }
    if tokens
        .iter()
        .any(|t| !is_number_word(t) && *t != "and")
    {
        return None;
    }

    // Phone/ID-style sequences: every token a single digit word, two or more
    // of them — concatenate positionally instead of summing.
    if tokens.len() >= 2 && tokens.iter().all(|t| lookup(DIGIT_WORDS, t).is_some()) {
        let digits: String = tokens
            .iter()
            .map(|t| {
                lookup(DIGIT_WORDS, t)
                    .map(|d| d.to_string())
                    .unwrap_or_default()
            })
            .collect();
        return Some(digits);
    }

    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut consumed = false;

    for token in tokens {
        if token == "and" {
            continue;
        }
        if let Some(value) = lookup(DIGIT_WORDS, token)
            .or_else(|| lookup(TEEN_WORDS, token))
            .or_else(|| lookup(TENS_WORDS, token))
        {
            current += u64::from(value);
            consumed = true;
        } else if token == "hundred" {
            current = if current == 0 { 1 } else { current } * 100;
            consumed = true;
        } else if token == "thousand" {
            let block = if current == 0 { 1 } else { current };
            total += block * 1000;
            current = 0;
            consumed = true;
        } else {
            return None;
        }
    }

    if !consumed {
        return None;
    }
    Some((total + current).to_string())
}

/// Whether `token` (lowercase) is a recognized number word.
pub fn is_number_word(token: &str) -> bool {
    lookup(DIGIT_WORDS, token).is_some()
        || lookup(TEEN_WORDS, token).is_some()
        || lookup(TENS_WORDS, token).is_some()
        || SCALE_WORDS.contains(&token)
}

/// Whether any whitespace/hyphen-delimited token of `text` is a number word.
pub fn contains_cardinal_word(text: &str) -> bool {
    let lowered = text.to_lowercase().replace('-', " ");
    WHITESPACE
        .split(&lowered)
        .filter(|t| !t.is_empty())
        .any(is_number_word)
}

/// Rewrite every number-word run inside `text` to digits.
///
/// Runs that fail to convert (mixed with unknown words) are left untouched.
pub fn normalize_number_words(text: &str) -> String {
    NUMBER_SEQUENCE
        .replace_all(text, |caps: &regex::Captures| {
            let phrase = &caps[0];
            convert_number_phrase(phrase).unwrap_or_else(|| phrase.to_string())
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- convert_number_phrase ---

    #[test]
    fn single_digit_word() {
        assert_eq!(convert_number_phrase("five"), Some("5".into()));
    }

    #[test]
    fn teen_word() {
        assert_eq!(convert_number_phrase("fifteen"), Some("15".into()));
    }

    #[test]
    fn tens_plus_digit() {
        assert_eq!(convert_number_phrase("twenty three"), Some("23".into()));
        assert_eq!(convert_number_phrase("ninety-nine"), Some("99".into()));
    }

    #[test]
    fn hundreds_and_thousands() {
        assert_eq!(convert_number_phrase("one hundred"), Some("100".into()));
        assert_eq!(
            convert_number_phrase("three hundred and twelve"),
            Some("312".into())
        );
        assert_eq!(
            convert_number_phrase("two thousand five"),
            Some("2005".into())
        );
        assert_eq!(convert_number_phrase("hundred"), Some("100".into()));
        assert_eq!(convert_number_phrase("thousand"), Some("1000".into()));
    }

    #[test]
    fn digit_sequence_concatenates_instead_of_summing() {
        assert_eq!(convert_number_phrase("two two one"), Some("221".into()));
        assert_eq!(
            convert_number_phrase("five five five one two three four"),
            Some("5551234".into())
        );
    }

    #[test]
    fn mixed_digit_and_tens_words_always_sum() {
        // "nineteen ninety" is not all single-digit words, so it sums.
        assert_eq!(convert_number_phrase("nineteen ninety"), Some("109".into()));
        assert_eq!(convert_number_phrase("two twenty"), Some("22".into()));
    }

    #[test]
    fn rejects_unknown_tokens() {
        assert_eq!(convert_number_phrase("two bananas"), None);
        assert_eq!(convert_number_phrase(""), None);
        assert_eq!(convert_number_phrase("and"), None);
    }

    // ---- contains_cardinal_word ---

    #[test]
    fn detects_cardinal_words() {
        assert!(contains_cardinal_word("at six tomorrow"));
        assert!(contains_cardinal_word("twenty-five people"));
        assert!(!contains_cardinal_word("no numbers here"));
    }

    // ---- normalize_number_words ---

    #[test]
    fn converts_runs_inside_text() {
        assert_eq!(
            normalize_number_words("meet me in twenty three minutes"),
            "meet me in 23 minutes"
        );
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(
            normalize_number_words("nothing numeric in this sentence"),
            "nothing numeric in this sentence"
        );
    }

    #[test]
    fn converts_multiple_runs() {
        assert_eq!(
            normalize_number_words("five plus five is ten"),
            "5 plus 5 is 10"
        );
    }
}
