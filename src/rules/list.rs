//! List-likeness heuristic.
//!
//! Classifies a text blob as enumerable items (shopping list, steps) versus
//! prose.  Both the append formatter (newline vs. space joins) and the model
//! prompt builder (bullet-preserving prompts) key off this, so the heuristic
//! is tuned to avoid false negatives on obvious lists.

use std::sync::LazyLock;

use regex::Regex;

static EXPLICIT_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*(?:[-*•]|\d+[.)])\s+\S+").expect("invalid bullet pattern")
});

static LIST_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(first|second|third|fourth|fifth|next|then|finally|list|bullet|bullets|items?|steps?|points?)\b|\d+[.)]",
    )
    .expect("invalid list cue pattern")
});

static SHOPPING_TASK_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(buy|shopping|groceries|todo|to-do|tasks?|pick\s+up|get\s+me|remember\s+to|need\s+to)\b")
        .expect("invalid shopping cue pattern")
});

static DELIMITED_ITEMS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\w+\b\s*[,;|]\s*\b\w+\b\s*[,;|]").expect("invalid delimited items pattern")
});

/// Whether `text` reads like a list of items rather than prose.
///
/// ```
/// use voice_rewrite::rules::list::looks_like_list;
///
/// assert!(looks_like_list("buy milk, eggs, bananas, bread"));
/// assert!(looks_like_list("- milk\n- eggs"));
/// assert!(!looks_like_list("I can make it at 5pm and bring the document."));
/// ```
pub fn looks_like_list(text: &str) -> bool {
    let input = text.trim();
    if input.is_empty() {
        return false;
    }

    if EXPLICIT_BULLET.is_match(input) {
        return true;
    }
    if LIST_CUE.is_match(input) {
        return true;
    }
    if SHOPPING_TASK_CUE.is_match(input) && DELIMITED_ITEMS.is_match(input) {
        return true;
    }

    let newline_segments: Vec<&str> = input
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if newline_segments.len() >= 3
        && newline_segments.iter().filter(|l| l.len() <= 32).count() >= 2
    {
        return true;
    }

    let delimiter_count = input
        .chars()
        .filter(|c| matches!(c, ',' | ';' | '|'))
        .count();
    if delimiter_count >= 3 {
        let tokens: Vec<&str> = input
            .split([',', ';', '|'])
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if tokens.len() >= 4 {
            let avg_len =
                tokens.iter().map(|t| t.len()).sum::<usize>() as f32 / tokens.len() as f32;
            if avg_len <= 18.0 {
                return true;
            }
        }
    }

    false
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
