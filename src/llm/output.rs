//! Model-output cleanup.
//!
//! Small local models echo their prompt scaffolding back with some
//! regularity: "Cleaned:" labels, wrapping quotes or backticks, a repeated
//! "user input:" preamble, or bullets where none were asked for.
//! [`clean_model_output`] strips that scaffolding so the safety gate and the
//! caller only ever see candidate text.

use std::sync::LazyLock;

use regex::Regex;

static CLEANED_ANCHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^cleaned\s*:\s*").expect("invalid cleaned anchor pattern")
});

static PREFIX_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(rewritten|rewrite|cleaned|output|result)\s*:\s*")
        .expect("invalid prefix label pattern")
});

/// Strip prompt scaffolding from raw model output.
///
/// `bullet_mode` preserves leading "- " bullets; otherwise a fully-bulleted
/// answer is flattened back into a single line.
pub fn clean_model_output(text: &str, bullet_mode: bool) -> String {
    let mut cleaned = text.trim().to_string();
    if cleaned.is_empty() {
        return String::new();
    }

    // Keep only what follows the last "Cleaned:" anchor (models sometimes
    // repeat the label once per attempt).
    if let Some(m) = CLEANED_ANCHOR.find_iter(&cleaned).last() {
        cleaned = cleaned[m.end()..].trim().to_string();
    }

    cleaned = PREFIX_LABEL.replace(&cleaned, "").trim().to_string();
    cleaned = cleaned
        .trim_matches('`')
        .trim()
        .to_string();
    cleaned = strip_surrounding(&cleaned, '"');
    cleaned = strip_surrounding(&cleaned, '\'');
    cleaned = cleaned.trim().to_string();
    if cleaned.is_empty() {
        return String::new();
    }

    // Echoed prompt: "user input: …\n<actual answer>" — keep the last line.
    if cleaned.to_lowercase().starts_with("user input:") {
        let non_empty: Vec<&str> = cleaned
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();
        if non_empty.len() >= 2 {
            cleaned = non_empty[non_empty.len() - 1].to_string();
        }
    }

    if !bullet_mode && cleaned.starts_with("- ") {
        cleaned = cleaned
            .lines()
            .map(|l| l.trim().trim_start_matches("- ").trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
    }

    cleaned
}

fn strip_surrounding(text: &str, quote: char) -> String {
    let stripped = text
        .strip_prefix(quote)
        .and_then(|t| t.strip_suffix(quote));
    match stripped {
        Some(inner) => inner.to_string(),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
