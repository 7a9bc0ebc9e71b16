//! Append formatting — joining a new utterance onto existing text.
//!
//! List-like content joins with a newline so dictated items stack; prose
//! joins with a space.  The joined text gets the same surface cleanup as
//! edited text (no space before punctuation, collapsed spaces/newlines).

use std::sync::LazyLock;

use regex::Regex;

use crate::rules::list::looks_like_list;

static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;:!?])").expect("invalid punctuation pattern"));

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("invalid multi space pattern"));

static SPACED_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("invalid spaced newline pattern"));

static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("invalid multi newline pattern"));

/// Join `chunk` onto `source`, choosing a newline or space separator.
///
/// Blank chunk returns the source unchanged; blank source returns the chunk.
pub fn join_append(source: &str, chunk: &str) -> String {
    let trimmed_source = source.trim_end();
    let trimmed_chunk = chunk.trim();
    if trimmed_chunk.is_empty() {
        return source.to_string();
    }
    if trimmed_source.trim().is_empty() {
        return trimmed_chunk.to_string();
    }

    let use_newline = looks_like_list(trimmed_source) || looks_like_list(trimmed_chunk);
    let separator = if use_newline { "\n" } else { " " };
    let joined = format!("{trimmed_source}{separator}{trimmed_chunk}");

    let step = SPACE_BEFORE_PUNCTUATION.replace_all(&joined, "$1");
    let step = MULTI_SPACE.replace_all(&step, " ");
    let step = SPACED_NEWLINE.replace_all(&step, "\n");
    let step = MULTI_NEWLINE.replace_all(&step, "\n\n");
    step.trim().to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_chunk_keeps_source() {
        assert_eq!(join_append("hello", "   "), "hello");
    }

    #[test]
    fn blank_source_returns_chunk() {
        assert_eq!(join_append("", "hello there"), "hello there");
        assert_eq!(join_append("   ", "hello there"), "hello there");
    }

    #[test]
    fn prose_joins_with_space() {
        assert_eq!(
            join_append("See you at noon.", "bring the charger"),
            "See you at noon. bring the charger"
        );
    }

    #[test]
    fn list_content_joins_with_newline() {
        assert_eq!(
            join_append("- milk\n- eggs", "bread"),
            "- milk\n- eggs\nbread"
        );
        assert_eq!(
            join_append("groceries so far", "buy milk, eggs, bananas, bread"),
            "groceries so far\nbuy milk, eggs, bananas, bread"
        );
    }

    #[test]
    fn joined_text_is_surface_cleaned() {
        assert_eq!(join_append("hello", ", world"), "hello, world");
    }
}
