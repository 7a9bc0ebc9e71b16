//! Output safety gate — keeps model rewrites faithful.
//!
//! Every check must pass or the candidate is rejected wholesale
//! (fail-closed); rejection means the pipeline keeps the pre-model text.
//! The gate bounds what a model may change: no dropped numbers, links, or
//! negations, no large length shifts on real sentences, a cap on invented
//! vocabulary, and no conversational closing filler that was never dictated.

use std::sync::LazyLock;

use regex::Regex;

const MIN_WORD_RATIO: f32 = 0.72;
const MAX_WORD_RATIO: f32 = 1.35;
const NOVEL_TOKEN_RATIO_LIMIT: f32 = 0.18;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}[\p{L}\p{N}'’-]*").expect("invalid word pattern"));

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+(?:[.,:/-]\d+)*\b").expect("invalid number pattern"));

static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:https?://\S+|www\.\S+|\S+@\S+\.\S+)\b").expect("invalid link pattern")
});

static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(no|not|never|none|don't|doesn't|didn't|can't|cannot|won't|shouldn't|isn't|aren't|wasn't|weren't|without)\b",
    )
    .expect("invalid negation pattern")
});

static FINAL_INTENT_CUE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(never\s?mind|nevermind|scratch\s+that|actually|instead|rather)\b")
        .expect("invalid intent cue pattern")
});

static OUT_OF_CONTEXT_FILLER: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\blet me know\b",
        r"(?i)\bfeel free\b",
        r"(?i)\bhope this helps\b",
        r"(?i)\bthank you\b",
        r"(?i)\bthanks\b",
        r"(?i)\bbest regards\b",
        r"(?i)\bhave a great\b",
        r"(?i)\blooking forward\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid filler pattern"))
    .collect()
});

/// Closed-class words that never count as "novel" vocabulary.
const FUNCTION_WORD_ALLOWLIST: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "then", "else", "for", "to", "of", "in", "on",
    "at", "with", "from", "into", "over", "under", "by", "as", "is", "are", "was", "were", "be",
    "been", "being", "do", "does", "did", "have", "has", "had", "i", "you", "we", "they", "he",
    "she", "it", "my", "your", "our", "their", "this", "that", "these", "those",
];

/// Decide whether model output may replace the deterministic/original text.
///
/// `allow_style_novelty` relaxes only the novel-token check (used when the
/// caller explicitly asked for a stylistic transform); every faithfulness
/// check still applies.
pub fn is_safe_rewrite(source: &str, rewritten: &str, allow_style_novelty: bool) -> bool {
    let candidate = rewritten.trim();
    if candidate.is_empty() {
        return false;
    }

    let source_has_digits = source.chars().any(|c| c.is_ascii_digit());
    let candidate_has_digits = candidate.chars().any(|c| c.is_ascii_digit());
    if source_has_digits && !candidate_has_digits {
        log::debug!("safety gate: candidate dropped all digits");
        return false;
    }

    let source_numbers: Vec<&str> = NUMBER.find_iter(source).map(|m| m.as_str()).collect();
    if !source_numbers
        .iter()
        .all(|n| NUMBER.find_iter(candidate).any(|m| m.as_str() == *n))
    {
        log::debug!("safety gate: candidate dropped a number token");
        return false;
    }

    let source_links: Vec<String> = LINK
        .find_iter(source)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if !source_links.is_empty() {
        let candidate_links: Vec<String> = LINK
            .find_iter(candidate)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        if !source_links.iter().all(|l| candidate_links.contains(l)) {
            log::debug!("safety gate: candidate dropped a link");
            return false;
        }
    }

    if NEGATION.is_match(source) && !NEGATION.is_match(candidate) {
        log::debug!("safety gate: candidate dropped a negation");
        return false;
    }

    let source_words = WORD.find_iter(source).count();
    let candidate_words = WORD.find_iter(candidate).count();
    if source_words >= 8 {
        let ratio = candidate_words as f32 / source_words as f32;
        let has_intent_cue = FINAL_INTENT_CUE.is_match(source);
        if !has_intent_cue && !(MIN_WORD_RATIO..=MAX_WORD_RATIO).contains(&ratio) {
            log::debug!("safety gate: word-count ratio {ratio:.2} out of bounds");
            return false;
        }
    }

    if !allow_style_novelty && exceeds_novel_token_ratio(source, candidate) {
        log::debug!("safety gate: too many novel tokens");
        return false;
    }

    if has_out_of_context_filler(source, candidate) {
        log::debug!("safety gate: candidate injected closing filler");
        return false;
    }

    true
}

fn exceeds_novel_token_ratio(source: &str, rewritten: &str) -> bool {
    let source_lexicon: Vec<String> = WORD
        .find_iter(source)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if source_lexicon.is_empty() {
        return false;
    }

    let rewritten_tokens: Vec<String> = WORD
        .find_iter(rewritten)
        .map(|m| m.as_str().to_lowercase())
        .collect();
    if rewritten_tokens.len() < 8 {
        return false;
    }

    let novel_count = rewritten_tokens
        .iter()
        .filter(|token| {
            token.chars().count() > 2
                && !source_lexicon.contains(token)
                && !FUNCTION_WORD_ALLOWLIST.contains(&token.as_str())
        })
        .count();
    let ratio = novel_count as f32 / rewritten_tokens.len() as f32;
    ratio > NOVEL_TOKEN_RATIO_LIMIT
}

fn has_out_of_context_filler(source: &str, rewritten: &str) -> bool {
    OUT_OF_CONTEXT_FILLER
        .iter()
        .any(|pattern| pattern.is_match(rewritten) && !pattern.is_match(source))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_context_filler_additions() {
        let source = "Can you send the report by 5 pm today";
        let rewritten = "Can you send the report by 5 pm today? Let me know, thanks!";
        assert!(!is_safe_rewrite(source, rewritten, false));
        // Style novelty does not excuse injected filler.
        assert!(!is_safe_rewrite(source, rewritten, true));
    }

    #[test]
    fn accepts_conservative_rewrite_without_added_context() {
        let source = "um I think we should meet tomorrow at 3 and review the budget";
        let rewritten = "I think we should meet tomorrow at 3 and review the budget.";
        assert!(is_safe_rewrite(source, rewritten, false));
    }

    #[test]
    fn preserves_list_like_content_rewritten_as_bullets() {
        let source = "buy milk, eggs, bananas, bread";
        let rewritten = "- buy milk\n- eggs\n- bananas\n- bread";
        assert!(is_safe_rewrite(source, rewritten, false));
    }

    #[test]
    fn rejects_missing_numbers_links_or_negation() {
        let source = "Do not send before 4 pm. Use https://example.com/task/42";
        let missing_negation = "Send before 4 pm. Use https://example.com/task/42";
        let missing_link = "Do not send before 4 pm. Use the task page";
        let missing_number = "Do not send before the deadline. Use https://example.com/task/42";

        assert!(!is_safe_rewrite(source, missing_negation, false));
        assert!(!is_safe_rewrite(source, missing_link, false));
        assert!(!is_safe_rewrite(source, missing_number, false));
    }

    #[test]
    fn rejects_blank_candidates() {
        assert!(!is_safe_rewrite("anything", "   ", false));
    }

    #[test]
    fn rejects_heavy_compression_of_long_sources() {
        let source = "please remember that the courier needs the side entrance code and the parking pass before noon";
        let rewritten = "courier needs code";
        assert!(!is_safe_rewrite(source, rewritten, false));
    }

    #[test]
    fn intent_change_cue_exempts_word_ratio() {
        let source = "write the whole plan for tomorrow scratch that just say we meet at noon as planned";
        let rewritten = "we meet at noon";
        assert!(is_safe_rewrite(source, rewritten, false));
    }

    #[test]
    fn rejects_excessive_novel_vocabulary() {
        let source = "send the invoice to the client tomorrow morning please";
        let rewritten =
            "dispatch the statement toward our esteemed customer first thing upon sunrise";
        assert!(!is_safe_rewrite(source, rewritten, false));
    }

    #[test]
    fn allow_style_novelty_relaxes_only_the_novelty_check() {
        let source = "send the invoice to the client tomorrow morning please";
        let rewritten =
            "dispatch the statement toward our esteemed customer first thing upon sunrise";
        assert!(is_safe_rewrite(source, rewritten, true));
    }
}
