//! Deterministic edit engine — executes a parsed command against source text.
//!
//! [`try_apply_deterministic_edit`] is the entry point: it analyzes the
//! instruction, parses it into a [`ParsedCommand`], and applies it with no
//! model involvement.  A command that parses but matches nothing in the
//! source is a legitimate terminal outcome (`no_match_detected`), not an
//! error — callers fall back to the original text or escalate to the model.
//!
//! Matching is whole-word for single-token targets and literal substring for
//! multi-token targets, always case-insensitive.

use std::sync::LazyLock;

use regex::Regex;

use crate::edit::instruction::{
    analyze_instruction, count_words, normalize_command_term, parse_command, passes_command_gate,
    CommandKind, CommandScope, EditIntent,
};

// ---------------------------------------------------------------------------
// RuleConfidence / DeterministicEditResult
// ---------------------------------------------------------------------------

/// Binary confidence of a deterministic edit.
///
/// HIGH iff at least one occurrence matched; LOW otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleConfidence {
    High,
    Low,
}

/// Outcome of a deterministic edit, with enough metadata for the pipeline to
/// decide whether the result is final or the model should take over.
#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicEditResult {
    pub output: String,
    /// True iff `output` differs from the source text.
    pub applied: bool,
    pub intent: EditIntent,
    pub scope: CommandScope,
    pub command_kind: CommandKind,
    pub matched_count: usize,
    pub rule_confidence: RuleConfidence,
    pub no_match_detected: bool,
}

const MAX_MULTI_TARGET_TERM_WORDS: usize = 3;

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static DELETE_TARGET_SEPARATOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:,|\band\b)\s*").expect("invalid target separator pattern")
});

static NUMERIC_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b\d{1,4}(?::\d{2})?(?:\s?(?:am|pm))?\b").expect("invalid numeric pattern")
});

static SINGLE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\p{N}_'’-]+$").expect("invalid single token pattern"));

static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;!?])").expect("invalid punctuation pattern"));

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("invalid multi space pattern"));

static SPACED_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]*\n[ \t]*").expect("invalid spaced newline pattern"));

static MULTI_NEWLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("invalid multi newline pattern"));

// ---------------------------------------------------------------------------
// try_apply_deterministic_edit
// ---------------------------------------------------------------------------

/// Apply an edit instruction to `source_text` using pure local rules.
///
/// Returns `None` when the instruction does not parse as exactly one
/// deterministic command (too long, ambiguous, pronoun target, or simply not
/// a command) — the caller should escalate to the model in that case.
pub fn try_apply_deterministic_edit(
    source_text: &str,
    instruction_text: &str,
) -> Option<DeterministicEditResult> {
    if source_text.trim().is_empty() || instruction_text.trim().is_empty() {
        return None;
    }
    let analysis = analyze_instruction(instruction_text);
    let command_candidate = &analysis.normalized_instruction;
    if !passes_command_gate(command_candidate) {
        return None;
    }

    let parsed = parse_command(command_candidate)?;
    let result = match parsed.kind {
        CommandKind::NoOp => DeterministicEditResult {
            output: source_text.to_string(),
            applied: false,
            intent: EditIntent::General,
            scope: CommandScope::All,
            command_kind: CommandKind::NoOp,
            matched_count: 1,
            rule_confidence: RuleConfidence::High,
            no_match_detected: false,
        },

        CommandKind::ClearAll => DeterministicEditResult {
            output: String::new(),
            applied: !source_text.is_empty(),
            intent: EditIntent::DeleteAll,
            scope: CommandScope::All,
            command_kind: CommandKind::ClearAll,
            matched_count: usize::from(!source_text.is_empty()),
            rule_confidence: RuleConfidence::High,
            no_match_detected: false,
        },

        CommandKind::DeleteTerm => {
            let target = parsed.target.as_deref().unwrap_or_default();
            let targets = split_delete_targets(target);
            // "first X and Y" is not well-defined across two different
            // terms; multiple targets force ALL scope.
            if targets.len() > 1 && parsed.scope != CommandScope::All {
                return None;
            }
            let mut updated = source_text.to_string();
            let mut total_matched = 0;
            for term in &targets {
                let scope = if targets.len() > 1 {
                    CommandScope::All
                } else {
                    parsed.scope
                };
                let (output, matched) = apply_scoped_edit(&updated, term, "", scope);
                updated = output;
                total_matched += matched;
            }
            DeterministicEditResult {
                output: cleanup_edited_text(&updated),
                applied: updated != source_text,
                intent: EditIntent::General,
                scope: parsed.scope,
                command_kind: CommandKind::DeleteTerm,
                matched_count: total_matched,
                rule_confidence: confidence(total_matched),
                no_match_detected: total_matched == 0,
            }
        }

        CommandKind::ReplaceTerm => {
            let target = parsed.target.as_deref().unwrap_or_default();
            let replacement = parsed.replacement.as_deref().unwrap_or_default();
            let (output, matched) = apply_scoped_edit(source_text, target, replacement, parsed.scope);
            let output = fix_post_replace_capitalization(source_text, target, replacement, &output);
            DeterministicEditResult {
                output: cleanup_edited_text(&output),
                applied: output != source_text,
                intent: EditIntent::Replace,
                scope: parsed.scope,
                command_kind: CommandKind::ReplaceTerm,
                matched_count: matched,
                rule_confidence: confidence(matched),
                no_match_detected: matched == 0,
            }
        }

        CommandKind::UpdateNumber => {
            let replacement = parsed.replacement.as_deref().unwrap_or_default();
            let (output, matched) = apply_last_numeric_edit(source_text, replacement);
            DeterministicEditResult {
                output: cleanup_edited_text(&output),
                applied: output != source_text,
                intent: EditIntent::Replace,
                scope: CommandScope::Last,
                command_kind: CommandKind::UpdateNumber,
                matched_count: matched,
                rule_confidence: confidence(matched),
                no_match_detected: matched == 0,
            }
        }
    };
    Some(result)
}

fn confidence(matched_count: usize) -> RuleConfidence {
    if matched_count > 0 {
        RuleConfidence::High
    } else {
        RuleConfidence::Low
    }
}

// ---------------------------------------------------------------------------
// Scoped application
// ---------------------------------------------------------------------------

fn apply_scoped_edit(
    source_text: &str,
    target: &str,
    replacement: &str,
    scope: CommandScope,
) -> (String, usize) {
    let regex = target_regex(target);
    let matches: Vec<(usize, usize)> = regex
        .find_iter(source_text)
        .map(|m| (m.start(), m.end()))
        .collect();
    if matches.is_empty() {
        return (source_text.to_string(), 0);
    }

    match scope {
        CommandScope::All => (
            regex
                .replace_all(source_text, regex::NoExpand(replacement))
                .into_owned(),
            matches.len(),
        ),
        CommandScope::First => {
            let (start, end) = matches[0];
            (replace_range(source_text, start, end, replacement), 1)
        }
        CommandScope::Last => {
            let (start, end) = matches[matches.len() - 1];
            (replace_range(source_text, start, end, replacement), 1)
        }
    }
}

fn replace_range(text: &str, start: usize, end: usize, replacement: &str) -> String {
    let mut out = String::with_capacity(text.len() + replacement.len());
    out.push_str(&text[..start]);
    out.push_str(replacement);
    out.push_str(&text[end..]);
    out
}

/// Split a delete target on commas/"and" into independent sub-targets.
///
/// Falls back to the whole phrase when fewer than two survive normalization
/// or any sub-target is longer than three words (a long phrase with an "and"
/// in it is more likely one literal target than two).
fn split_delete_targets(target: &str) -> Vec<String> {
    let normalized = target.trim();
    if !DELETE_TARGET_SEPARATOR.is_match(normalized) {
        return vec![normalized.to_string()];
    }
    let tokens: Vec<String> = DELETE_TARGET_SEPARATOR
        .split(normalized)
        .map(|t| normalize_command_term(t, true))
        .filter(|t| !t.is_empty())
        .collect();
    if tokens.len() < 2 {
        return vec![normalized.to_string()];
    }
    if tokens
        .iter()
        .any(|t| count_words(t) > MAX_MULTI_TARGET_TERM_WORDS)
    {
        return vec![normalized.to_string()];
    }
    let mut seen = Vec::new();
    let mut distinct = Vec::new();
    for token in tokens {
        let lowered = token.to_lowercase();
        if !seen.contains(&lowered) {
            seen.push(lowered);
            distinct.push(token);
        }
    }
    distinct
}

fn target_regex(term: &str) -> Regex {
    let escaped = regex::escape(term);
    let pattern = if SINGLE_TOKEN.is_match(term) {
        format!(r"(?i)\b{escaped}\b")
    } else {
        format!("(?i){escaped}")
    };
    Regex::new(&pattern).expect("escaped target pattern is always valid")
}

fn apply_last_numeric_edit(source_text: &str, replacement: &str) -> (String, usize) {
    let matches: Vec<(usize, usize)> = NUMERIC_LIKE
        .find_iter(source_text)
        .map(|m| (m.start(), m.end()))
        .collect();
    match matches.last() {
        None => (source_text.to_string(), 0),
        Some(&(start, end)) => (replace_range(source_text, start, end, replacement), 1),
    }
}

// ---------------------------------------------------------------------------
// Post-replace capitalization
// ---------------------------------------------------------------------------

/// Restore capitalization after a replace changed a proper noun's case.
///
/// If the instruction is a replace command whose matched source target began
/// with an uppercase letter while the replacement is lowercase, capitalize
/// the replacement occurrences in `edited_output`.  Used on both the
/// deterministic path and model-edited output.
pub fn apply_post_replace_capitalization(
    source_text: &str,
    instruction_text: &str,
    edited_output: &str,
) -> String {
    let analysis = analyze_instruction(instruction_text);
    let Some(parsed) = parse_command(&analysis.normalized_instruction) else {
        return edited_output.to_string();
    };
    if parsed.kind != CommandKind::ReplaceTerm {
        return edited_output.to_string();
    }
    let (Some(target), Some(replacement)) = (parsed.target, parsed.replacement) else {
        return edited_output.to_string();
    };
    fix_post_replace_capitalization(source_text, &target, &replacement, edited_output)
}

fn fix_post_replace_capitalization(
    source_text: &str,
    target: &str,
    replacement: &str,
    edited_output: &str,
) -> String {
    let replacement_is_lowercase = replacement
        .chars()
        .next()
        .is_some_and(|c| c.is_lowercase());
    if !replacement_is_lowercase {
        return edited_output.to_string();
    }

    let target_matcher = target_regex(target);
    let matched_capitalized = target_matcher
        .find_iter(source_text)
        .any(|m| m.as_str().chars().next().is_some_and(|c| c.is_uppercase()));
    if !matched_capitalized {
        return edited_output.to_string();
    }

    let capitalized = capitalize_first(replacement);
    // Case-sensitive match so already-capitalized occurrences stay put.
    let escaped = regex::escape(replacement);
    let pattern = if SINGLE_TOKEN.is_match(replacement) {
        format!(r"\b{escaped}\b")
    } else {
        escaped
    };
    let matcher = Regex::new(&pattern).expect("escaped replacement pattern is always valid");
    matcher
        .replace_all(edited_output, regex::NoExpand(capitalized.as_str()))
        .into_owned()
}

fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    }
}

// ---------------------------------------------------------------------------
// Edited-text cleanup
// ---------------------------------------------------------------------------

fn cleanup_edited_text(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }
    let step = SPACE_BEFORE_PUNCTUATION.replace_all(text, "$1");
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

    // ---- clear-all ---

    #[test]
    fn clear_all_supports_verb_variants() {
        let source = "Buy milk and eggs";
        for instruction in [
            "clear everything",
            "remove all",
            "delete everything",
            "erase everything",
            "wipe everything",
            "get rid of everything",
            "take out everything",
            "cut all",
            "cut everything",
            "erase the whole message",
            "start over",
            "undo",
        ] {
            let result = try_apply_deterministic_edit(source, instruction)
                .unwrap_or_else(|| panic!("expected clear-all for {instruction:?}"));
            assert_eq!(result.output, "");
            assert_eq!(result.command_kind, CommandKind::ClearAll);
            assert_eq!(result.scope, CommandScope::All);
            assert_eq!(result.matched_count, 1);
            assert!(!result.no_match_detected);
        }
    }

    #[test]
    fn clear_all_returns_blank_with_delete_all_intent() {
        let result = try_apply_deterministic_edit("buy milk and eggs", "clear everything")
            .expect("clear-all should parse");
        assert_eq!(result.output, "");
        assert_eq!(result.intent, EditIntent::DeleteAll);
        assert!(result.applied);
        assert_eq!(result.matched_count, 1);
    }

    // ---- delete ---

    #[test]
    fn delete_term_supports_verb_variants() {
        let source = "buy milk next week";
        for (instruction, expected) in [
            ("delete milk", "buy next week"),
            ("remove the word milk", "buy next week"),
            ("take out \"next week\"", "buy milk"),
            ("get rid of milk", "buy next week"),
            ("cut milk", "buy next week"),
            ("undo milk", "buy next week"),
        ] {
            let result = try_apply_deterministic_edit(source, instruction)
                .unwrap_or_else(|| panic!("expected delete for {instruction:?}"));
            assert_eq!(result.output, expected, "for {instruction:?}");
        }
    }

    #[test]
    fn delete_supports_multiple_targets() {
        let result = try_apply_deterministic_edit("buy apple eggs milk bread", "remove eggs and milk")
            .expect("multi-target delete should parse");
        assert_eq!(result.output, "buy apple bread");
        assert_eq!(result.matched_count, 2);
    }

    #[test]
    fn delete_all_only_verbs_do_not_accept_targets() {
        let source = "buy milk and eggs";
        assert!(try_apply_deterministic_edit(source, "reset milk").is_none());
        assert!(try_apply_deterministic_edit(source, "start over milk").is_none());
    }

    #[test]
    fn delete_scope_first_and_last() {
        let source = "milk bread milk eggs milk";

        let first = try_apply_deterministic_edit(source, "delete first milk")
            .expect("first-scoped delete should parse");
        assert_eq!(first.output, "bread milk eggs milk");
        assert_eq!(first.scope, CommandScope::First);
        assert_eq!(first.matched_count, 1);

        let last = try_apply_deterministic_edit(source, "delete last milk")
            .expect("last-scoped delete should parse");
        assert_eq!(last.output, "milk bread milk eggs");
        assert_eq!(last.scope, CommandScope::Last);
        assert_eq!(last.matched_count, 1);
    }

    #[test]
    fn single_token_targets_match_whole_words_only() {
        let result = try_apply_deterministic_edit("the cat scattered", "delete cat")
            .expect("delete should parse");
        assert_eq!(result.output, "the scattered");
        assert_eq!(result.matched_count, 1);
    }

    // ---- replace ---

    #[test]
    fn replace_term_supports_verb_variants() {
        let source = "buy milk and bread";
        for instruction in [
            "change milk to oat milk",
            "swap milk for oat milk",
            "substitute milk with oat milk",
            "correct milk to oat milk",
            "fix milk to oat milk",
            "update milk to oat milk",
            "use oat milk instead of milk",
        ] {
            let result = try_apply_deterministic_edit(source, instruction)
                .unwrap_or_else(|| panic!("expected replace for {instruction:?}"));
            assert_eq!(result.output, "buy oat milk and bread", "for {instruction:?}");
        }
    }

    #[test]
    fn replace_scope_first_and_last() {
        let source = "milk bread milk eggs milk";

        let first = try_apply_deterministic_edit(source, "replace first milk with oat")
            .expect("first-scoped replace should parse");
        assert_eq!(first.output, "oat bread milk eggs milk");
        assert_eq!(first.scope, CommandScope::First);

        let last = try_apply_deterministic_edit(source, "replace last milk with oat")
            .expect("last-scoped replace should parse");
        assert_eq!(last.output, "milk bread milk eggs oat");
        assert_eq!(last.scope, CommandScope::Last);
    }

    #[test]
    fn replace_supports_polite_natural_language_form() {
        let result = try_apply_deterministic_edit(
            "Hey guys. This is Mario speaking.",
            "can you replace the word guys with the word girls?",
        )
        .expect("polite replace should parse");
        assert_eq!(result.output, "Hey girls. This is Mario speaking.");
        assert_eq!(result.command_kind, CommandKind::ReplaceTerm);
        assert_eq!(result.scope, CommandScope::All);
        assert_eq!(result.matched_count, 1);
    }

    #[test]
    fn replace_capitalizes_replacement_when_target_was_capitalized() {
        let result = try_apply_deterministic_edit(
            "Hey Mia, can you review this?",
            "replace Mia with john",
        )
        .expect("replace should parse");
        assert_eq!(result.output, "Hey John, can you review this?");
    }

    // ---- update number ---

    #[test]
    fn update_number_replaces_last_number_token() {
        let result = try_apply_deterministic_edit(
            "Meeting moved from 5:00 PM to 6:00 PM tomorrow.",
            "update number to 6:30",
        )
        .expect("update-number should parse");
        assert_eq!(result.output, "Meeting moved from 5:00 PM to 6:30 tomorrow.");
        assert_eq!(result.command_kind, CommandKind::UpdateNumber);
        assert_eq!(result.matched_count, 1);
    }

    #[test]
    fn update_number_without_numeric_tokens_reports_no_match() {
        let result = try_apply_deterministic_edit("Pickup is at gate B twelve.", "change the time to 6:30")
            .expect("update-number should parse");
        assert_eq!(result.matched_count, 0);
        assert!(result.no_match_detected);
        assert_eq!(result.rule_confidence, RuleConfidence::Low);
    }

    // ---- no-op ---

    #[test]
    fn no_op_commands_keep_source_unchanged() {
        let source = "Please buy milk and eggs.";
        for instruction in [
            "nevermind",
            "actually never mind",
            "just never mind",
            "cancel",
            "cancel that",
            "forget it",
            "ignore that",
            "disregard that",
        ] {
            let result = try_apply_deterministic_edit(source, instruction)
                .unwrap_or_else(|| panic!("expected no-op for {instruction:?}"));
            assert_eq!(result.output, source);
            assert!(!result.applied);
            assert_eq!(result.command_kind, CommandKind::NoOp);
            assert!(!result.no_match_detected);
        }
    }

    // ---- no-match / rejection ---

    #[test]
    fn no_match_reports_metadata() {
        let source = "Please buy milk and eggs.";
        let result = try_apply_deterministic_edit(source, "replace bread with rice")
            .expect("replace should parse");
        assert_eq!(result.output, source);
        assert!(!result.applied);
        assert_eq!(result.matched_count, 0);
        assert!(result.no_match_detected);
        assert_eq!(result.rule_confidence, RuleConfidence::Low);
    }

    #[test]
    fn rejects_ambiguous_pronoun_targets() {
        let source = "Please buy milk and eggs.";
        assert!(try_apply_deterministic_edit(source, "delete it").is_none());
        assert!(try_apply_deterministic_edit(source, "change that to bread").is_none());
    }

    #[test]
    fn rejects_long_instructions_by_command_gate() {
        let result = try_apply_deterministic_edit(
            "Please buy milk and eggs.",
            "please delete the word milk from the message and then rewrite the rest politely",
        );
        assert!(result.is_none());
    }

    #[test]
    fn returns_none_for_general_instructions() {
        assert!(try_apply_deterministic_edit("Please buy milk and eggs.", "make this friendlier")
            .is_none());
        assert!(try_apply_deterministic_edit("Buy rice and chicken.", "add yogurt").is_none());
    }

    #[test]
    fn returns_none_for_blank_inputs() {
        assert!(try_apply_deterministic_edit("", "delete milk").is_none());
        assert!(try_apply_deterministic_edit("buy milk", "   ").is_none());
    }

    // ---- post-replace capitalization ---

    #[test]
    fn post_replace_capitalization_fixes_model_output() {
        let output = apply_post_replace_capitalization(
            "Hey Mia, can you review this?",
            "replace Mia with john",
            "Hey john, can you review this?",
        );
        assert_eq!(output, "Hey John, can you review this?");
    }

    #[test]
    fn post_replace_capitalization_leaves_non_replace_instructions_alone() {
        let output = apply_post_replace_capitalization(
            "Hey Mia, can you review this?",
            "delete Mia",
            "Hey, can you review this?",
        );
        assert_eq!(output, "Hey, can you review this?");
    }

    #[test]
    fn post_replace_capitalization_respects_lowercase_targets() {
        let output = apply_post_replace_capitalization(
            "hey mia, can you review this?",
            "replace mia with john",
            "hey john, can you review this?",
        );
        assert_eq!(output, "hey john, can you review this?");
    }

    // ---- cleanup ---

    #[test]
    fn cleanup_collapses_spaces_and_newlines() {
        assert_eq!(cleanup_edited_text("a  b ,  c"), "a b, c");
        assert_eq!(cleanup_edited_text("a \n b\n\n\n\nc"), "a\nb\n\nc");
        assert_eq!(cleanup_edited_text("   "), "");
    }
}
