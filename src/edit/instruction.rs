//! Instruction interpretation — spoken edit commands into structured form.
//!
//! Three layers, from loose to strict:
//! * [`analyze_instruction`] — normalizes an instruction (whitespace,
//!   correction turns, command preamble) and classifies its coarse
//!   [`EditIntent`].
//! * [`is_strict_edit_command`] — the start-anchored gate deciding whether an
//!   utterance edits existing text at all, versus appending new dictation.
//!   Deliberately narrower than intent classification: a casual "replace"
//!   inside a longer sentence must not trigger edit mode.
//! * [`parse_command`] — turns a normalized instruction into a
//!   [`ParsedCommand`] for deterministic execution.  Five parsers run
//!   (no-op, clear-all, delete, replace, update-number) and the parse
//!   succeeds only when exactly one matches; ambiguity and no-match both
//!   yield `None`.

use std::sync::LazyLock;

use regex::Regex;

use crate::rules::compose;

// ---------------------------------------------------------------------------
// EditIntent / CommandScope / CommandKind
// ---------------------------------------------------------------------------

/// Coarse classification of an edit instruction.
///
/// Drives whether blank output is permitted and which prompt variant the
/// model stage uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditIntent {
    General,
    DeleteAll,
    Replace,
}

impl EditIntent {
    /// Stable uppercase tag used in prompts and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            EditIntent::General => "GENERAL",
            EditIntent::DeleteAll => "DELETE_ALL",
            EditIntent::Replace => "REPLACE",
        }
    }
}

/// Which occurrence(s) of a matched target a command affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandScope {
    All,
    First,
    Last,
}

/// The executable operation shape of a parsed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Conversational cancellation ("never mind", "cancel that") — source
    /// text is left untouched.
    NoOp,
    ClearAll,
    DeleteTerm,
    ReplaceTerm,
    UpdateNumber,
}

impl CommandKind {
    /// Stable lowercase label used in pipeline diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            CommandKind::NoOp => "no_op",
            CommandKind::ClearAll => "clear_all",
            CommandKind::DeleteTerm => "delete_term",
            CommandKind::ReplaceTerm => "replace_term",
            CommandKind::UpdateNumber => "update_number",
        }
    }
}

// ---------------------------------------------------------------------------
// InstructionAnalysis / ParsedCommand
// ---------------------------------------------------------------------------

/// Result of [`analyze_instruction`].
#[derive(Debug, Clone, PartialEq)]
pub struct InstructionAnalysis {
    /// Whitespace-collapsed, correction-resolved, preamble-stripped form.
    pub normalized_instruction: String,
    pub intent: EditIntent,
}

/// A fully-resolved, immutable description of what to do.
///
/// `target`/`replacement` are absent only for [`CommandKind::NoOp`] and
/// [`CommandKind::ClearAll`] (and `target` for `UpdateNumber`, which always
/// addresses the last numeric token).
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCommand {
    pub kind: CommandKind,
    pub scope: CommandScope,
    pub target: Option<String>,
    pub replacement: Option<String>,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

const MAX_COMMAND_WORDS: usize = 10;
const MAX_COMMAND_CHARS: usize = 96;

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\p{L}[\p{L}\p{N}'’-]*").expect("invalid word pattern"));

static COMMAND_PREAMBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:okay|ok|hey)\s+)?(?:(?:can|could|would|will)\s+you\s+)?(?:please\s+)?")
        .expect("invalid preamble pattern")
});

static NO_OP_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(?:actually|just|okay|ok)\s+)?(?:never\s*mind|cancel(?:\s+(?:that|it))?|forget\s+(?:it|that)|ignore\s+that|disregard\s+that)\s*$",
    )
    .expect("invalid no-op pattern")
});

static CLEAR_ALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:please\s+)?(?:(?:delete|clear|erase|wipe|remove|reset|cut|take\s+out|get\s+rid\s+of)\s+(?:all|everything|(?:the\s+)?(?:whole|entire)\s+(?:message|text)|(?:the\s+)?message|(?:the\s+)?text)|start\s+over|undo)\s*$",
    )
    .expect("invalid clear-all pattern")
});

static DELETE_ALL_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:delete|clear|remove|erase|wipe|reset|start\s+over|scratch)\b.*\b(?:all|everything|whole|entire|start\s+over)\b|(?i)^\s*undo\s*$",
    )
    .expect("invalid delete-all intent pattern")
});

static DELETE_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:please\s+)?(?:(?:delete|remove|erase|drop|cut|undo)\s+(.+?)|take\s+out\s+(.+?)|get\s+rid\s+of\s+(.+?))\s*$",
    )
    .expect("invalid delete command pattern")
});

static REPLACE_INTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:please\s+)?(?:(?:replace|change|swap|substitute|update|correct|fix)\s+.+\s+(?:with|to|for)\s+.+|use\s+.+\s+instead\s+of\s+.+)$",
    )
    .expect("invalid replace intent pattern")
});

static REPLACE_DIRECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:please\s+)?(?:replace|change|swap|substitute|update|correct|fix)\s+(.+?)\s+(?:with|to|for)\s+(.+?)\s*$",
    )
    .expect("invalid replace direct pattern")
});

static REPLACE_USE_INSTEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:please\s+)?use\s+(.+?)\s+instead\s+of\s+(.+?)\s*$")
        .expect("invalid use-instead pattern")
});

static UPDATE_NUMBER_COMMAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:please\s+)?(?:update|change|set)\s+(?:the\s+)?(?:number|time|value|amount|it)?\s*(?:to|with)\s+(.+?)\s*$",
    )
    .expect("invalid update-number pattern")
});

static DELETE_ALL_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:all|everything|(?:the\s+)?(?:whole|entire)\s+(?:message|text)|(?:the\s+)?message|(?:the\s+)?text)$",
    )
    .expect("invalid delete-all target pattern")
});

static REPLACE_CORRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:please\s+)?replace\s+(.+?)\s+with\s+(.+?)\s*(?:,?\s*(?:no|actually|instead|wait)\s*,?\s*(?:let'?s\s+do|make\s+it|use)?\s+(.+))\s*$",
    )
    .expect("invalid replace correction pattern")
});

static GENERAL_CORRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*.+?\s+(?:no|actually|instead|rather|wait)\s*,?\s*(?:let'?s\s+do|make\s+it|use)?\s+(.+?)\s*$",
    )
    .expect("invalid general correction pattern")
});

static INSTEAD_OF_PHRASE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\binstead\s+of\b").expect("invalid instead-of pattern"));

static DELETE_CONTEXT_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:from\s+(?:the\s+)?(?:message|text)|in\s+(?:the\s+)?(?:message|text)|from\s+it)$")
        .expect("invalid context suffix pattern")
});

static SCOPED_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:only\s+)?(?:first|last|final)\s+").expect("invalid scope prefix pattern")
});

static SCOPED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s+(?:only\s+first|first|last|final)$").expect("invalid scope suffix pattern")
});

static SCOPE_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:only\s+first|first)\b").expect("invalid first pattern"));

static SCOPE_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:last|final)\b").expect("invalid last pattern"));

static AMBIGUOUS_PRONOUN_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:it|that|this|thing|part)$").expect("invalid pronoun pattern")
});

static ARTICLE_WORD_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:(?:the|a|an)\s+)?(?:word|phrase|term|text|token)\s+")
        .expect("invalid article prefix pattern")
});

static TRIM_POLITE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(?:please|pls|thanks|thank\s+you)$").expect("invalid polite suffix pattern")
});

// ---------------------------------------------------------------------------
// Analysis
// ---------------------------------------------------------------------------

/// Normalize an instruction and classify its coarse intent.
pub fn analyze_instruction(instruction_text: &str) -> InstructionAnalysis {
    let collapsed = WHITESPACE
        .replace_all(instruction_text, " ")
        .trim()
        .to_string();
    let normalized = normalize_correction_phrases(&collapsed);
    let command_candidate = strip_command_preamble(&normalized);
    let intent = if DELETE_ALL_INTENT.is_match(&command_candidate) {
        EditIntent::DeleteAll
    } else if REPLACE_INTENT.is_match(&command_candidate) {
        EditIntent::Replace
    } else {
        EditIntent::General
    };
    InstructionAnalysis {
        normalized_instruction: command_candidate,
        intent,
    }
}

/// Whether an utterance is an edit command at all (versus free dictation).
///
/// Requires the entire preamble-stripped string to fully match one command
/// grammar.  A casual "…maybe never mind this part" or "actually can we
/// replace milk with oat milk" stays `false`.
pub fn is_strict_edit_command(instruction_text: &str) -> bool {
    let collapsed = WHITESPACE
        .replace_all(instruction_text, " ")
        .trim()
        .to_string();
    if collapsed.is_empty() {
        return false;
    }
    let command_candidate = strip_command_preamble(&collapsed);
    if command_candidate.is_empty() {
        return false;
    }
    NO_OP_COMMAND.is_match(&command_candidate)
        || CLEAR_ALL.is_match(&command_candidate)
        || DELETE_COMMAND.is_match(&command_candidate)
        || REPLACE_DIRECT.is_match(&command_candidate)
        || REPLACE_USE_INSTEAD.is_match(&command_candidate)
        || UPDATE_NUMBER_COMMAND.is_match(&command_candidate)
}

/// Whether blank final output is legitimate for `intent`.
pub fn should_allow_blank_output(intent: EditIntent) -> bool {
    intent == EditIntent::DeleteAll
}

fn normalize_correction_phrases(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    // "replace X with Y no, make it Z" — keep the final correction Z.
    if let Some(caps) = REPLACE_CORRECTION.captures(text) {
        let from = caps[1].trim().to_string();
        let corrected_to = caps[3].trim().trim_end_matches(['.', '!']).to_string();
        if !from.is_empty() && !corrected_to.is_empty() {
            return format!("replace {from} with {corrected_to}");
        }
    }

    // "use X instead of Y" is a command, not a correction turn.
    if INSTEAD_OF_PHRASE.is_match(text) {
        return text.to_string();
    }

    // In-place corrections ("change to gate c3 no sorry gate c4").
    let resolved = compose::resolve_correction_turns(text);
    if resolved != text {
        return resolved;
    }

    // "… no/actually/wait, <corrected tail>" — keep the tail.
    if let Some(caps) = GENERAL_CORRECTION.captures(text) {
        let corrected_tail = caps[1].trim().to_string();
        if !corrected_tail.is_empty() {
            return corrected_tail;
        }
    }

    text.to_string()
}

fn strip_command_preamble(text: &str) -> String {
    let without_preamble = COMMAND_PREAMBLE
        .replace(text, "")
        .trim()
        .trim_end_matches('?')
        .trim()
        .to_string();
    if without_preamble.is_empty() {
        text.trim().to_string()
    } else {
        without_preamble
    }
}

// ---------------------------------------------------------------------------
// Command parsing
// ---------------------------------------------------------------------------

/// Gate against over-eager matching on long free-form speech.
pub(crate) fn passes_command_gate(normalized_instruction: &str) -> bool {
    normalized_instruction.len() <= MAX_COMMAND_CHARS
        && count_words(normalized_instruction) <= MAX_COMMAND_WORDS
}

/// Count word tokens (letters with trailing letters/digits/apostrophes).
pub(crate) fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

/// Parse a normalized instruction into an executable command.
///
/// Five parsers are attempted; the parse succeeds only when **exactly one**
/// matches.  Ambiguity (two or more) and no-match both return `None` — this
/// is a collect-then-count, not a fallthrough chain, so overlapping grammars
/// are detected rather than silently resolved.
pub fn parse_command(instruction: &str) -> Option<ParsedCommand> {
    let parsed: Vec<ParsedCommand> = [
        parse_no_op_command(instruction),
        parse_clear_all_command(instruction),
        parse_delete_command(instruction),
        parse_replace_command(instruction),
        parse_update_number_command(instruction),
    ]
    .into_iter()
    .flatten()
    .collect();
    if parsed.len() != 1 {
        return None;
    }
    parsed.into_iter().next()
}

fn parse_no_op_command(instruction: &str) -> Option<ParsedCommand> {
    if !NO_OP_COMMAND.is_match(instruction) {
        return None;
    }
    Some(ParsedCommand {
        kind: CommandKind::NoOp,
        scope: CommandScope::All,
        target: None,
        replacement: None,
    })
}

fn parse_clear_all_command(instruction: &str) -> Option<ParsedCommand> {
    if !CLEAR_ALL.is_match(instruction) {
        return None;
    }
    Some(ParsedCommand {
        kind: CommandKind::ClearAll,
        scope: CommandScope::All,
        target: None,
        replacement: None,
    })
}

fn parse_delete_command(instruction: &str) -> Option<ParsedCommand> {
    let caps = DELETE_COMMAND.captures(instruction)?;
    let raw_target = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))
        .map(|m| m.as_str())
        .unwrap_or_default();
    let scoped = scoped_target(raw_target)?;
    let target = normalize_command_term(&scoped.target, true);
    if target.is_empty() {
        return None;
    }
    if DELETE_ALL_TARGET.is_match(&target) {
        return None;
    }
    if is_ambiguous_pronoun_target(&target) {
        return None;
    }
    Some(ParsedCommand {
        kind: CommandKind::DeleteTerm,
        scope: scoped.scope,
        target: Some(target),
        replacement: None,
    })
}

fn parse_replace_command(instruction: &str) -> Option<ParsedCommand> {
    // "update number to 6:30" / "change the time to 6:30" belong to the
    // update-number parser; without this guard both grammars would match and
    // the ambiguity rule would reject a perfectly clear command.
    if UPDATE_NUMBER_COMMAND.is_match(instruction) {
        return None;
    }

    if let Some(caps) = REPLACE_DIRECT.captures(instruction) {
        let from_scoped = scoped_target(&caps[1])?;
        let from = normalize_command_term(&from_scoped.target, true);
        let to = normalize_replacement_term(&caps[2]);
        if from.is_empty() || to.is_empty() {
            return None;
        }
        if is_ambiguous_pronoun_target(&from) {
            return None;
        }
        return Some(ParsedCommand {
            kind: CommandKind::ReplaceTerm,
            scope: from_scoped.scope,
            target: Some(from),
            replacement: Some(to),
        });
    }

    let caps = REPLACE_USE_INSTEAD.captures(instruction)?;
    let from_scoped = scoped_target(&caps[2])?;
    let from = normalize_command_term(&from_scoped.target, true);
    let to = normalize_replacement_term(&caps[1]);
    if from.is_empty() || to.is_empty() {
        return None;
    }
    if is_ambiguous_pronoun_target(&from) {
        return None;
    }
    Some(ParsedCommand {
        kind: CommandKind::ReplaceTerm,
        scope: from_scoped.scope,
        target: Some(from),
        replacement: Some(to),
    })
}

fn parse_update_number_command(instruction: &str) -> Option<ParsedCommand> {
    let caps = UPDATE_NUMBER_COMMAND.captures(instruction)?;
    let replacement = normalize_replacement_term(&caps[1]);
    if replacement.is_empty() {
        return None;
    }
    Some(ParsedCommand {
        kind: CommandKind::UpdateNumber,
        scope: CommandScope::Last,
        target: None,
        replacement: Some(replacement),
    })
}

// ---------------------------------------------------------------------------
// Target normalization
// ---------------------------------------------------------------------------

struct ScopedTarget {
    scope: CommandScope,
    target: String,
}

/// Strip context/article noise from a raw target and extract the scope.
///
/// "first milk" → FIRST + "milk"; presence of both first and last cues
/// invalidates the parse.
fn scoped_target(raw: &str) -> Option<ScopedTarget> {
    let mut target = raw.trim().to_string();
    target = DELETE_CONTEXT_SUFFIX.replace(&target, "").into_owned();
    target = ARTICLE_WORD_PREFIX.replace(&target, "").into_owned();
    let target = target.trim();
    if target.is_empty() {
        return None;
    }

    let has_first = SCOPE_FIRST.is_match(target);
    let has_last = SCOPE_LAST.is_match(target);
    if has_first && has_last {
        return None;
    }
    let scope = if has_first {
        CommandScope::First
    } else if has_last {
        CommandScope::Last
    } else {
        CommandScope::All
    };

    let stripped = SCOPED_PREFIX.replace(target, "").into_owned();
    let stripped = SCOPED_SUFFIX.replace(&stripped, "").into_owned();
    let stripped = stripped.trim().to_string();
    if stripped.is_empty() {
        return None;
    }
    Some(ScopedTarget {
        scope,
        target: stripped,
    })
}

pub(crate) fn normalize_command_term(raw: &str, strip_article_word_prefix: bool) -> String {
    let mut term = raw.trim().to_string();
    term = TRIM_POLITE_SUFFIX.replace(&term, "").into_owned();
    term = strip_wrapping_quotes(&term);
    if strip_article_word_prefix {
        term = ARTICLE_WORD_PREFIX.replace(&term, "").into_owned();
    }
    term.trim()
        .trim_end_matches(['.', ',', ';', '!', '?', ':'])
        .trim()
        .to_string()
}

fn normalize_replacement_term(raw: &str) -> String {
    let mut term = raw.trim().to_string();
    term = TRIM_POLITE_SUFFIX.replace(&term, "").into_owned();
    term = strip_wrapping_quotes(&term);
    term = ARTICLE_WORD_PREFIX.replace(&term, "").into_owned();
    term.trim()
        .trim_end_matches(['.', ',', ';', '!', '?', ':'])
        .trim()
        .to_string()
}

fn is_ambiguous_pronoun_target(target: &str) -> bool {
    AMBIGUOUS_PRONOUN_TARGET.is_match(target.trim())
}

fn strip_wrapping_quotes(text: &str) -> String {
    let value = text.trim();
    if value.chars().count() < 2 {
        return value.to_string();
    }
    const PAIRS: &[(char, char)] = &[
        ('"', '"'),
        ('\'', '\''),
        ('“', '”'),
        ('‘', '’'),
        ('`', '`'),
    ];
    let first = value.chars().next().unwrap_or_default();
    let last = value.chars().last().unwrap_or_default();
    for (start, end) in PAIRS {
        if first == *start && last == *end {
            let inner: String = {
                let mut chars: Vec<char> = value.chars().collect();
                chars.remove(0);
                chars.pop();
                chars.into_iter().collect()
            };
            return inner.trim().to_string();
        }
    }
    value.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- analyze_instruction ---

    #[test]
    fn detects_delete_all_phrases() {
        assert_eq!(
            analyze_instruction("delete all").intent,
            EditIntent::DeleteAll
        );
        assert_eq!(
            analyze_instruction("clear everything please").intent,
            EditIntent::DeleteAll
        );
        assert_eq!(
            analyze_instruction("remove the whole message").intent,
            EditIntent::DeleteAll
        );
        assert_eq!(analyze_instruction("undo").intent, EditIntent::DeleteAll);
    }

    #[test]
    fn detects_replace_intent() {
        let result = analyze_instruction("replace milk with oat milk");
        assert_eq!(result.intent, EditIntent::Replace);
        assert_eq!(result.normalized_instruction, "replace milk with oat milk");
    }

    #[test]
    fn defaults_to_general_intent() {
        assert_eq!(
            analyze_instruction("make this friendlier").intent,
            EditIntent::General
        );
    }

    #[test]
    fn prefers_final_correction_for_replace() {
        let result = analyze_instruction("replace milk with oat milk no, make it almond milk");
        assert_eq!(result.intent, EditIntent::Replace);
        assert_eq!(
            result.normalized_instruction,
            "replace milk with almond milk"
        );
    }

    #[test]
    fn resolves_in_place_correction_turns() {
        let result = analyze_instruction("change to gate c3 no sorry gate c4");
        assert_eq!(result.normalized_instruction, "change to gate c4");
    }

    #[test]
    fn strips_command_preamble() {
        let result = analyze_instruction("okay can you please delete milk");
        assert_eq!(result.normalized_instruction, "delete milk");
    }

    // ---- is_strict_edit_command ---

    #[test]
    fn strict_accepts_anchored_commands() {
        assert!(is_strict_edit_command("replace milk with oat milk"));
        assert!(is_strict_edit_command("fix milk to oat milk"));
        assert!(is_strict_edit_command("please remove milk"));
        assert!(is_strict_edit_command("actually never mind"));
        assert!(is_strict_edit_command("undo"));
        assert!(is_strict_edit_command("update number to 6:30"));
        assert!(is_strict_edit_command(
            "can you replace the word guys with the word girls?"
        ));
    }

    #[test]
    fn strict_rejects_casual_mentions() {
        assert!(!is_strict_edit_command(
            "actually can we replace milk with oat milk"
        ));
        assert!(!is_strict_edit_command("hey maybe never mind this part"));
        assert!(!is_strict_edit_command("scratch that"));
        assert!(!is_strict_edit_command("make this professional"));
        assert!(!is_strict_edit_command(""));
        assert!(!is_strict_edit_command("   "));
    }

    // ---- should_allow_blank_output ---

    #[test]
    fn blank_output_only_for_delete_all() {
        assert!(should_allow_blank_output(EditIntent::DeleteAll));
        assert!(!should_allow_blank_output(EditIntent::Replace));
        assert!(!should_allow_blank_output(EditIntent::General));
    }

    // ---- parse_command ---

    #[test]
    fn parses_clear_all_variants() {
        for instruction in [
            "clear everything",
            "remove all",
            "erase the whole message",
            "start over",
            "undo",
            "cut all",
            "get rid of everything",
            "take out everything",
        ] {
            let parsed = parse_command(instruction)
                .unwrap_or_else(|| panic!("expected clear-all parse for {instruction:?}"));
            assert_eq!(parsed.kind, CommandKind::ClearAll);
            assert_eq!(parsed.scope, CommandScope::All);
        }
    }

    #[test]
    fn parses_no_op_variants() {
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
            let parsed = parse_command(instruction)
                .unwrap_or_else(|| panic!("expected no-op parse for {instruction:?}"));
            assert_eq!(parsed.kind, CommandKind::NoOp);
        }
    }

    #[test]
    fn parses_delete_with_scope() {
        let parsed = parse_command("delete first milk").expect("delete should parse");
        assert_eq!(parsed.kind, CommandKind::DeleteTerm);
        assert_eq!(parsed.scope, CommandScope::First);
        assert_eq!(parsed.target.as_deref(), Some("milk"));
    }

    #[test]
    fn parses_delete_with_quoted_target() {
        let parsed = parse_command("take out \"next week\"").expect("delete should parse");
        assert_eq!(parsed.target.as_deref(), Some("next week"));
    }

    #[test]
    fn conflicting_scope_cues_invalidate_the_parse() {
        assert!(parse_command("delete first last milk").is_none());
    }

    #[test]
    fn parses_replace_and_use_instead() {
        let direct = parse_command("replace milk with oat milk").expect("replace should parse");
        assert_eq!(direct.kind, CommandKind::ReplaceTerm);
        assert_eq!(direct.target.as_deref(), Some("milk"));
        assert_eq!(direct.replacement.as_deref(), Some("oat milk"));

        let use_instead =
            parse_command("use oat milk instead of milk").expect("use-instead should parse");
        assert_eq!(use_instead.kind, CommandKind::ReplaceTerm);
        assert_eq!(use_instead.target.as_deref(), Some("milk"));
        assert_eq!(use_instead.replacement.as_deref(), Some("oat milk"));
    }

    #[test]
    fn parses_update_number_forms() {
        let update = parse_command("update number to 6:30").expect("update should parse");
        assert_eq!(update.kind, CommandKind::UpdateNumber);
        assert_eq!(update.scope, CommandScope::Last);
        assert_eq!(update.replacement.as_deref(), Some("6:30"));

        let change = parse_command("change the time to 6:30").expect("change should parse");
        assert_eq!(change.kind, CommandKind::UpdateNumber);
    }

    #[test]
    fn rejects_ambiguous_pronoun_targets() {
        assert!(parse_command("delete it").is_none());
        assert!(parse_command("change that to bread").is_none());
    }

    #[test]
    fn rejects_delete_all_like_targets_in_delete_parser() {
        // "reset milk" / "start over milk" fit no grammar at all.
        assert!(parse_command("reset milk").is_none());
        assert!(parse_command("start over milk").is_none());
    }

    #[test]
    fn rejects_general_instructions() {
        assert!(parse_command("make this friendlier").is_none());
        assert!(parse_command("add yogurt").is_none());
    }

    // ---- command gate ---

    #[test]
    fn command_gate_limits_length() {
        assert!(passes_command_gate("delete milk"));
        assert!(!passes_command_gate(
            "please delete the word milk from the message and then rewrite the rest politely"
        ));
        let long: String = "x".repeat(97);
        assert!(!passes_command_gate(&long));
    }

    // ---- term normalization ---

    #[test]
    fn strips_polite_suffix_and_punctuation() {
        assert_eq!(normalize_command_term("milk please", true), "milk");
        assert_eq!(normalize_command_term("milk, ", true), "milk");
    }

    #[test]
    fn strips_article_word_type_prefix() {
        assert_eq!(normalize_command_term("the word guys", true), "guys");
        assert_eq!(normalize_command_term("a phrase next week", true), "next week");
    }

    #[test]
    fn unwraps_matching_quote_pairs() {
        assert_eq!(strip_wrapping_quotes("\"next week\""), "next week");
        assert_eq!(strip_wrapping_quotes("'milk'"), "milk");
        assert_eq!(strip_wrapping_quotes("“milk”"), "milk");
        // Mismatched pair stays untouched.
        assert_eq!(strip_wrapping_quotes("\"milk'"), "\"milk'");
    }
}
