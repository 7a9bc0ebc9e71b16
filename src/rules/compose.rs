//! Compose normalizer — the pre-model deterministic pass for fresh dictation.
//!
//! Applies safe, narrow transformations before any model call:
//! fillers, immediately-repeated words, "min"/"mins" units, spoken
//! self-corrections ("at five no six"), number words, and surface cleanup.
//! Each rule is recorded in the result so the pipeline can report which
//! local rules fired.
//!
//! Rule order matters: correction turns must resolve after filler/duplicate
//! removal but before number conversion, so a corrected number phrase is
//! still eligible for digit conversion.
//!
//! Also hosts the compose-model gate: after the normalizer has run, the
//! model is only worth invoking when the rules changed nothing but the
//! transcript still carries a small number of typo signals.

use std::sync::LazyLock;

use regex::Regex;

use crate::rules::numbers;

// ---------------------------------------------------------------------------
// Rule / ComposeOutcome
// ---------------------------------------------------------------------------

/// A named local rule applied by [`rewrite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Filler,
    AdjacentDuplicate,
    MinutesNormalization,
    CorrectionTurn,
    NumberWordsToDigits,
}

impl Rule {
    /// Stable lowercase label used in pipeline diagnostics.
    pub fn label(&self) -> &'static str {
        match self {
            Rule::Filler => "filler",
            Rule::AdjacentDuplicate => "adjacent_duplicate",
            Rule::MinutesNormalization => "minutes_normalization",
            Rule::CorrectionTurn => "correction_turn",
            Rule::NumberWordsToDigits => "number_words_to_digits",
        }
    }
}

/// Result of the compose normalizer.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeOutcome {
    /// The cleaned text.
    pub text: String,
    /// Whether `text` differs from the trimmed input.
    pub changed: bool,
    /// Which named rules changed the text, in application order.
    pub applied_rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// Patterns
// ---------------------------------------------------------------------------

static FILLER_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:um+|uh+|erm+|emm+|hmm+)\b").expect("invalid filler pattern")
});

static WORD_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}']+").expect("invalid word token pattern"));

static MINUTES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmins?\b").expect("invalid minutes pattern"));

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("invalid whitespace pattern"));

static HAS_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d").expect("invalid digit pattern"));

// "<preposition> X , no/actually/… [<preposition>] Y" → "<preposition> Y"
static PREPOSITION_CORRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(to|at|on|for|in|after|before|around|about)\s+([\p{L}\p{N}:.'-]+(?:\s+[\p{L}\p{N}:.'-]+){0,3})\s*(?:,\s*)?(?:no|actually|sorry|rather|instead|i\s+mean)\s+(?:(?:to|at|on|for|in|after|before|around|about)\s+)?([\p{L}\p{N}:.'-]+(?:\s+[\p{L}\p{N}:.'-]+){0,3})",
    )
    .expect("invalid preposition correction pattern")
});

// "X , no/actually/… Y" → "Y", gated by is_likely_correction_value.  The
// trailing delimiter is captured and re-emitted rather than asserted.
static GENERIC_CORRECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b([\p{L}\p{N}:.'-]+(?:\s+[\p{L}\p{N}:.'-]+){0,2})\s*(?:,\s*)?(?:no|actually|sorry|rather|instead|i\s+mean)\s+([\p{L}\p{N}:.'-]+(?:\s+[\p{L}\p{N}:.'-]+){0,2})(\s*(?:[.!?,;:]|$))",
    )
    .expect("invalid generic correction pattern")
});

static SPACE_BEFORE_PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+([,.;!?])").expect("invalid punctuation pattern"));

static DUPLICATE_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*,+").expect("invalid duplicate comma pattern"));

static ORPHAN_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([.!?]|$)").expect("invalid orphan comma pattern"));

static MULTI_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" {2,}").expect("invalid multi space pattern"));

// ---------------------------------------------------------------------------
// rewrite
// ---------------------------------------------------------------------------

/// Run the full deterministic compose pass over a raw transcript.
pub fn rewrite(input: &str) -> ComposeOutcome {
    let source = input.trim();
    if source.is_empty() {
        return ComposeOutcome {
            text: String::new(),
            changed: false,
            applied_rules: Vec::new(),
        };
    }

    let mut current = source.to_string();
    let mut applied = Vec::new();

    let no_fillers = remove_standalone_fillers(&current);
    if no_fillers != current {
        applied.push(Rule::Filler);
        current = no_fillers;
    }

    let no_duplicates = remove_adjacent_duplicate_words(&current);
    if no_duplicates != current {
        applied.push(Rule::AdjacentDuplicate);
        current = no_duplicates;
    }

    let normalized_minutes = MINUTES.replace_all(&current, "minutes").into_owned();
    if normalized_minutes != current {
        applied.push(Rule::MinutesNormalization);
        current = normalized_minutes;
    }

    let resolved = resolve_correction_turns(&current);
    if resolved != current {
        applied.push(Rule::CorrectionTurn);
        current = resolved;
    }

    let normalized_numbers = numbers::normalize_number_words(&current);
    if normalized_numbers != current {
        applied.push(Rule::NumberWordsToDigits);
        current = normalized_numbers;
    }

    let final_text = normalize_surface(&current);
    let changed = final_text != source;
    if changed {
        log::debug!(
            "compose rules changed transcript ({} rule(s) applied)",
            applied.len()
        );
    }
    ComposeOutcome {
        text: final_text,
        changed,
        applied_rules: applied,
    }
}

fn remove_standalone_fillers(text: &str) -> String {
    FILLER_TOKEN.replace_all(text, " ").into_owned()
}

/// Collapse immediately-adjacent duplicate words (case-insensitive).
///
/// Single left-to-right pass; a run of repeats collapses to its first
/// occurrence because each repeat is compared against the kept token.
fn remove_adjacent_duplicate_words(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_end = 0;
    let mut prev_token: Option<String> = None;

    for m in WORD_TOKEN.find_iter(text) {
        let gap = &text[last_end..m.start()];
        let lowered = m.as_str().to_lowercase();
        let is_duplicate = prev_token.as_deref() == Some(lowered.as_str())
            && !gap.is_empty()
            && gap.chars().all(char::is_whitespace);
        if is_duplicate {
            last_end = m.end();
            continue;
        }
        out.push_str(gap);
        out.push_str(m.as_str());
        prev_token = Some(lowered);
        last_end = m.end();
    }
    out.push_str(&text[last_end..]);
    out
}

/// Repeatedly resolve "<preposition> X no/actually/… Y" and guarded
/// "X no/actually/… Y" self-corrections until the text is stable.
///
/// Shared with instruction analysis: a spoken edit instruction can carry the
/// same correction turns as fresh dictation.
pub(crate) fn resolve_correction_turns(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let mut pass_changed = false;

        let preposition_resolved = PREPOSITION_CORRECTION
            .replace_all(&current, |caps: &regex::Captures| {
                let resolved = format!("{} {}", &caps[1], &caps[3]);
                if resolved != caps[0] {
                    pass_changed = true;
                }
                resolved
            })
            .into_owned();
        current = preposition_resolved;

        let generic_resolved = GENERIC_CORRECTION
            .replace_all(&current, |caps: &regex::Captures| {
                let old_value = &caps[1];
                let replacement = &caps[2];
                if !is_likely_correction_value(old_value, replacement) {
                    return caps[0].to_string();
                }
                pass_changed = true;
                format!("{}{}", replacement, &caps[3])
            })
            .into_owned();
        current = generic_resolved;

        if !pass_changed {
            return current;
        }
    }
}

/// Anti-false-positive guard for the generic correction form.
///
/// Ordinary prose contains "no" constantly; only treat "X no Y" as a
/// correction when X and Y look like short corrected values: they differ,
/// each is at most 36 chars, and at least one of them carries a digit or a
/// cardinal number word — or both are at most two words long.
fn is_likely_correction_value(old_value: &str, replacement: &str) -> bool {
    if old_value.eq_ignore_ascii_case(replacement) {
        return false;
    }
    let old_trimmed = old_value.trim();
    let replacement_trimmed = replacement.trim();
    if old_trimmed.is_empty() || replacement_trimmed.is_empty() {
        return false;
    }
    if old_trimmed.len() > 36 || replacement_trimmed.len() > 36 {
        return false;
    }
    if HAS_DIGIT.is_match(old_trimmed) || HAS_DIGIT.is_match(replacement_trimmed) {
        return true;
    }
    if numbers::contains_cardinal_word(old_trimmed)
        || numbers::contains_cardinal_word(replacement_trimmed)
    {
        return true;
    }
    word_count(old_trimmed) <= 2 && word_count(replacement_trimmed) <= 2
}

fn word_count(text: &str) -> usize {
    WHITESPACE.split(text).filter(|t| !t.is_empty()).count()
}

fn normalize_surface(text: &str) -> String {
    let step = SPACE_BEFORE_PUNCTUATION.replace_all(text, "$1");
    let step = DUPLICATE_COMMA.replace_all(&step, ",");
    let step = ORPHAN_COMMA.replace_all(&step, "$1");
    let step = MULTI_SPACE.replace_all(&step, " ");
    step.trim().to_string()
}

// ---------------------------------------------------------------------------
// Compose-model gate
// ---------------------------------------------------------------------------

const MAX_ALLOWED_TYPO_SIGNALS: usize = 2;

static TYPO_SIGNAL_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\byour\s+(done|welcome|right|going|late)\b",
        r"(?i)\bnite\b",
        r"(?i)\b(?:im|ive|id|dont|cant|wont|isnt|arent|didnt|couldnt|shouldnt|wouldnt)\b",
        r"(?i)\bteh\b",
        r"(?i)\brecieve\b",
        r"(?i)\bseperate\b",
        r"(?i)\bdefinately\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("invalid typo signal pattern"))
    .collect()
});

/// Whether the model should see a transcript the deterministic rules left
/// untouched.
///
/// True only when the input is non-blank, [`rewrite`] made no change, and
/// between one and [`MAX_ALLOWED_TYPO_SIGNALS`] typo-signal patterns match —
/// the transcript looks almost right but plausibly has spelling noise.
pub fn should_use_llm(original_text: &str, deterministic: &ComposeOutcome) -> bool {
    if original_text.trim().is_empty() {
        return false;
    }
    if deterministic.changed {
        return false;
    }
    let typo_signals = TYPO_SIGNAL_PATTERNS
        .iter()
        .filter(|p| p.is_match(original_text))
        .count();
    typo_signals > 0 && typo_signals <= MAX_ALLOWED_TYPO_SIGNALS
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
