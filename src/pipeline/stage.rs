//! Pipeline stage records — decisions and diagnostics.
//!
//! The pre-model stage produces a [`PreModelDecision`] that either finalizes
//! the utterance locally or carries exactly the state the model stage needs;
//! nothing derived there is recomputed later.  Every utterance terminates in
//! a single [`RewriteOutcome`] with merged [`RewriteDiagnostics`].

use crate::edit::EditIntent;

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// What the utterance did to the text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Fresh dictation appended to (or replacing blank) source text.
    Append,
    /// An instruction applied against existing source text.
    Edit,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Append => "append",
            Operation::Edit => "edit",
        }
    }
}

// ---------------------------------------------------------------------------
// RewriteDiagnostics
// ---------------------------------------------------------------------------

/// Observability record assembled across the stages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RewriteDiagnostics {
    /// Named local rules that fired before the model stage
    /// (e.g. `compose_filler`, `strict_edit_command`,
    /// `deterministic_delete_term`, `deterministic_no_match`).
    pub local_rules_before_llm: Vec<String>,
    /// Raw (cleaned) model output, when the model was actually invoked.
    pub llm_output_text: Option<String>,
    /// Named local rules that fired after the model stage
    /// (e.g. `compose_safety_gate`, `post_replace_capitalization`).
    pub local_rules_after_llm: Vec<String>,
}

// ---------------------------------------------------------------------------
// PreModelDecision
// ---------------------------------------------------------------------------

/// Decision record produced by the pre-model rules stage.
#[derive(Debug, Clone, PartialEq)]
pub enum PreModelDecision {
    /// Local rules finalized the output; the model stage is skipped.
    Complete {
        operation: Operation,
        output: String,
        applied: bool,
        edit_intent: Option<EditIntent>,
        diagnostics: RewriteDiagnostics,
    },
    /// Fresh dictation that may benefit from a model cleanup pass.
    NeedsComposeLlm {
        source_text: String,
        transcript: String,
        /// Output of the compose normalizer — the pre-model text that every
        /// fallback path returns to.
        deterministic_output: String,
        /// Whether the engine should actually be invoked (normalizer made
        /// no change but typo signals were detected).
        llm_candidate: bool,
        diagnostics: RewriteDiagnostics,
    },
    /// An edit instruction local rules could not resolve.
    NeedsEditLlm {
        source_text: String,
        /// Normalized instruction (correction turns resolved, preamble
        /// stripped) ready for the prompt builder.
        instruction: String,
        edit_intent: EditIntent,
        diagnostics: RewriteDiagnostics,
    },
}

// ---------------------------------------------------------------------------
// RewriteOutcome
// ---------------------------------------------------------------------------

/// Terminal result for one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteOutcome {
    /// Final text for the whole field (source with the edit/append applied).
    pub output: String,
    pub operation: Operation,
    /// Whether the engine was actually invoked for this utterance.
    pub llm_invoked: bool,
    /// Whether `output` differs from the pre-utterance state.
    pub applied: bool,
    /// Backend label of the engine, when the model stage ran.
    pub backend: Option<String>,
    /// Classified error tag (`invalid_argument` / `input_too_long` /
    /// `unknown`) when the model stage failed; the output still carries the
    /// pre-model fallback text in that case.
    pub error_type: Option<&'static str>,
    pub error_message: Option<String>,
    /// Wall-clock duration of the rewrite stages for this utterance.
    pub elapsed_ms: u64,
    pub edit_intent: Option<EditIntent>,
    pub diagnostics: RewriteDiagnostics,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
