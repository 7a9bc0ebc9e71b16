//! Pipeline orchestrator — four strictly-sequential stages per utterance.
//!
//! ```text
//! transcript (ASR, external)
//!   └─▶ pre-model rules      edit-vs-append, normalizer, deterministic edits
//!         ├─ Complete ───────────────────────────────▶ finalize
//!         ├─ NeedsComposeLlm ─▶ model stage ─▶ safety gate ─▶ finalize
//!         └─ NeedsEditLlm ────▶ model stage ─▶ capitalization ─▶ finalize
//! ```
//!
//! There is no branching back: every utterance terminates in exactly one
//! [`RewriteOutcome`].  Model failures, timeouts, and safety-gate rejections
//! all fall back to the pre-model text — the only legitimate blank output is
//! an explicit clear-all/delete-all.  Cancellation is dropping the
//! [`process`](RewritePipeline::process) future: the in-flight engine call
//! is discarded with it and no model-influenced text is returned.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::RewriteConfig;
use crate::edit::{
    analyze_instruction, apply_post_replace_capitalization, is_strict_edit_command,
    should_allow_blank_output, try_apply_deterministic_edit, EditIntent,
};
use crate::llm::engine::{EngineError, LlmEngine, RewriteResult};
use crate::llm::output::clean_model_output;
use crate::llm::prompt::PromptBuilder;
use crate::llm::safety::is_safe_rewrite;
use crate::rules::compose;
use crate::rules::list::looks_like_list;

use super::append::join_append;
use super::stage::{Operation, PreModelDecision, RewriteDiagnostics, RewriteOutcome};

// ---------------------------------------------------------------------------
// Adaptive timeout
// ---------------------------------------------------------------------------

/// Extra budget for inputs long enough to slow generation down.
const LONG_INPUT_TIMEOUT_BONUS_MS: u64 = 400;
const LONG_INPUT_WORD_COUNT: usize = 60;

fn adaptive_timeout_ms(input_text: &str, base_ms: u64) -> u64 {
    let words = input_text.split_whitespace().count();
    if words > LONG_INPUT_WORD_COUNT {
        base_ms + LONG_INPUT_TIMEOUT_BONUS_MS
    } else {
        base_ms
    }
}

// ---------------------------------------------------------------------------
// Model stage result
// ---------------------------------------------------------------------------

/// What the model stage handed to finalization.
struct ModelStageResult {
    invoked: bool,
    /// Accepted text, or the pre-model fallback on failure/rejection.
    output: String,
    backend: Option<String>,
    error_type: Option<&'static str>,
    error_message: Option<String>,
    /// Cleaned model output when the engine was invoked and produced text.
    llm_output_text: Option<String>,
    local_rules_after_llm: Vec<String>,
}

impl ModelStageResult {
    fn skipped(fallback: String) -> Self {
        Self {
            invoked: false,
            output: fallback,
            backend: None,
            error_type: None,
            error_message: None,
            llm_output_text: None,
            local_rules_after_llm: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// RewritePipeline
// ---------------------------------------------------------------------------

/// Drives the per-utterance rewrite state machine.
///
/// All rule evaluation is synchronous and stateless; the only suspending
/// operation is the engine call, wrapped in a timeout derived from
/// [`RewriteConfig::timeout_ms`].
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use voice_rewrite::config::AppConfig;
/// use voice_rewrite::llm::ApiEngine;
/// use voice_rewrite::pipeline::RewritePipeline;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let engine = Arc::new(ApiEngine::from_config(&config.engine));
/// let pipeline = RewritePipeline::new(engine, config.rewrite);
///
/// let outcome = pipeline.process("Buy milk and eggs", "delete milk").await;
/// assert_eq!(outcome.output, "Buy and eggs");
/// # }
/// ```
pub struct RewritePipeline {
    engine: Arc<dyn LlmEngine>,
    prompts: PromptBuilder,
    config: RewriteConfig,
}

impl RewritePipeline {
    /// Create a pipeline over an engine and rewrite settings.
    pub fn new(engine: Arc<dyn LlmEngine>, config: RewriteConfig) -> Self {
        let prompts = PromptBuilder::new(&config.custom_instructions);
        Self {
            engine,
            prompts,
            config,
        }
    }

    /// Run one utterance through the pipeline.
    ///
    /// `source_text` is the text already committed to the field (may be
    /// blank); `transcript` is the ASR output for the new utterance.  A
    /// blank transcript is "nothing to rewrite" and returns the source
    /// unchanged without touching the model.
    pub async fn process(&self, source_text: &str, transcript: &str) -> RewriteOutcome {
        let started = Instant::now();
        let decision = self.pre_model_stage(source_text, transcript);

        let mut outcome = match decision {
            PreModelDecision::Complete {
                operation,
                output,
                applied,
                edit_intent,
                diagnostics,
            } => RewriteOutcome {
                output,
                operation,
                llm_invoked: false,
                applied,
                backend: None,
                error_type: None,
                error_message: None,
                elapsed_ms: 0,
                edit_intent,
                diagnostics,
            },

            PreModelDecision::NeedsComposeLlm {
                source_text,
                transcript,
                deterministic_output,
                llm_candidate,
                diagnostics,
            } => {
                let model = self
                    .compose_model_stage(&deterministic_output, llm_candidate)
                    .await;
                finalize_compose(&source_text, &transcript, model, diagnostics)
            }

            PreModelDecision::NeedsEditLlm {
                source_text,
                instruction,
                edit_intent,
                diagnostics,
            } => {
                let model = self
                    .edit_model_stage(&source_text, &instruction, edit_intent)
                    .await;
                finalize_edit(&source_text, &instruction, edit_intent, model, diagnostics)
            }
        };

        outcome.elapsed_ms = started.elapsed().as_millis() as u64;
        outcome
    }

    // -----------------------------------------------------------------------
    // Stage 2: pre-model rules
    // -----------------------------------------------------------------------

    /// Pure decision function: edit vs. append, local rules, escalation.
    fn pre_model_stage(&self, source_text: &str, transcript: &str) -> PreModelDecision {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            // Nothing to rewrite; never invoke the model for silence.
            return PreModelDecision::Complete {
                operation: Operation::Append,
                output: source_text.to_string(),
                applied: false,
                edit_intent: None,
                diagnostics: RewriteDiagnostics::default(),
            };
        }

        let has_source = !source_text.trim().is_empty();
        if has_source && is_strict_edit_command(transcript) {
            self.pre_model_edit(source_text, transcript)
        } else {
            self.pre_model_append(source_text, transcript)
        }
    }

    fn pre_model_append(&self, source_text: &str, transcript: &str) -> PreModelDecision {
        let deterministic = compose::rewrite(transcript);
        let local_rules_before_llm: Vec<String> = deterministic
            .applied_rules
            .iter()
            .map(|rule| format!("compose_{}", rule.label()))
            .collect();
        let diagnostics = RewriteDiagnostics {
            local_rules_before_llm,
            ..RewriteDiagnostics::default()
        };

        if !self.config.enabled || !self.engine.is_available() {
            log::debug!("pipeline: append completes locally (model disabled or unavailable)");
            let output = join_append(source_text, &deterministic.text);
            let applied = if source_text.trim().is_empty() {
                output != transcript
            } else {
                output != source_text
            };
            return PreModelDecision::Complete {
                operation: Operation::Append,
                output,
                applied,
                edit_intent: None,
                diagnostics,
            };
        }

        let llm_candidate = compose::should_use_llm(transcript, &deterministic);
        PreModelDecision::NeedsComposeLlm {
            source_text: source_text.to_string(),
            transcript: transcript.to_string(),
            deterministic_output: deterministic.text,
            llm_candidate,
            diagnostics,
        }
    }

    fn pre_model_edit(&self, source_text: &str, transcript: &str) -> PreModelDecision {
        let mut local_rules_before_llm = vec!["strict_edit_command".to_string()];
        let analysis = analyze_instruction(transcript);

        if let Some(deterministic) = try_apply_deterministic_edit(source_text, transcript) {
            if !deterministic.no_match_detected {
                log::debug!(
                    "pipeline: deterministic {} finalized the edit",
                    deterministic.command_kind.label()
                );
                local_rules_before_llm
                    .push(format!("deterministic_{}", deterministic.command_kind.label()));
                return PreModelDecision::Complete {
                    operation: Operation::Edit,
                    output: deterministic.output.clone(),
                    applied: deterministic.output != source_text,
                    edit_intent: Some(deterministic.intent),
                    diagnostics: RewriteDiagnostics {
                        local_rules_before_llm,
                        ..RewriteDiagnostics::default()
                    },
                };
            }
            local_rules_before_llm.push("deterministic_no_match".to_string());
        }

        let diagnostics = RewriteDiagnostics {
            local_rules_before_llm,
            ..RewriteDiagnostics::default()
        };

        if !self.config.enabled || !self.engine.is_available() {
            log::debug!("pipeline: edit falls back to source (model disabled or unavailable)");
            return PreModelDecision::Complete {
                operation: Operation::Edit,
                output: source_text.to_string(),
                applied: false,
                edit_intent: Some(analysis.intent),
                diagnostics,
            };
        }

        PreModelDecision::NeedsEditLlm {
            source_text: source_text.to_string(),
            instruction: analysis.normalized_instruction,
            edit_intent: analysis.intent,
            diagnostics,
        }
    }

    // -----------------------------------------------------------------------
    // Stage 3: model
    // -----------------------------------------------------------------------

    async fn compose_model_stage(
        &self,
        deterministic_output: &str,
        llm_candidate: bool,
    ) -> ModelStageResult {
        if !llm_candidate {
            // The normalizer already settled the text (or no typo signal
            // justifies a model pass).
            return ModelStageResult::skipped(deterministic_output.to_string());
        }

        let list_mode = looks_like_list(deterministic_output);
        let system = self.prompts.build_compose_system();
        let timeout_ms = adaptive_timeout_ms(deterministic_output, self.config.timeout_ms);

        match self
            .generate_with_timeout(&system, deterministic_output, timeout_ms)
            .await
        {
            RewriteResult::Success { text, backend, .. } => {
                let cleaned = clean_model_output(&text, list_mode);
                if is_safe_rewrite(deterministic_output, &cleaned, false) {
                    let mut after = Vec::new();
                    if cleaned != deterministic_output {
                        after.push("compose_output_policy".to_string());
                    }
                    ModelStageResult {
                        invoked: true,
                        output: cleaned.clone(),
                        backend: Some(backend),
                        error_type: None,
                        error_message: None,
                        llm_output_text: Some(cleaned),
                        local_rules_after_llm: after,
                    }
                } else {
                    log::info!("pipeline: safety gate rejected compose output, keeping local text");
                    ModelStageResult {
                        invoked: true,
                        output: deterministic_output.to_string(),
                        backend: Some(backend),
                        error_type: None,
                        error_message: None,
                        llm_output_text: Some(cleaned),
                        local_rules_after_llm: vec!["compose_safety_gate".to_string()],
                    }
                }
            }
            RewriteResult::Failure {
                backend, error, ..
            } => {
                log::warn!("pipeline: compose model failed ({}), keeping local text", error);
                ModelStageResult {
                    invoked: true,
                    output: deterministic_output.to_string(),
                    backend,
                    error_type: Some(error.error_type()),
                    error_message: Some(error.to_string()),
                    llm_output_text: None,
                    local_rules_after_llm: Vec::new(),
                }
            }
        }
    }

    async fn edit_model_stage(
        &self,
        source_text: &str,
        instruction: &str,
        edit_intent: EditIntent,
    ) -> ModelStageResult {
        let list_mode = looks_like_list(source_text) || looks_like_list(instruction);
        let system = self.prompts.build_edit_system();
        let user = self
            .prompts
            .build_edit_user(source_text, instruction, edit_intent, list_mode);
        let timeout_ms = adaptive_timeout_ms(&user, self.config.timeout_ms);

        match self.generate_with_timeout(&system, &user, timeout_ms).await {
            RewriteResult::Success { text, backend, .. } => {
                let cleaned = clean_model_output(&text, list_mode);
                if cleaned.is_empty() && !should_allow_blank_output(edit_intent) {
                    log::info!("pipeline: model returned blank edit output, keeping source");
                    return ModelStageResult {
                        invoked: true,
                        output: source_text.to_string(),
                        backend: Some(backend),
                        error_type: None,
                        error_message: None,
                        llm_output_text: Some(cleaned),
                        local_rules_after_llm: vec!["edit_blank_output".to_string()],
                    };
                }
                ModelStageResult {
                    invoked: true,
                    output: cleaned.clone(),
                    backend: Some(backend),
                    error_type: None,
                    error_message: None,
                    llm_output_text: Some(cleaned),
                    local_rules_after_llm: Vec::new(),
                }
            }
            RewriteResult::Failure {
                backend, error, ..
            } => {
                log::warn!("pipeline: edit model failed ({}), keeping source", error);
                ModelStageResult {
                    invoked: true,
                    output: source_text.to_string(),
                    backend,
                    error_type: Some(error.error_type()),
                    error_message: Some(error.to_string()),
                    llm_output_text: None,
                    local_rules_after_llm: Vec::new(),
                }
            }
        }
    }

    async fn generate_with_timeout(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        timeout_ms: u64,
    ) -> RewriteResult {
        let started = Instant::now();
        let backend = self.engine.backend().to_string();
        let generated = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            self.engine.generate(system_prompt, user_prompt),
        )
        .await;
        let latency_ms = started.elapsed().as_millis() as u64;

        match generated {
            Ok(Ok(text)) => RewriteResult::Success {
                text,
                latency_ms,
                backend,
            },
            Ok(Err(error)) => RewriteResult::Failure {
                latency_ms,
                backend: Some(backend),
                error,
            },
            Err(_elapsed) => RewriteResult::Failure {
                latency_ms,
                backend: Some(backend),
                error: EngineError::Unknown(format!("timed out after {timeout_ms}ms")),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Stage 4: post-model finalization
// ---------------------------------------------------------------------------

fn finalize_compose(
    source_text: &str,
    transcript: &str,
    model: ModelStageResult,
    diagnostics: RewriteDiagnostics,
) -> RewriteOutcome {
    let final_output = if source_text.trim().is_empty() {
        model.output.clone()
    } else {
        join_append(source_text, &model.output)
    };
    let applied = if source_text.trim().is_empty() {
        final_output != transcript
    } else {
        final_output != source_text
    };
    RewriteOutcome {
        output: final_output,
        operation: Operation::Append,
        llm_invoked: model.invoked,
        applied,
        backend: model.backend,
        error_type: model.error_type,
        error_message: model.error_message,
        elapsed_ms: 0,
        edit_intent: None,
        diagnostics: RewriteDiagnostics {
            local_rules_before_llm: diagnostics.local_rules_before_llm,
            llm_output_text: model.llm_output_text,
            local_rules_after_llm: model.local_rules_after_llm,
        },
    }
}

fn finalize_edit(
    source_text: &str,
    instruction: &str,
    edit_intent: EditIntent,
    model: ModelStageResult,
    diagnostics: RewriteDiagnostics,
) -> RewriteOutcome {
    let mut local_rules_after_llm = model.local_rules_after_llm;
    let normalized_output =
        apply_post_replace_capitalization(source_text, instruction, &model.output);
    if normalized_output != model.output {
        local_rules_after_llm.push("post_replace_capitalization".to_string());
    }
    let applied = normalized_output != source_text;
    RewriteOutcome {
        output: normalized_output,
        operation: Operation::Edit,
        llm_invoked: model.invoked,
        applied,
        backend: model.backend,
        error_type: model.error_type,
        error_message: model.error_message,
        elapsed_ms: 0,
        edit_intent: Some(edit_intent),
        diagnostics: RewriteDiagnostics {
            local_rules_before_llm: diagnostics.local_rules_before_llm,
            llm_output_text: model.llm_output_text,
            local_rules_after_llm,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
