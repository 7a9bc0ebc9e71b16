//! Core `LlmEngine` trait, error taxonomy, and the `RewriteResult` union.
//!
//! The pipeline treats the engine as opaque: a function from
//! `(system_prompt, user_prompt)` to text, with a timeout imposed by the
//! caller.  Errors are classified into a small taxonomy
//! (`invalid_argument` / `input_too_long` / `unknown`) by scanning error
//! messages and their cause chains for known signature substrings, so upper
//! layers can report a stable `type` tag without knowing the backend.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// Classified failure from the language-model engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine rejected the prompt or its tokens.
    #[error("engine rejected the prompt: {0}")]
    InvalidArgument(String),

    /// The prompt exceeded the engine's token limit.
    #[error("input exceeds the engine token limit: {0}")]
    InputTooLong(String),

    /// Any other engine failure, including timeouts.
    #[error("engine request failed: {0}")]
    Unknown(String),
}

/// Signature substrings that mark a prompt-rejection failure.
const INVALID_ARGUMENT_SIGNATURES: &[&str] = &["invalid_argument", "unprocessed token is null"];

/// Signature substrings that mark a token-limit failure.
const INPUT_TOO_LONG_SIGNATURES: &[&str] = &[
    "input token ids are too long",
    "exceeding the maximum number of tokens allowed",
    "context_length_exceeded",
    "maximum context length",
];

impl EngineError {
    /// Stable lowercase tag for diagnostics and reports.
    pub fn error_type(&self) -> &'static str {
        match self {
            EngineError::InvalidArgument(_) => "invalid_argument",
            EngineError::InputTooLong(_) => "input_too_long",
            EngineError::Unknown(_) => "unknown",
        }
    }

    /// Classify a bare message by its signature substrings.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();
        if INVALID_ARGUMENT_SIGNATURES.iter().any(|s| lowered.contains(s)) {
            EngineError::InvalidArgument(message)
        } else if INPUT_TOO_LONG_SIGNATURES.iter().any(|s| lowered.contains(s)) {
            EngineError::InputTooLong(message)
        } else {
            EngineError::Unknown(message)
        }
    }

    /// Classify an error by scanning its message and full cause chain.
    pub fn classify_chain(error: &(dyn std::error::Error + 'static)) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(cause) = current {
            messages.push(cause.to_string());
            current = cause.source();
        }
        let joined = messages.join(": ");
        for message in &messages {
            let lowered = message.to_lowercase();
            if INVALID_ARGUMENT_SIGNATURES.iter().any(|s| lowered.contains(s)) {
                return EngineError::InvalidArgument(joined);
            }
            if INPUT_TOO_LONG_SIGNATURES.iter().any(|s| lowered.contains(s)) {
                return EngineError::InputTooLong(joined);
            }
        }
        EngineError::Unknown(joined)
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            EngineError::Unknown(format!("request timed out: {e}"))
        } else {
            EngineError::classify_chain(&e)
        }
    }
}

// ---------------------------------------------------------------------------
// LlmEngine trait
// ---------------------------------------------------------------------------

/// Async boundary to the language-model engine.
///
/// Implementors must be `Send + Sync` so they can be shared across
/// utterances (e.g. wrapped in `Arc<dyn LlmEngine>`).  The pipeline imposes
/// its own timeout around [`generate`](LlmEngine::generate) and may cancel
/// by dropping the future; implementations should not block.
#[async_trait]
pub trait LlmEngine: Send + Sync {
    /// Run one prompt through the model and return its raw text output.
    async fn generate(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, EngineError>;

    /// Whether the model is ready to serve requests at all.
    ///
    /// The pipeline skips the model stage entirely when this is `false`.
    fn is_available(&self) -> bool;

    /// Short backend label for diagnostics (e.g. `"api"`).
    fn backend(&self) -> &str;
}

// ---------------------------------------------------------------------------
// RewriteResult
// ---------------------------------------------------------------------------

/// Result of one model-backed rewrite or edit request.
///
/// `Success` always carries real text (possibly an unchanged fallback, never
/// a placeholder); `Failure` always carries a classified [`EngineError`].
#[derive(Debug)]
pub enum RewriteResult {
    Success {
        text: String,
        latency_ms: u64,
        backend: String,
    },
    Failure {
        latency_ms: u64,
        backend: Option<String>,
        error: EngineError,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
