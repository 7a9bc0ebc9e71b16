//! Four-stage rewrite pipeline.
//!
//! This module provides:
//! * [`RewritePipeline`] — the per-utterance orchestrator (ASR output →
//!   pre-model rules → model call → post-model rules).
//! * [`PreModelDecision`] / [`RewriteOutcome`] / [`RewriteDiagnostics`] —
//!   the stage records.
//! * [`join_append`] — list-aware joining of new dictation onto existing
//!   text.

pub mod append;
pub mod runner;
pub mod stage;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use append::join_append;
pub use runner::RewritePipeline;
pub use stage::{Operation, PreModelDecision, RewriteDiagnostics, RewriteOutcome};
