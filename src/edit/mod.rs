//! Edit-instruction interpretation and deterministic execution.
//!
//! This module provides:
//! * [`instruction`] — analysis, the strict edit-command gate, and command
//!   parsing into [`ParsedCommand`].
//! * [`engine`] — deterministic execution of a parsed command against
//!   source text, plus the post-replace capitalization fix-up.

pub mod engine;
pub mod instruction;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use engine::{
    apply_post_replace_capitalization, try_apply_deterministic_edit, DeterministicEditResult,
    RuleConfidence,
};
pub use instruction::{
    analyze_instruction, is_strict_edit_command, parse_command, should_allow_blank_output,
    CommandKind, CommandScope, EditIntent, InstructionAnalysis, ParsedCommand,
};
