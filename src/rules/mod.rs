//! Deterministic pre-model rules.
//!
//! This module provides:
//! * [`numbers`] — spoken-number-phrase to digit-string conversion.
//! * [`list`] — the list-likeness heuristic shared by the append formatter
//!   and the prompt builder.
//! * [`compose`] — the compose normalizer applied to fresh dictation before
//!   any model call, plus the compose-model gate.
//!
//! Everything here is a pure function over `&str`: no state, no I/O, safe
//! to call concurrently.

pub mod compose;
pub mod list;
pub mod numbers;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use compose::{ComposeOutcome, Rule};
pub use list::looks_like_list;
pub use numbers::convert_number_phrase;
