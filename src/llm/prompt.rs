//! Prompt builder for compose cleanup and instruction-driven edits.
//!
//! Two prompt families:
//! * **Compose** — minimal-edit cleanup of fresh dictation; the user prompt
//!   is the transcript itself.
//! * **Edit** — applies a spoken instruction to existing text; the user
//!   prompt is a sectioned document (EDIT_INTENT / PREFER_LIST_FORMAT /
//!   ORIGINAL_MESSAGE / EDIT_INSTRUCTION) so the model never has to guess
//!   which part is which.
//!
//! A user-supplied custom instruction can be appended to either system
//! prompt; it is clipped to a fixed budget so a runaway preference string
//! cannot crowd out the task instruction.

use crate::edit::EditIntent;

// ---------------------------------------------------------------------------
// System instructions
// ---------------------------------------------------------------------------

const COMPOSE_SYSTEM_INSTRUCTION: &str = "\
Clean this dictated message with minimal edits. \
Allowed edits: remove spoken fillers, remove immediate duplicate words, \
fix obvious transcription mistakes, and normalize min/mins to minutes. \
If input has digits, keep digits in output. \
If input has numbers written in words, always convert them to digits. \
Do not paraphrase, summarize, reorder, or change meaning, tone, person, or intent. \
If no allowed edit applies, return input unchanged. \
If uncertain, return input unchanged. \
Return only the cleaned message after the label \"Cleaned:\".";

const EDIT_SYSTEM_INSTRUCTION: &str = "\
Apply EDIT_INSTRUCTION to ORIGINAL_MESSAGE exactly. \
If EDIT_INTENT indicates delete-all, return an empty final message. \
If instruction includes correction turns ('X no, Y'), apply the final correction Y. \
When PREFER_LIST_FORMAT is yes and content is list-like, keep clean '- ' bullets. \
Keep untouched content faithful. Do not invent facts or add social filler. \
Return only the fully edited final message, with no explanations.";

/// Warm-up probe — cheapest possible request that proves the engine responds.
pub const PROBE_SYSTEM_INSTRUCTION: &str =
    "Reply with exactly OK. No markdown, no punctuation, no extra words.";
pub const PROBE_USER_MESSAGE: &str = "Reply with OK.";

const MAX_CUSTOM_INSTRUCTIONS_CHARS: usize = 220;

// ---------------------------------------------------------------------------
// PromptBuilder
// ---------------------------------------------------------------------------

/// Builds compose/edit prompts, with optional clipped custom instructions.
///
/// # Example
/// ```rust
/// use voice_rewrite::llm::PromptBuilder;
///
/// let builder = PromptBuilder::new("");
/// let system = builder.build_compose_system();
/// assert!(system.contains("minimal edits"));
/// ```
pub struct PromptBuilder {
    custom_instructions: String,
}

impl PromptBuilder {
    /// Create a builder; `custom_instructions` is normalized and clipped.
    pub fn new(custom_instructions: &str) -> Self {
        Self {
            custom_instructions: clip_custom_instructions(custom_instructions),
        }
    }

    /// System instruction for compose cleanup.
    pub fn build_compose_system(&self) -> String {
        match self.custom_rule() {
            None => COMPOSE_SYSTEM_INSTRUCTION.to_string(),
            Some(rule) => format!("{COMPOSE_SYSTEM_INSTRUCTION} {rule}"),
        }
    }

    /// System instruction for instruction-driven edits.
    pub fn build_edit_system(&self) -> String {
        match self.custom_rule() {
            None => EDIT_SYSTEM_INSTRUCTION.to_string(),
            Some(rule) => format!("{EDIT_SYSTEM_INSTRUCTION} {rule}"),
        }
    }

    /// Sectioned user prompt for an edit request.
    pub fn build_edit_user(
        &self,
        original_text: &str,
        instruction_text: &str,
        edit_intent: EditIntent,
        list_mode: bool,
    ) -> String {
        let mut prompt =
            String::with_capacity(original_text.len() + instruction_text.len() + 180);
        prompt.push_str("EDIT_INTENT: ");
        prompt.push_str(edit_intent.as_str());
        prompt.push('\n');
        prompt.push_str("PREFER_LIST_FORMAT: ");
        prompt.push_str(if list_mode { "yes" } else { "no" });
        prompt.push_str("\n\n");
        prompt.push_str("ORIGINAL_MESSAGE:\n");
        prompt.push_str(original_text);
        prompt.push_str("\n\nEDIT_INSTRUCTION:\n");
        prompt.push_str(instruction_text);
        prompt
    }

    fn custom_rule(&self) -> Option<String> {
        if self.custom_instructions.is_empty() {
            return None;
        }
        Some(format!(
            "Additional user rewrite preference: {}",
            self.custom_instructions
        ))
    }
}

/// Normalize line endings, trim, and clip to the custom-instruction budget.
pub fn clip_custom_instructions(text: &str) -> String {
    text.replace("\r\n", "\n")
        .trim()
        .chars()
        .take(MAX_CUSTOM_INSTRUCTIONS_CHARS)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ---- compose system ---

    #[test]
    fn compose_system_contains_core_rules() {
        let builder = PromptBuilder::new("");
        let system = builder.build_compose_system();
        assert!(system.contains("minimal edits"));
        assert!(system.contains("convert them to digits"));
        assert!(system.contains("return input unchanged"));
        assert!(system.contains("Cleaned:"));
    }

    #[test]
    fn compose_system_appends_custom_rule() {
        let builder = PromptBuilder::new("never use exclamation marks");
        let system = builder.build_compose_system();
        assert!(
            system.contains("Additional user rewrite preference: never use exclamation marks")
        );
    }

    #[test]
    fn blank_custom_instructions_leave_prompt_untouched() {
        let builder = PromptBuilder::new("   ");
        assert_eq!(builder.build_compose_system(), COMPOSE_SYSTEM_INSTRUCTION);
    }

    // ---- edit prompts ---

    #[test]
    fn edit_system_mentions_all_sections() {
        let builder = PromptBuilder::new("");
        let system = builder.build_edit_system();
        assert!(system.contains("EDIT_INSTRUCTION"));
        assert!(system.contains("ORIGINAL_MESSAGE"));
        assert!(system.contains("EDIT_INTENT"));
        assert!(system.contains("PREFER_LIST_FORMAT"));
    }

    #[test]
    fn edit_user_prompt_carries_all_sections() {
        let builder = PromptBuilder::new("");
        let prompt = builder.build_edit_user(
            "Buy milk and eggs",
            "delete milk",
            EditIntent::General,
            false,
        );
        assert!(prompt.contains("EDIT_INTENT: GENERAL"));
        assert!(prompt.contains("PREFER_LIST_FORMAT: no"));
        assert!(prompt.contains("ORIGINAL_MESSAGE:\nBuy milk and eggs"));
        assert!(prompt.contains("EDIT_INSTRUCTION:\ndelete milk"));
    }

    #[test]
    fn edit_user_prompt_flags_list_mode() {
        let builder = PromptBuilder::new("");
        let prompt =
            builder.build_edit_user("- milk\n- eggs", "delete milk", EditIntent::General, true);
        assert!(prompt.contains("PREFER_LIST_FORMAT: yes"));
    }

    // ---- clipping ---

    #[test]
    fn custom_instructions_are_clipped() {
        let long = "x".repeat(500);
        assert_eq!(clip_custom_instructions(&long).len(), 220);
    }

    #[test]
    fn clipping_normalizes_line_endings_and_trims() {
        assert_eq!(
            clip_custom_instructions("  keep it\r\nshort  "),
            "keep it\nshort"
        );
    }
}
