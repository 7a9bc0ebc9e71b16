//! Language-model boundary for the rewrite pipeline.
//!
//! This module provides:
//! * [`LlmEngine`] — async trait implemented by all engine backends.
//! * [`ApiEngine`] — OpenAI-compatible REST adapter (the shipped backend).
//! * [`EngineError`] / [`RewriteResult`] — classified failures and the
//!   success/failure union for one model request.
//! * [`PromptBuilder`] — compose/edit system and user prompts.
//! * [`output`] — scaffolding cleanup for raw model output.
//! * [`safety`] — the fail-closed acceptance gate for model output.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use voice_rewrite::config::EngineConfig;
//! use voice_rewrite::llm::{ApiEngine, LlmEngine, PromptBuilder};
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = ApiEngine::from_config(&EngineConfig::default());
//!     let prompts = PromptBuilder::new("");
//!
//!     let system = prompts.build_compose_system();
//!     match engine.generate(&system, "um hello hello there").await {
//!         Ok(text) => println!("{text}"),
//!         Err(e) => eprintln!("engine failed ({}): {e}", e.error_type()),
//!     }
//! }
//! ```

pub mod api;
pub mod engine;
pub mod output;
pub mod prompt;
pub mod safety;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use api::ApiEngine;
pub use engine::{EngineError, LlmEngine, RewriteResult};
pub use output::clean_model_output;
pub use prompt::{clip_custom_instructions, PromptBuilder};
pub use safety::is_safe_rewrite;
