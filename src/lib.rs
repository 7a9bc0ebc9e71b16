//! Rewrite engine for a voice-dictation keyboard.
//!
//! Turns raw dictation transcripts into clean text and interprets spoken
//! edit instructions ("delete the first milk", "replace guys with girls",
//! "clear everything") against existing text.  Deterministic rules run
//! first; an external language model is consulted only when the rules
//! cannot finish the job, and its output must pass a safety gate before it
//! replaces anything.
//!
//! Module map:
//! * [`rules`] — pre-model deterministic rules: number-word conversion,
//!   list detection, the compose normalizer.
//! * [`edit`] — instruction interpretation and the deterministic edit
//!   engine.
//! * [`llm`] — the engine boundary: [`llm::LlmEngine`] trait, the
//!   OpenAI-compatible [`llm::ApiEngine`] adapter, prompt builder, model
//!   output cleanup, and the output safety gate.
//! * [`pipeline`] — the four-stage state machine that sequences ASR output,
//!   pre-model rules, the model call, and post-model rules per utterance.
//! * [`config`] — TOML-backed settings for the rewrite pipeline and engine
//!   adapter.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use voice_rewrite::config::AppConfig;
//! use voice_rewrite::llm::ApiEngine;
//! use voice_rewrite::pipeline::RewritePipeline;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let engine = Arc::new(ApiEngine::from_config(&config.engine));
//!     let pipeline = RewritePipeline::new(engine, config.rewrite);
//!
//!     // Fresh dictation: source text is empty, transcript is appended.
//!     let outcome = pipeline.process("", "uh hey I'll be ten minutes late").await;
//!     println!("{}", outcome.output);
//!
//!     // Edit instruction against existing text.
//!     let outcome = pipeline.process("Buy milk and eggs", "delete milk").await;
//!     println!("{}", outcome.output);
//! }
//! ```

pub mod config;
pub mod edit;
pub mod llm;
pub mod pipeline;
pub mod rules;
