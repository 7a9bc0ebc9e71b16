//! Configuration module.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the rewrite
//! pipeline and the engine adapter, `AppPaths` for cross-platform config
//! directories, and TOML persistence via `AppConfig::load` /
//! `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{AppConfig, EngineConfig, RewriteConfig};
