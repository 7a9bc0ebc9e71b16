//! `ApiEngine` — OpenAI-compatible `/v1/chat/completions` adapter.
//!
//! Works with Ollama (OpenAI mode), OpenAI, Groq, LM Studio, vLLM — any
//! provider that speaks the OpenAI chat-completions wire format.  All
//! connection details come from [`EngineConfig`]; nothing is hardcoded.

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::llm::engine::{EngineError, LlmEngine};

// ---------------------------------------------------------------------------
// ApiEngine
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible chat-completions endpoint.
///
/// # No hardcoded URLs
/// `base_url`, `api_key`, and `model` come exclusively from the
/// [`EngineConfig`] passed to [`ApiEngine::from_config`].
pub struct ApiEngine {
    client: reqwest::Client,
    config: EngineConfig,
}

impl ApiEngine {
    /// Build an `ApiEngine` from application config.
    ///
    /// The HTTP client is pre-configured with the per-request timeout from
    /// `config.timeout_secs`; a default client is the last-resort fallback
    /// if the builder fails.
    pub fn from_config(config: &EngineConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }
}

#[async_trait]
impl LlmEngine for ApiEngine {
    /// Send one system/user prompt pair to the configured endpoint.
    ///
    /// The `Authorization: Bearer …` header is attached **only** when
    /// `config.api_key` is a non-empty string — safe for Ollama and other
    /// local providers that require no authentication.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, EngineError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);

        let body = serde_json::json!({
            "model":       self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user",   "content": user_prompt   }
            ],
            "stream":      false,
            "temperature": self.config.temperature,
            "max_tokens":  256
        });

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EngineError::Unknown(format!("failed to parse engine response: {e}")))?;

        if !status.is_success() {
            // Providers put the useful failure signature in the error body.
            let message = json["error"]["message"]
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| format!("engine returned HTTP {status}"));
            return Err(EngineError::classify(message));
        }

        let text = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| EngineError::Unknown("engine returned an empty response".into()))?
            .trim()
            .to_string();

        if text.is_empty() {
            return Err(EngineError::Unknown("engine returned an empty response".into()));
        }

        Ok(text)
    }

    fn is_available(&self) -> bool {
        self.config.enabled
    }

    fn backend(&self) -> &str {
        "api"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn make_config(api_key: Option<&str>) -> EngineConfig {
        EngineConfig {
            enabled: true,
            base_url: "http://localhost:11434".into(),
            api_key: api_key.map(|s| s.to_string()),
            model: "qwen2.5:3b".into(),
            temperature: 0.0,
            timeout_secs: 10,
        }
    }

    #[test]
    fn from_config_builds_without_panic() {
        let _engine = ApiEngine::from_config(&make_config(None));
    }

    #[test]
    fn from_config_accepts_empty_api_key() {
        let _engine = ApiEngine::from_config(&make_config(Some("")));
    }

    #[test]
    fn availability_follows_config_flag() {
        let engine = ApiEngine::from_config(&make_config(None));
        assert!(engine.is_available());

        let mut disabled = make_config(None);
        disabled.enabled = false;
        let engine = ApiEngine::from_config(&disabled);
        assert!(!engine.is_available());
    }

    /// Verify that `ApiEngine` is usable as `dyn LlmEngine`.
    #[test]
    fn engine_is_object_safe() {
        let engine: Box<dyn LlmEngine> = Box::new(ApiEngine::from_config(&make_config(None)));
        assert_eq!(engine.backend(), "api");
    }
}
