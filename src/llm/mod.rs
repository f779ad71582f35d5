//! Model invoker boundary
//!
//! This module wraps the text-generation capability the converter depends
//! on. The converter only sees [`LlmClient`]: given a prompt, return text or
//! fail with an [`LlmError`].
//!
//! # Providers
//!
//! - **Gemini**: Google `generateContent` REST API (requires `llm-online` feature)
//! - **Ollama**: locally hosted models over HTTP (requires `llm-online` feature)
//!
//! # Example
//!
//! ```ignore
//! use migrateiq::llm::{LlmConfig, build_client};
//!
//! let config = LlmConfig::gemini(api_key).with_temperature(0.3);
//! let client = build_client(&config)?;
//! let text = client.complete("...").await?;
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod gemini;
pub mod ollama;
pub mod prompt;

use std::sync::Arc;

pub use client::LlmClient;
pub use config::{LlmConfig, LlmProvider};
pub use error::{LlmError, LlmResult};
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use prompt::{TRANSLATION_PROMPT_TEMPLATE, build_prompt, build_prompt_for, estimate_tokens};

#[cfg(test)]
pub use client::MockLlmClient;

/// Construct the configured provider client
///
/// The returned client is immutable and safe to share across concurrent
/// block conversions.
pub fn build_client(config: &LlmConfig) -> LlmResult<Arc<dyn LlmClient>> {
    config.validate().map_err(LlmError::ConfigError)?;

    let client: Arc<dyn LlmClient> = match &config.provider {
        LlmProvider::Gemini { base_url, api_key } => {
            let key = api_key
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .ok_or_else(|| LlmError::ConfigError("missing Gemini API key".to_string()))?;
            Arc::new(
                GeminiClient::with_base_url(base_url.as_str(), key, config.model.as_str())
                    .with_temperature(config.temperature)
                    .with_timeout(config.timeout_seconds)
                    .with_max_output_tokens(config.max_output_tokens),
            )
        }
        LlmProvider::Ollama { url } => Arc::new(
            OllamaClient::new(url.as_str(), config.model.as_str())
                .with_temperature(config.temperature)
                .with_timeout(config.timeout_seconds),
        ),
    };

    tracing::debug!(
        provider = config.provider.name(),
        model = %config.model,
        temperature = config.temperature,
        "LLM client configured"
    );

    Ok(client)
}
