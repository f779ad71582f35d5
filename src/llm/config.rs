//! Configuration types for the model invoker
//!
//! The configuration is established once (credentials, model selection,
//! sampling temperature) and handed to [`super::build_client`]. Clients never
//! read ambient global state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default Gemini model
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Default model when Ollama answers
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2";

/// Default Gemini REST endpoint
pub const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Default Ollama endpoint
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Which provider answers the prompts
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LlmProvider {
    /// Google Gemini `generateContent` API
    Gemini {
        /// API base URL
        #[serde(default = "default_gemini_url")]
        base_url: String,
        /// API key; usually supplied through the environment
        #[serde(default, skip_serializing)]
        api_key: Option<String>,
    },

    /// Ollama API server
    Ollama {
        /// Ollama API URL (default: http://localhost:11434)
        #[serde(default = "default_ollama_url")]
        url: String,
    },
}

fn default_gemini_url() -> String {
    DEFAULT_GEMINI_URL.to_string()
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

impl Default for LlmProvider {
    fn default() -> Self {
        LlmProvider::gemini()
    }
}

impl fmt::Debug for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::Gemini { base_url, api_key } => f
                .debug_struct("Gemini")
                .field("base_url", base_url)
                .field("api_key", &api_key.as_ref().map(|_| "<redacted>"))
                .finish(),
            LlmProvider::Ollama { url } => f.debug_struct("Ollama").field("url", url).finish(),
        }
    }
}

impl LlmProvider {
    /// Gemini at the public endpoint, key to be resolved later
    pub fn gemini() -> Self {
        LlmProvider::Gemini {
            base_url: default_gemini_url(),
            api_key: None,
        }
    }

    /// Ollama at the default local URL
    pub fn ollama() -> Self {
        LlmProvider::Ollama {
            url: default_ollama_url(),
        }
    }

    /// Short provider name for logs and CLI output
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Gemini { .. } => "gemini",
            LlmProvider::Ollama { .. } => "ollama",
        }
    }

    /// Model used when none is configured
    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Gemini { .. } => DEFAULT_MODEL,
            LlmProvider::Ollama { .. } => DEFAULT_OLLAMA_MODEL,
        }
    }

    /// Check whether credentials are present (always true for Ollama)
    pub fn has_credentials(&self) -> bool {
        match self {
            LlmProvider::Gemini { api_key, .. } => {
                api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            }
            LlmProvider::Ollama { .. } => true,
        }
    }
}

/// Model invoker configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LlmConfig {
    /// Provider and its endpoint/credentials
    #[serde(default)]
    pub provider: LlmProvider,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Temperature for LLM sampling (low favours literal translations)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Upper bound on generated tokens, provider default when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_timeout_seconds() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout_seconds(),
            max_output_tokens: None,
        }
    }
}

impl LlmConfig {
    /// Gemini configuration with the given key
    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::Gemini {
                base_url: default_gemini_url(),
                api_key: Some(api_key.into()),
            },
            ..Default::default()
        }
    }

    /// Ollama configuration for the given model
    pub fn ollama(model: impl Into<String>) -> Self {
        Self {
            provider: LlmProvider::ollama(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Switch provider
    ///
    /// A model left at some provider's default moves to the new provider's
    /// default; an explicitly chosen model is kept.
    pub fn with_provider(mut self, provider: LlmProvider) -> Self {
        if self.model == DEFAULT_MODEL || self.model == DEFAULT_OLLAMA_MODEL {
            self.model = provider.default_model().to_string();
        }
        self.provider = provider;
        self
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    /// Set timeout in seconds
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Set the API key, if the provider takes one
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        if let LlmProvider::Gemini { api_key, .. } = &mut self.provider {
            *api_key = Some(key.into());
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model.trim().is_empty() {
            return Err("model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }
        if self.timeout_seconds == 0 {
            return Err("timeout_seconds must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "gemini-2.0-flash");
        assert!((config.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.timeout_seconds, 120);
        assert_eq!(config.provider.name(), "gemini");
        assert!(!config.provider.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_llm_config_ollama() {
        let config = LlmConfig::ollama("codellama").with_timeout(30);
        assert_eq!(config.model, "codellama");
        assert_eq!(config.timeout_seconds, 30);
        match &config.provider {
            LlmProvider::Ollama { url } => assert_eq!(url, "http://localhost:11434"),
            _ => panic!("Expected Ollama provider"),
        }
        assert!(config.provider.has_credentials());
    }

    #[test]
    fn test_with_provider_moves_default_model() {
        let config = LlmConfig::default().with_provider(LlmProvider::ollama());
        assert_eq!(config.model, DEFAULT_OLLAMA_MODEL);
        assert_eq!(config.provider.name(), "ollama");

        let config = config.with_provider(LlmProvider::gemini());
        assert_eq!(config.model, DEFAULT_MODEL);

        let config = LlmConfig::default()
            .with_model("codellama")
            .with_provider(LlmProvider::ollama());
        assert_eq!(config.model, "codellama");
    }

    #[test]
    fn test_temperature_clamp() {
        let config = LlmConfig::default().with_temperature(5.0);
        assert!((config.temperature - 2.0).abs() < f32::EPSILON);

        let config = LlmConfig::default().with_temperature(-1.0);
        assert!(config.temperature.abs() < f32::EPSILON);
    }

    #[test]
    fn test_with_api_key_ignored_for_ollama() {
        let config = LlmConfig::ollama("llama3.2").with_api_key("secret");
        assert_eq!(config.provider, LlmProvider::ollama());

        let config = LlmConfig::default().with_api_key("secret");
        assert!(config.provider.has_credentials());
    }

    #[test]
    fn test_blank_api_key_is_not_a_credential() {
        let config = LlmConfig::gemini("   ");
        assert!(!config.provider.has_credentials());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(LlmConfig::default().with_model(" ").validate().is_err());
        assert!(LlmConfig::default().with_timeout(0).validate().is_err());

        let mut config = LlmConfig::default();
        config.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = LlmConfig::gemini("super-secret-key");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: LlmConfig = toml::from_str(
            r#"
            model = "mistral"
            temperature = 0.2

            [provider]
            kind = "ollama"
            url = "http://gpu-box:11434"
            "#,
        )
        .unwrap();

        assert_eq!(config.model, "mistral");
        assert_eq!(config.timeout_seconds, 120);
        assert_eq!(
            config.provider,
            LlmProvider::Ollama {
                url: "http://gpu-box:11434".to_string()
            }
        );
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = LlmConfig::gemini("super-secret-key");
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("super-secret-key"));
        assert!(json.contains("gemini"));
    }
}
