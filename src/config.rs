//! Application configuration
//!
//! Settings come from an optional TOML file; the API key is normally taken
//! from the environment. Once loaded the configuration is immutable and is
//! passed explicitly to the client and converter constructors.
//!
//! ```toml
//! [llm]
//! model = "gemini-2.0-flash"
//! temperature = 0.3
//!
//! [llm.provider]
//! kind = "gemini"
//!
//! [converter]
//! max_concurrency = 2
//! dedupe_blocks = true
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::convert::ConverterConfig;
use crate::llm::{LlmConfig, LlmProvider};

/// Environment variables consulted for the API key, in priority order
pub const API_KEY_ENV_VARS: &[&str] = &["MIGRATEIQ_API_KEY", "GOOGLE_API_KEY"];

/// Errors loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Model invoker settings
    #[serde(default)]
    pub llm: LlmConfig,
    /// Pipeline settings
    #[serde(default)]
    pub converter: ConverterConfig,
}

impl AppConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        toml::from_str::<AppConfig>(text)
            .map(AppConfig::with_provider_model)
            .map_err(|e| ConfigError::Parse {
                path: PathBuf::from("<inline>"),
                message: e.to_string(),
            })
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&text).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config.with_provider_model())
    }

    /// An omitted model follows the configured provider
    fn with_provider_model(mut self) -> Self {
        let provider = self.llm.provider.clone();
        self.llm = self.llm.with_provider(provider);
        self
    }

    /// Apply environment overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides using the given lookup
    ///
    /// The first non-empty variable of [`API_KEY_ENV_VARS`] replaces any key
    /// from the file.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let key = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| lookup(var))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());

        if let (Some(key), LlmProvider::Gemini { .. }) = (key, &self.llm.provider) {
            self.llm = self.llm.with_api_key(key);
        }
        self
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.llm.validate().map_err(ConfigError::Invalid)?;
        self.converter.validate().map_err(ConfigError::Invalid)?;
        Ok(())
    }
}
