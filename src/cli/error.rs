//! Error type for CLI commands

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::convert::ConvertError;
use crate::input::InputError;
use crate::llm::LlmError;

/// Errors surfaced by the `migrateiq` binary
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("Failed to write {0}: {1}")]
    FileWriteError(PathBuf, String),
}

impl CliError {
    /// Get a user-friendly error message, with hints where available
    pub fn user_message(&self) -> String {
        match self {
            CliError::Llm(e) => e.user_message(),
            CliError::Convert(e) => e.user_message(),
            CliError::Config(e @ (ConfigError::Read { .. } | ConfigError::Parse { .. })) => {
                format!("{e}\n\nHint: Check the file passed with --config.")
            }
            CliError::Config(e @ ConfigError::Invalid(_)) => format!(
                "{e}\n\nHint: Check the command-line flags (--temperature, --timeout, \
                --concurrency) and any file passed with --config."
            ),
            CliError::InvalidArgument(msg) => {
                format!("Invalid argument: {msg}\n\nRun 'migrateiq convert --help' for usage.")
            }
            other => other.to_string(),
        }
    }
}
