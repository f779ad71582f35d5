//! Error types for DDL conversion
//!
//! Per-block failures ([`BlockError`]) are recorded in the conversion report
//! and logged; they never abort the run. Only run-level conditions
//! ([`ConvertError`]) reach the caller as errors.

use thiserror::Error;

use crate::llm::LlmError;

/// Why a single block produced no output
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BlockError {
    /// The model call failed or returned no usable text
    #[error("model invocation failed: {0}")]
    Invocation(#[from] LlmError),

    /// The model answered but nothing was left after cleaning
    #[error("empty response after cleaning")]
    EmptyAfterCleaning,

    /// The model call did not finish within the per-block timeout
    #[error("model invocation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },
}

impl BlockError {
    /// Check if another attempt could succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BlockError::Invocation(e) => e.is_retryable(),
            BlockError::Timeout { .. } => true,
            BlockError::EmptyAfterCleaning => false,
        }
    }

    /// Underlying model error, if the failure came from the model call
    pub fn llm_error(&self) -> Option<&LlmError> {
        match self {
            BlockError::Invocation(e) => Some(e),
            _ => None,
        }
    }

    /// Wait suggested by the model service before another attempt (in seconds)
    pub fn retry_after(&self) -> Option<u64> {
        self.llm_error().and_then(LlmError::retry_after)
    }
}

/// A failed block, identified by its 1-based number
#[derive(Debug, Clone, PartialEq)]
pub struct BlockFailure {
    /// 1-based block number
    pub block: usize,
    /// What went wrong
    pub reason: BlockError,
}

impl std::fmt::Display for BlockFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "block {}: {}", self.block, self.reason)
    }
}

/// Errors that abort a conversion
#[derive(Error, Debug)]
pub enum ConvertError {
    /// No blocks could be derived from the input
    #[error("No valid DDL found in input")]
    EmptyInput,

    /// Every block failed
    #[error("No valid Snowflake DDL was generated ({} block(s) failed)", .failures.len())]
    AllBlocksFailed { failures: Vec<BlockFailure> },

    /// The run was cancelled before it finished
    #[error("Conversion cancelled")]
    Cancelled,

    /// Converter configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for conversion operations
pub type ConvertResult<T> = Result<T, ConvertError>;

impl ConvertError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConvertError::EmptyInput => "No valid DDL found in input.\n\n\
                Hint: Separate statements with a blank line and check the file is not empty."
                .to_string(),
            ConvertError::AllBlocksFailed { failures } => {
                let mut msg = String::from("No valid Snowflake DDL was generated.\n");
                for failure in failures {
                    msg.push_str(&format!("  - {failure}\n"));
                }
                if let Some(hint) = failures.iter().find_map(|f| match &f.reason {
                    BlockError::Invocation(e) if e.user_message() != e.to_string() => {
                        Some(e.user_message())
                    }
                    _ => None,
                }) {
                    msg.push('\n');
                    msg.push_str(&hint);
                }
                msg
            }
            ConvertError::Cancelled => "Conversion cancelled by user.".to_string(),
            ConvertError::Config(msg) => {
                format!("Configuration error: {msg}\n\nHint: Check your configuration file.")
            }
        }
    }
}
