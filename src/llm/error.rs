//! Error types for LLM operations
//!
//! Every failure of a single model call maps onto [`LlmError`]. The converter
//! records these per block instead of propagating them.

use thiserror::Error;

/// Errors that can occur while invoking a language model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Failed to connect to LLM service
    #[error("Failed to connect to LLM service: {0}")]
    ConnectionError(String),

    /// Request timeout
    #[error("LLM request timed out after {0} seconds")]
    Timeout(u64),

    /// Rate limiting
    #[error("Rate limited by LLM service, retry after {0} seconds")]
    RateLimited(u64),

    /// Non-success HTTP status returned by the provider
    #[error("LLM API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The model answered without any text payload
    #[error("LLM returned an empty response")]
    EmptyResponse,

    /// Invalid response from LLM
    #[error("Invalid LLM response: {0}")]
    InvalidResponse(String),

    /// Failed to decode the provider response body
    #[error("Failed to parse LLM response: {0}")]
    ParseError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Feature not available
    #[error("LLM feature not available: {0}. Enable with --features {1}")]
    FeatureNotAvailable(String, String),
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::ParseError(err.to_string())
    }
}

/// Result type for LLM operations
pub type LlmResult<T> = Result<T, LlmError>;

impl LlmError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            LlmError::ConnectionError(msg) => {
                format!(
                    "Failed to connect to LLM service: {msg}\n\n\
                    Hints:\n\
                    - Check your internet connection\n\
                    - Verify the API endpoint is correct\n\
                    - For Ollama: ensure 'ollama serve' is running"
                )
            }
            LlmError::Timeout(secs) => {
                format!(
                    "LLM request timed out after {secs} seconds.\n\n\
                    Hints:\n\
                    - The model may be overloaded, try again later\n\
                    - Split very large DDL files into smaller blocks\n\
                    - Increase timeout with --timeout flag"
                )
            }
            LlmError::RateLimited(secs) => {
                format!(
                    "Rate limited by LLM service. Retry after {secs} seconds.\n\n\
                    Hint: Lower --concurrency or use --retries to back off automatically."
                )
            }
            LlmError::ApiError { status, message } if *status == 401 || *status == 403 => {
                format!(
                    "LLM service rejected the credentials (HTTP {status}): {message}\n\n\
                    Hint: Set MIGRATEIQ_API_KEY or GOOGLE_API_KEY to a valid key."
                )
            }
            LlmError::ConfigError(msg) => {
                format!(
                    "LLM configuration error: {msg}\n\n\
                    Hints:\n\
                    - Set MIGRATEIQ_API_KEY or GOOGLE_API_KEY for Gemini\n\
                    - Use --provider ollama for local models"
                )
            }
            LlmError::FeatureNotAvailable(feature, flag) => {
                format!(
                    "LLM feature '{feature}' not available.\n\n\
                    Hint: Rebuild with --features {flag}"
                )
            }
            _ => self.to_string(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::ConnectionError(_) | LlmError::Timeout(_) | LlmError::RateLimited(_) => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Get suggested wait time before retry (in seconds)
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            LlmError::RateLimited(secs) => Some(*secs),
            LlmError::Timeout(_) => Some(5),
            LlmError::ConnectionError(_) => Some(2),
            LlmError::ApiError { status, .. } if *status >= 500 => Some(2),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LlmError::ConnectionError("Connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "Failed to connect to LLM service: Connection refused"
        );

        let err = LlmError::Timeout(30);
        assert_eq!(err.to_string(), "LLM request timed out after 30 seconds");

        let err = LlmError::ApiError {
            status: 400,
            message: "bad request".to_string(),
        };
        assert_eq!(err.to_string(), "LLM API error (HTTP 400): bad request");

        assert_eq!(
            LlmError::EmptyResponse.to_string(),
            "LLM returned an empty response"
        );
    }

    #[test]
    fn test_error_from_serde() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let llm_err: LlmError = json_err.into();
        assert!(matches!(llm_err, LlmError::ParseError(_)));
    }

    #[test]
    fn test_is_retryable() {
        assert!(LlmError::ConnectionError("reset".to_string()).is_retryable());
        assert!(LlmError::RateLimited(60).is_retryable());
        assert!(
            LlmError::ApiError {
                status: 503,
                message: "unavailable".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "bad".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::EmptyResponse.is_retryable());
        assert!(!LlmError::ConfigError("no key".to_string()).is_retryable());
    }

    #[test]
    fn test_retry_after() {
        assert_eq!(LlmError::RateLimited(30).retry_after(), Some(30));
        assert_eq!(LlmError::Timeout(120).retry_after(), Some(5));
        assert_eq!(LlmError::InvalidResponse("x".to_string()).retry_after(), None);
    }

    #[test]
    fn test_user_message_hints() {
        let msg = LlmError::ConfigError("missing API key".to_string()).user_message();
        assert!(msg.contains("missing API key"));
        assert!(msg.contains("GOOGLE_API_KEY"));

        let msg = LlmError::ApiError {
            status: 403,
            message: "denied".to_string(),
        }
        .user_message();
        assert!(msg.contains("Hint:"));

        let msg = LlmError::EmptyResponse.user_message();
        assert_eq!(msg, LlmError::EmptyResponse.to_string());
    }
}
