//! LLM client trait and test double
//!
//! The converter depends only on [`LlmClient`]: given a prompt, return text or
//! fail. Provider implementations live in the sibling `gemini` and `ollama`
//! modules.

use async_trait::async_trait;

#[cfg(test)]
use super::error::LlmError;
use super::error::LlmResult;

/// Trait for LLM client implementations
///
/// Implementations hold their configuration (credentials, model, sampling
/// temperature) immutably and are shared across all blocks of a conversion,
/// possibly concurrently.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a completion for the given prompt
    ///
    /// # Arguments
    /// * `prompt` - The input prompt for the LLM
    ///
    /// # Returns
    /// The generated text response
    async fn complete(&self, prompt: &str) -> LlmResult<String>;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

/// A mock LLM client for testing
///
/// Replies are consumed in call order; once the script runs out the last
/// reply is repeated.
#[cfg(test)]
pub struct MockLlmClient {
    replies: std::sync::Mutex<std::collections::VecDeque<LlmResult<String>>>,
    last: std::sync::Mutex<Option<LlmResult<String>>>,
    prompts: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockLlmClient {
    /// Create a new mock client that always returns the given response
    pub fn new(response: impl Into<String>) -> Self {
        Self::scripted(vec![Ok(response.into())])
    }

    /// Create a mock client that always fails
    pub fn failing() -> Self {
        Self::scripted(vec![Err(LlmError::ConnectionError(
            "Mock failure".to_string(),
        ))])
    }

    /// Create a mock client replaying the given results in order
    pub fn scripted(replies: Vec<LlmResult<String>>) -> Self {
        Self {
            replies: std::sync::Mutex::new(replies.into()),
            last: std::sync::Mutex::new(None),
            prompts: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Number of calls made so far
    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> LlmResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.replies.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        match next {
            Some(reply) => {
                *last = Some(reply.clone());
                reply
            }
            None => last.clone().unwrap_or(Err(LlmError::EmptyResponse)),
        }
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}
