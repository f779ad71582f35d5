//! Converter configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the converter schedules and guards model calls
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConverterConfig {
    /// Per-invocation timeout in seconds (`None` disables the guard)
    #[serde(default = "default_block_timeout_seconds")]
    pub block_timeout_seconds: Option<u64>,

    /// Number of blocks in flight at once (1 = strictly sequential)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Invoke the model once per distinct block content
    #[serde(default)]
    pub dedupe_blocks: bool,

    /// Extra attempts for retryable failures
    #[serde(default)]
    pub max_retries: usize,

    /// Delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Log prompts and raw responses at debug level
    #[serde(default)]
    pub verbose: bool,
}

fn default_block_timeout_seconds() -> Option<u64> {
    Some(180)
}

fn default_max_concurrency() -> usize {
    1
}

fn default_retry_delay_ms() -> u64 {
    500
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            block_timeout_seconds: default_block_timeout_seconds(),
            max_concurrency: default_max_concurrency(),
            dedupe_blocks: false,
            max_retries: 0,
            retry_delay_ms: default_retry_delay_ms(),
            verbose: false,
        }
    }
}

impl ConverterConfig {
    /// Create a new converter config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-invocation timeout
    pub fn with_block_timeout(mut self, seconds: Option<u64>) -> Self {
        self.block_timeout_seconds = seconds;
        self
    }

    /// Set the number of concurrent invocations
    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    /// Enable per-run memoization of identical blocks
    pub fn with_dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe_blocks = dedupe;
        self
    }

    /// Set retry policy
    pub fn with_retries(mut self, retries: usize, delay_ms: u64) -> Self {
        self.max_retries = retries;
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Enable verbose logging
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Per-invocation timeout as a duration
    pub fn block_timeout(&self) -> Option<Duration> {
        self.block_timeout_seconds.map(Duration::from_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrency == 0 {
            return Err("max_concurrency must be at least 1".to_string());
        }
        if self.block_timeout_seconds == Some(0) {
            return Err("block_timeout_seconds must be greater than zero".to_string());
        }
        Ok(())
    }
}
