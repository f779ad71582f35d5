//! Conversion pipeline
//!
//! Drives split → prompt → invoke → clean across all blocks and reassembles
//! the successful results in original order. Per-block failures are logged
//! and recorded; the run only fails when no block succeeded.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use super::block::{DdlBlock, split_blocks};
use super::clean::clean_response;
use super::config::ConverterConfig;
use super::error::{BlockError, BlockFailure, ConvertError, ConvertResult};
use crate::llm::{LlmClient, LlmError, build_prompt, estimate_tokens};

/// Separator placed between converted blocks
pub const OUTPUT_SEPARATOR: &str = "\n\n";

/// Outcome of converting one block
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// Cleaned Snowflake DDL
    Succeeded { cleaned: String },
    /// Block skipped from the output
    Failed { reason: BlockError },
}

impl BlockOutcome {
    /// Check if the block produced output
    pub fn is_success(&self) -> bool {
        matches!(self, BlockOutcome::Succeeded { .. })
    }

    /// Cleaned text, if the block succeeded
    pub fn cleaned(&self) -> Option<&str> {
        match self {
            BlockOutcome::Succeeded { cleaned } => Some(cleaned),
            BlockOutcome::Failed { .. } => None,
        }
    }
}

/// Per-block entry of a conversion report
#[derive(Debug, Clone)]
pub struct BlockReport {
    /// 0-based block index
    pub index: usize,
    /// Content hash of the source block
    pub content_hash: String,
    /// What happened
    pub outcome: BlockOutcome,
    /// Model calls made for this block (0 when reused)
    pub attempts: usize,
    /// Time spent on this block in milliseconds
    pub duration_ms: u64,
    /// Outcome copied from an identical earlier block
    pub reused: bool,
}

impl BlockReport {
    /// 1-based block number
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Report from a conversion run
#[derive(Debug, Clone)]
pub struct ConversionReport {
    /// Run ID
    pub run_id: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Model that answered
    pub model: String,
    /// One entry per block, in input order
    pub blocks: Vec<BlockReport>,
    /// Successful blocks joined with a blank line
    pub output: String,
    /// Total duration in milliseconds
    pub duration_ms: u64,
}

impl ConversionReport {
    /// Number of blocks that produced output
    pub fn succeeded(&self) -> usize {
        self.blocks.iter().filter(|b| b.outcome.is_success()).count()
    }

    /// Failed blocks with 1-based numbers
    pub fn failures(&self) -> Vec<BlockFailure> {
        failures_of(&self.blocks)
    }

    /// 1-based numbers of the failed blocks
    pub fn failed_blocks(&self) -> Vec<usize> {
        self.failures().into_iter().map(|f| f.block).collect()
    }

    /// Some blocks failed but output was still produced
    pub fn is_degraded(&self) -> bool {
        self.succeeded() < self.blocks.len()
    }
}

fn failures_of(blocks: &[BlockReport]) -> Vec<BlockFailure> {
    blocks
        .iter()
        .filter_map(|b| match &b.outcome {
            BlockOutcome::Failed { reason } => Some(BlockFailure {
                block: b.number(),
                reason: reason.clone(),
            }),
            BlockOutcome::Succeeded { .. } => None,
        })
        .collect()
}

/// Oracle to Snowflake DDL converter
///
/// Holds an immutable model client and configuration. Blocks never share
/// mutable state, so a converter can serve many runs.
pub struct DdlConverter {
    client: Arc<dyn LlmClient>,
    config: ConverterConfig,
}

impl DdlConverter {
    /// Create a new converter
    pub fn new(client: Arc<dyn LlmClient>, config: ConverterConfig) -> ConvertResult<Self> {
        config.validate().map_err(ConvertError::Config)?;
        Ok(Self { client, config })
    }

    /// Get the configuration
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Blocks and the prompts that would be sent, without calling the model
    pub fn preview(raw_ddl: &str) -> Vec<(DdlBlock, String)> {
        split_blocks(Some(raw_ddl))
            .into_iter()
            .map(|block| {
                let prompt = build_prompt(&block);
                (block, prompt)
            })
            .collect()
    }

    /// Convert raw Oracle DDL into Snowflake DDL
    ///
    /// Returns the successful blocks joined with a blank line, even if some
    /// blocks failed.
    pub async fn convert(&self, raw_ddl: &str) -> ConvertResult<String> {
        self.convert_with_report(raw_ddl)
            .await
            .map(|report| report.output)
    }

    /// Convert and return the full per-block report
    pub async fn convert_with_report(&self, raw_ddl: &str) -> ConvertResult<ConversionReport> {
        self.convert_with_cancel(raw_ddl, &CancellationToken::new())
            .await
    }

    /// Convert, aborting with [`ConvertError::Cancelled`] once `cancel` fires
    pub async fn convert_with_cancel(
        &self,
        raw_ddl: &str,
        cancel: &CancellationToken,
    ) -> ConvertResult<ConversionReport> {
        let blocks = split_blocks(Some(raw_ddl));
        if blocks.is_empty() {
            error!("No valid DDL found in input");
            return Err(ConvertError::EmptyInput);
        }

        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("ddl_conversion", run_id = %run_id, blocks = blocks.len());

        async {
            let started_at = Utc::now();
            let start = Instant::now();

            info!(
                model = self.client.model_name(),
                blocks = blocks.len(),
                max_concurrency = self.config.max_concurrency,
                "Starting conversion"
            );

            if cancel.is_cancelled() {
                return Err(ConvertError::Cancelled);
            }

            let reports = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!("Conversion cancelled");
                    return Err(ConvertError::Cancelled);
                }
                reports = self.run_blocks(&blocks) => reports,
            };

            let chunks: Vec<&str> = reports
                .iter()
                .filter_map(|report| report.outcome.cleaned())
                .collect();

            if chunks.is_empty() {
                let failures = failures_of(&reports);
                error!(blocks = reports.len(), "No valid Snowflake DDL was generated");
                return Err(ConvertError::AllBlocksFailed { failures });
            }

            let output = chunks.join(OUTPUT_SEPARATOR);
            let duration_ms = start.elapsed().as_millis() as u64;

            info!(
                succeeded = chunks.len(),
                failed = reports.len() - chunks.len(),
                duration_ms,
                "Conversion completed"
            );

            Ok(ConversionReport {
                run_id: run_id.clone(),
                started_at,
                model: self.client.model_name().to_string(),
                blocks: reports,
                output,
                duration_ms,
            })
        }
        .instrument(span)
        .await
    }

    /// Convert every block, returning reports in input order
    async fn run_blocks(&self, blocks: &[DdlBlock]) -> Vec<BlockReport> {
        // Each block maps to the slot of the invocation that answers it
        let mut targets: Vec<&DdlBlock> = Vec::with_capacity(blocks.len());
        let mut slots = Vec::with_capacity(blocks.len());
        let mut first_slot: HashMap<&str, usize> = HashMap::new();
        for block in blocks {
            let slot = match first_slot.get(block.content_hash.as_str()) {
                Some(&slot) if self.config.dedupe_blocks => slot,
                _ => {
                    targets.push(block);
                    first_slot
                        .entry(block.content_hash.as_str())
                        .or_insert(targets.len() - 1);
                    targets.len() - 1
                }
            };
            slots.push(slot);
        }

        // `buffered` yields in submission order regardless of completion order
        let results: Vec<(BlockOutcome, usize, u64)> =
            stream::iter(targets.iter().map(|block| self.convert_block(block)))
                .buffered(self.config.max_concurrency)
                .collect()
                .await;

        blocks
            .iter()
            .zip(slots)
            .map(|(block, slot)| {
                let (outcome, attempts, duration_ms) = &results[slot];
                let reused = targets[slot].index != block.index;
                if reused {
                    debug!(
                        block = block.number(),
                        first_block = targets[slot].number(),
                        "Reusing result of identical block"
                    );
                    if let BlockOutcome::Failed { reason } = outcome {
                        warn!(
                            block = block.number(),
                            content_hash = %block.content_hash,
                            "Skipping block {}: {}",
                            block.number(),
                            reason
                        );
                    }
                }
                BlockReport {
                    index: block.index,
                    content_hash: block.content_hash.clone(),
                    outcome: outcome.clone(),
                    attempts: if reused { 0 } else { *attempts },
                    duration_ms: if reused { 0 } else { *duration_ms },
                    reused,
                }
            })
            .collect()
    }

    /// Convert one block, retrying retryable failures per the configuration
    async fn convert_block(&self, block: &DdlBlock) -> (BlockOutcome, usize, u64) {
        let start = Instant::now();
        let prompt = build_prompt(block);

        debug!(
            block = block.number(),
            content_hash = %block.content_hash,
            prompt_tokens = estimate_tokens(&prompt),
            "Converting block"
        );
        if self.config.verbose {
            debug!("Prompt for block {}:\n{}", block.number(), prompt);
        }

        let mut attempts = 0;
        let outcome = loop {
            attempts += 1;
            match self.invoke(&prompt, block).await {
                Ok(cleaned) => break BlockOutcome::Succeeded { cleaned },
                Err(reason) if reason.is_retryable() && attempts <= self.config.max_retries => {
                    let delay = self.retry_delay(&reason);
                    warn!(
                        block = block.number(),
                        attempt = attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Block {} attempt {} failed, retrying: {}",
                        block.number(),
                        attempts,
                        reason
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(reason) => {
                    warn!(
                        block = block.number(),
                        content_hash = %block.content_hash,
                        attempts,
                        "Skipping block {}: {}",
                        block.number(),
                        reason
                    );
                    break BlockOutcome::Failed { reason };
                }
            }
        };

        (outcome, attempts, start.elapsed().as_millis() as u64)
    }

    /// Wait before the next attempt: the service's hint or the configured
    /// delay, whichever is longer
    fn retry_delay(&self, reason: &BlockError) -> Duration {
        let configured = Duration::from_millis(self.config.retry_delay_ms);
        reason
            .retry_after()
            .map(Duration::from_secs)
            .map_or(configured, |hinted| hinted.max(configured))
    }

    /// One model call plus cleaning
    async fn invoke(&self, prompt: &str, block: &DdlBlock) -> Result<String, BlockError> {
        let call = self.client.complete(prompt);
        let raw = match self.config.block_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| BlockError::Timeout {
                    seconds: limit.as_secs(),
                })??,
            None => call.await?,
        };

        if self.config.verbose {
            debug!("Raw response for block {}:\n{}", block.number(), raw);
        }

        if raw.trim().is_empty() {
            return Err(LlmError::EmptyResponse.into());
        }

        let cleaned = clean_response(Some(&raw));
        if cleaned.is_empty() {
            return Err(BlockError::EmptyAfterCleaning);
        }
        Ok(cleaned)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::llm::{LlmResult, MockLlmClient};

    fn converter(client: Arc<dyn LlmClient>) -> DdlConverter {
        DdlConverter::new(client, ConverterConfig::default()).unwrap()
    }

    /// Echoes the block back, sleeping longer for earlier blocks
    struct DelayedEcho;

    #[async_trait]
    impl LlmClient for DelayedEcho {
        async fn complete(&self, prompt: &str) -> LlmResult<String> {
            let block = prompt
                .split("```sql\n")
                .nth(1)
                .and_then(|rest| rest.split("\n```").next())
                .unwrap_or_default()
                .to_string();
            let delay = if block.contains("slow") { 50 } else { 1 };
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(format!("```sql\n{block}\n```"))
        }

        fn model_name(&self) -> &str {
            "delayed-echo"
        }
    }

    /// Never answers
    struct Stalled;

    #[async_trait]
    impl LlmClient for Stalled {
        async fn complete(&self, _prompt: &str) -> LlmResult<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("CREATE TABLE late (id NUMBER);".to_string())
        }

        fn model_name(&self) -> &str {
            "stalled"
        }
    }

    /// Fails the first call, then never answers
    struct FailThenStall {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmClient for FailThenStall {
        async fn complete(&self, _prompt: &str) -> LlmResult<String> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(LlmError::InvalidResponse("blocked".to_string()));
            }
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("late".to_string())
        }

        fn model_name(&self) -> &str {
            "fail-then-stall"
        }
    }

    /// Log sink shared with a test subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_two_blocks_joined_with_blank_line() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Ok("```sql\nCREATE TABLE a (id NUMBER(38,0));\n```".to_string()),
            Ok("Snowflake DDL:\nCREATE TABLE b (id NUMBER(38,0));".to_string()),
        ]));
        let converter = converter(client.clone());

        let output = converter
            .convert("CREATE TABLE a (id NUMBER);\n\nCREATE TABLE b (id NUMBER);")
            .await
            .unwrap();

        assert_eq!(
            output,
            "CREATE TABLE a (id NUMBER(38,0));\n\nCREATE TABLE b (id NUMBER(38,0));"
        );
        let prompts = client.prompts();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("CREATE TABLE a (id NUMBER);"));
        assert!(prompts[1].contains("CREATE TABLE b (id NUMBER);"));
    }

    #[tokio::test]
    async fn test_empty_input_makes_no_calls() {
        let client = Arc::new(MockLlmClient::new("unused"));
        let converter = converter(client.clone());

        assert!(matches!(
            converter.convert("").await,
            Err(ConvertError::EmptyInput)
        ));
        assert!(matches!(
            converter.convert(" \n\n \n").await,
            Err(ConvertError::EmptyInput)
        ));
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_blocks_failed() {
        let converter = converter(Arc::new(MockLlmClient::failing()));
        match converter.convert("A;\n\nB;\n\nC;").await {
            Err(ConvertError::AllBlocksFailed { failures }) => {
                let blocks: Vec<usize> = failures.iter().map(|f| f.block).collect();
                assert_eq!(blocks, vec![1, 2, 3]);
                assert!(matches!(failures[0].reason, BlockError::Invocation(_)));
            }
            other => panic!("Expected AllBlocksFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_order() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Ok("OUT A;".to_string()),
            Err(LlmError::ConnectionError("reset".to_string())),
            Ok("OUT C;".to_string()),
        ]));
        let converter = converter(client);

        let report = converter
            .convert_with_report("A;\n\nB;\n\nC;")
            .await
            .unwrap();

        assert_eq!(report.output, "OUT A;\n\nOUT C;");
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed_blocks(), vec![2]);
        assert!(report.is_degraded());
        assert_eq!(report.model, "mock-model");
    }

    #[tokio::test]
    async fn test_empty_responses_are_block_failures() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Ok("   ".to_string()),
            Ok("```sql\n```".to_string()),
            Ok("CREATE TABLE c (id INT);".to_string()),
        ]));
        let converter = converter(client);

        let report = converter
            .convert_with_report("A;\n\nB;\n\nC;")
            .await
            .unwrap();

        assert_eq!(
            report.blocks[0].outcome,
            BlockOutcome::Failed {
                reason: BlockError::Invocation(LlmError::EmptyResponse)
            }
        );
        assert_eq!(
            report.blocks[1].outcome,
            BlockOutcome::Failed {
                reason: BlockError::EmptyAfterCleaning
            }
        );
        assert_eq!(report.output, "CREATE TABLE c (id INT);");
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_recovers_transient_failure() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Err(LlmError::RateLimited(1)),
            Ok("OUT;".to_string()),
        ]));
        let converter = DdlConverter::new(
            client.clone(),
            ConverterConfig::default().with_retries(1, 0),
        )
        .unwrap();

        let report = converter.convert_with_report("A;").await.unwrap();
        assert_eq!(report.output, "OUT;");
        assert_eq!(report.blocks[0].attempts, 2);
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_hint_delays_retry() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Err(LlmError::RateLimited(60)),
            Ok("OUT;".to_string()),
        ]));
        let converter = DdlConverter::new(
            client.clone(),
            ConverterConfig::default().with_retries(1, 500),
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        let output = converter.convert("A;").await.unwrap();

        assert_eq!(output, "OUT;");
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_delay_wins_over_shorter_hint() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Err(LlmError::ConnectionError("reset".to_string())),
            Ok("OUT;".to_string()),
        ]));
        let converter = DdlConverter::new(
            client,
            ConverterConfig::default().with_retries(1, 10_000),
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        converter.convert("A;").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_non_retryable_failure_not_retried() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Err(LlmError::InvalidResponse("blocked".to_string())),
            Ok("OUT B;".to_string()),
        ]));
        let converter = DdlConverter::new(
            client.clone(),
            ConverterConfig::default().with_retries(3, 0),
        )
        .unwrap();

        let report = converter.convert_with_report("A;\n\nB;").await.unwrap();
        assert_eq!(report.blocks[0].attempts, 1);
        assert_eq!(report.output, "OUT B;");
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_dedupe_invokes_once_per_content() {
        let client = Arc::new(MockLlmClient::scripted(vec![
            Ok("OUT A;".to_string()),
            Ok("OUT B;".to_string()),
        ]));
        let converter = DdlConverter::new(
            client.clone(),
            ConverterConfig::default().with_dedupe(true),
        )
        .unwrap();

        let report = converter
            .convert_with_report("A;\n\nB;\n\nA;")
            .await
            .unwrap();

        assert_eq!(client.calls(), 2);
        assert_eq!(report.output, "OUT A;\n\nOUT B;\n\nOUT A;");
        assert!(report.blocks[2].reused);
        assert_eq!(report.blocks[2].attempts, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_results_keep_input_order() {
        let converter = DdlConverter::new(
            Arc::new(DelayedEcho),
            ConverterConfig::default().with_max_concurrency(3),
        )
        .unwrap();

        let output = converter
            .convert("CREATE TABLE slow (id NUMBER);\n\nCREATE TABLE b (id NUMBER);\n\nCREATE TABLE c (id NUMBER);")
            .await
            .unwrap();

        assert_eq!(
            output,
            "CREATE TABLE slow (id NUMBER);\n\nCREATE TABLE b (id NUMBER);\n\nCREATE TABLE c (id NUMBER);"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_block_timeout() {
        let converter = DdlConverter::new(
            Arc::new(Stalled),
            ConverterConfig::default().with_block_timeout(Some(5)),
        )
        .unwrap();

        match converter.convert("A;").await {
            Err(ConvertError::AllBlocksFailed { failures }) => {
                assert_eq!(failures[0].reason, BlockError::Timeout { seconds: 5 });
            }
            other => panic!("Expected AllBlocksFailed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation() {
        let converter = DdlConverter::new(
            Arc::new(Stalled),
            ConverterConfig::default().with_block_timeout(None),
        )
        .unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        assert!(matches!(
            converter.convert_with_cancel("A;\n\nB;", &token).await,
            Err(ConvertError::Cancelled)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_block_logged_before_cancellation() {
        let logs = CapturedLogs::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let converter = DdlConverter::new(
            Arc::new(FailThenStall {
                calls: AtomicUsize::new(0),
            }),
            ConverterConfig::default().with_block_timeout(None),
        )
        .unwrap();

        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        assert!(matches!(
            converter.convert_with_cancel("A;\n\nB;", &token).await,
            Err(ConvertError::Cancelled)
        ));
        let text = logs.text();
        assert!(text.contains("Skipping block 1"), "logs: {text}");
        assert!(!text.contains("Skipping block 2"));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_calls() {
        let client = Arc::new(MockLlmClient::new("OUT;"));
        let converter = converter(client.clone());
        let token = CancellationToken::new();
        token.cancel();

        assert!(matches!(
            converter.convert_with_cancel("A;", &token).await,
            Err(ConvertError::Cancelled)
        ));
        assert_eq!(client.calls(), 0);
    }

    #[test]
    fn test_preview() {
        let preview = DdlConverter::preview("A;\n\nB;");
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[1].0.content, "B;");
        assert!(preview[1].1.contains("```sql\nB;\n```"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = DdlConverter::new(
            Arc::new(MockLlmClient::new("unused")),
            ConverterConfig::default().with_max_concurrency(0),
        );
        assert!(matches!(result, Err(ConvertError::Config(_))));
    }
}
