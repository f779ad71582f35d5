//! MigrateIQ - Oracle to Snowflake DDL conversion
//!
//! Converts Oracle DDL scripts into Snowflake-compatible DDL by sending each
//! blank-line-separated block to a large language model and cleaning what
//! comes back:
//! - Block splitting (`convert::split_blocks`)
//! - Prompt construction (`llm::build_prompt`)
//! - Model invocation behind the `llm::LlmClient` trait (Gemini, Ollama)
//! - Response cleaning (`convert::clean_response`)
//! - Orchestration with per-block failure isolation (`convert::DdlConverter`)
//!
//! ```ignore
//! use migrateiq::{AppConfig, DdlConverter, build_client};
//!
//! let config = AppConfig::load("migrateiq.toml")?.with_env();
//! let client = build_client(&config.llm)?;
//! let converter = DdlConverter::new(client, config.converter)?;
//! let snowflake_ddl = converter.convert(&oracle_ddl).await?;
//! ```

pub mod cli;
pub mod config;
pub mod convert;
pub mod input;
pub mod llm;

pub use config::{AppConfig, ConfigError};
pub use convert::{
    BlockError, BlockFailure, BlockOutcome, BlockReport, ConversionReport, ConvertError,
    ConvertResult, ConverterConfig, DdlBlock, DdlConverter, clean_response, split_blocks,
};
pub use input::{DdlSource, InputError, output_file_name};
pub use llm::{
    LlmClient, LlmConfig, LlmError, LlmProvider, LlmResult, build_client, build_prompt,
};
