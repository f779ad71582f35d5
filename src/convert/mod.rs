//! Oracle to Snowflake DDL conversion
//!
//! This module provides the conversion pipeline:
//! - Block splitting of raw DDL on blank lines
//! - Prompt construction per block (see [`crate::llm::prompt`])
//! - Model invocation through an [`crate::llm::LlmClient`]
//! - Cleanup of the model response down to bare SQL
//! - Reassembly of the successful blocks in input order
//!
//! # Example
//!
//! ```rust,ignore
//! use migrateiq::convert::{ConverterConfig, DdlConverter};
//! use migrateiq::llm::{LlmConfig, build_client};
//!
//! let client = build_client(&LlmConfig::gemini(api_key))?;
//! let converter = DdlConverter::new(client, ConverterConfig::default())?;
//!
//! let snowflake_ddl = converter.convert(&oracle_ddl).await?;
//! ```
//!
//! # Failure policy
//!
//! A failing block is logged and left out of the output; the remaining
//! blocks are still converted. The run fails only when the input holds no
//! blocks ([`ConvertError::EmptyInput`]) or when every block failed
//! ([`ConvertError::AllBlocksFailed`]).

mod block;
mod clean;
mod config;
mod error;
mod pipeline;

pub use block::{DdlBlock, content_hash, split_blocks};
pub use clean::{SNOWFLAKE_DDL_MARKER, clean_response};
pub use config::ConverterConfig;
pub use error::{BlockError, BlockFailure, ConvertError, ConvertResult};
pub use pipeline::{BlockOutcome, BlockReport, ConversionReport, DdlConverter, OUTPUT_SEPARATOR};
