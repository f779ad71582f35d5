//! Prompt template for Oracle to Snowflake DDL translation
//!
//! The prompt is a fixed template with the block content embedded verbatim
//! in a fenced `sql` region. Construction is deterministic.

use crate::convert::DdlBlock;

/// Prompt template for translating one DDL block
pub const TRANSLATION_PROMPT_TEMPLATE: &str = r#"You are a SQL expert specializing in converting Oracle DDL to Snowflake DDL.
Given the following Oracle DDL block, convert it to equivalent Snowflake DDL.
Preserve object names and basic structure. Focus on data type conversion and syntax differences.
Return only the Snowflake DDL, no extra text.

Oracle DDL Block:
```sql
{block}
```

Note: While creating the table DDLs, please handle the following points with alternative approaches:
   1. UNIQUE INDEX -> Unique Constraints (Informational, no enforcement) or ETL logic for uniqueness enforcement.
   2. PARTITION BY RANGE -> Clustering Keys with Micro-partitioning.
   3. BITMAP INDEX -> Clustering Keys and Query Pruning.
   These are not supported in Snowflake."#;

/// Build the instruction sent to the model for one block
pub fn build_prompt(block: &DdlBlock) -> String {
    build_prompt_for(&block.content)
}

/// Build the instruction for raw block text
pub fn build_prompt_for(content: &str) -> String {
    // `replacen` so a block that itself contains the placeholder is left intact
    TRANSLATION_PROMPT_TEMPLATE.replacen("{block}", content, 1)
}

/// Estimate the token count for a piece of text
///
/// Uses a rough estimate of 4 characters per token
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}
