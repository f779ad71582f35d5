//! Block splitting
//!
//! Raw DDL is divided into independently translatable blocks on blank-line
//! boundaries. This is a text heuristic, not a SQL parser: statements that
//! are only separated by `;` on adjacent lines stay in one block.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Separator between blocks
const BLOCK_SEPARATOR: &str = "\n\n";

/// One independently translatable unit of DDL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DdlBlock {
    /// 0-based position among the surviving blocks
    pub index: usize,
    /// Trimmed block text
    pub content: String,
    /// SHA-256 of `content`, lowercase hex
    pub content_hash: String,
}

impl DdlBlock {
    /// Create a block, computing its content hash
    pub fn new(index: usize, content: impl Into<String>) -> Self {
        let content = content.into();
        let content_hash = content_hash(&content);
        Self {
            index,
            content,
            content_hash,
        }
    }

    /// 1-based position, as shown to users
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

/// Content-addressed identifier of a block's text
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Split raw DDL text into ordered, non-empty blocks
///
/// Outer whitespace is trimmed, the text is split on blank lines, each piece
/// is trimmed and empty pieces are dropped. CRLF line endings are treated as
/// LF. Never fails; `None`, empty or whitespace-only input yields no blocks.
pub fn split_blocks(text: Option<&str>) -> Vec<DdlBlock> {
    let Some(text) = text else {
        return Vec::new();
    };

    let normalized = text.replace("\r\n", "\n");
    normalized
        .trim()
        .split(BLOCK_SEPARATOR)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .enumerate()
        .map(|(index, piece)| DdlBlock::new(index, piece))
        .collect()
}
