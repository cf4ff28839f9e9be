//! Document and chunk types with source tracking

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Metadata key holding the originating file path
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding the page label within the file
pub const PAGE_LABEL_KEY: &str = "page_label";
/// Metadata key holding the 0-based page index
pub const PAGE_KEY: &str = "page";
/// Metadata key holding the page count of the file
pub const TOTAL_PAGES_KEY: &str = "total_pages";

/// Ordered string metadata attached to documents, chunks and index records
pub type Metadata = BTreeMap<String, String>;

/// One page of extracted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Raw page text
    pub page_content: String,
    /// Source metadata
    pub metadata: Metadata,
}

impl Document {
    /// Create a new document
    pub fn new(page_content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }

    /// Originating file path
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }

    /// Page label within the file
    pub fn page_label(&self) -> Option<&str> {
        self.metadata.get(PAGE_LABEL_KEY).map(String::as_str)
    }
}

/// Bounded span of a document's text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text
    pub content: String,
    /// Metadata inherited from the parent document
    pub metadata: Metadata,
    /// Position of this chunk inside its parent document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(content: impl Into<String>, metadata: Metadata, chunk_index: u32) -> Self {
        Self {
            content: content.into(),
            metadata,
            chunk_index,
        }
    }

    /// Stable record id: the same chunk always maps to the same id, so
    /// re-ingesting overwrites instead of duplicating.
    pub fn record_id(&self) -> String {
        let mut hasher = Sha256::new();
        for key in [SOURCE_KEY, PAGE_LABEL_KEY] {
            hasher.update(self.metadata.get(key).map(String::as_str).unwrap_or("").as_bytes());
            hasher.update([0u8]);
        }
        hasher.update(self.chunk_index.to_le_bytes());
        hasher.update(self.content.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(source: &str, label: &str) -> Metadata {
        Metadata::from([
            (SOURCE_KEY.to_string(), source.to_string()),
            (PAGE_LABEL_KEY.to_string(), label.to_string()),
        ])
    }

    #[test]
    fn test_record_id_is_stable() {
        let a = Chunk::new("Aspirin is used to reduce pain.", meta("/data/a.pdf", "1"), 0);
        let b = a.clone();
        assert_eq!(a.record_id(), b.record_id());
        assert_eq!(a.record_id().len(), 64);
    }

    #[test]
    fn test_record_id_depends_on_position_and_source() {
        let a = Chunk::new("same text", meta("/data/a.pdf", "1"), 0);
        let b = Chunk::new("same text", meta("/data/a.pdf", "1"), 1);
        let c = Chunk::new("same text", meta("/data/b.pdf", "1"), 0);
        assert_ne!(a.record_id(), b.record_id());
        assert_ne!(a.record_id(), c.record_id());
    }
}
