//! Retrieval and answer types

use serde::{Deserialize, Serialize};

use super::document::{Metadata, PAGE_LABEL_KEY, SOURCE_KEY};

/// Metadata key under which index records keep the chunk text
pub const TEXT_KEY: &str = "text";

/// Record returned by a similarity query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedRecord {
    /// Record id in the vector index
    pub id: String,
    /// Chunk text
    pub text: String,
    /// Chunk metadata (without the text)
    pub metadata: Metadata,
    /// Cosine similarity to the query
    pub score: f32,
}

impl RetrievedRecord {
    /// Build from raw index metadata, lifting the `text` entry out
    pub fn from_index_metadata(id: String, mut metadata: Metadata, score: f32) -> Self {
        let text = metadata.remove(TEXT_KEY).unwrap_or_default();
        Self {
            id,
            text,
            metadata,
            score,
        }
    }

    /// Short source reference, e.g. `data/guide.pdf p.12`
    pub fn source_ref(&self) -> String {
        let source = self.metadata.get(SOURCE_KEY).map(String::as_str).unwrap_or("unknown");
        match self.metadata.get(PAGE_LABEL_KEY) {
            Some(label) if !label.is_empty() => format!("{} p.{}", source, label),
            _ => source.to_string(),
        }
    }
}

/// Answer produced by the query pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatAnswer {
    /// Generated answer text
    pub answer: String,
    /// Records used as context, best first
    pub context: Vec<RetrievedRecord>,
    /// End-to-end processing time
    pub processing_time_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_lifted_out_of_metadata() {
        let metadata = Metadata::from([
            (TEXT_KEY.to_string(), "Aspirin is used to reduce pain.".to_string()),
            (SOURCE_KEY.to_string(), "/data/a.pdf".to_string()),
            (PAGE_LABEL_KEY.to_string(), "3".to_string()),
        ]);
        let record = RetrievedRecord::from_index_metadata("id-1".to_string(), metadata, 0.9);

        assert_eq!(record.text, "Aspirin is used to reduce pain.");
        assert!(!record.metadata.contains_key(TEXT_KEY));
        assert_eq!(record.source_ref(), "/data/a.pdf p.3");
    }
}
