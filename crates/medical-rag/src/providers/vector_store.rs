//! Vector store provider trait for index management, upsert and similarity query

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{Metadata, RetrievedRecord};

/// Similarity metric an index is created with
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Angle between vectors, magnitude ignored
    #[default]
    Cosine,
    /// Euclidean distance
    Euclidean,
    /// Raw dot product
    DotProduct,
}

impl DistanceMetric {
    /// Wire name used by the hosted index API
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Euclidean => "euclidean",
            DistanceMetric::DotProduct => "dotproduct",
        }
    }
}

/// Parameters for creating an index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSpec {
    /// Vector dimension
    pub dimension: usize,
    /// Similarity metric
    pub metric: DistanceMetric,
    /// Serverless cloud (e.g. "aws")
    pub cloud: String,
    /// Serverless region (e.g. "us-east-1")
    pub region: String,
}

/// What the store reports about an existing index
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDescription {
    /// Index name
    pub name: String,
    /// Declared vector dimension
    pub dimension: usize,
    /// Similarity metric
    pub metric: DistanceMetric,
    /// Data plane host, when the store has one
    pub host: Option<String>,
    /// Whether the index accepts reads and writes
    pub ready: bool,
}

/// Persisted unit: vector plus chunk text and metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Record id
    pub id: String,
    /// Embedding vector
    pub values: Vec<f32>,
    /// Chunk metadata including the `text` entry
    pub metadata: Metadata,
}

/// Trait for a named-index vector store
///
/// Implementations:
/// - `PineconeStore`: hosted Pinecone serverless indexes
/// - `MemoryVectorStore`: in-process brute-force search
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Whether an index with this name exists
    async fn has_index(&self, name: &str) -> Result<bool>;

    /// Describe an index; `None` if it does not exist
    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>>;

    /// Create an index
    async fn create_index(&self, name: &str, spec: &IndexSpec) -> Result<()>;

    /// Insert or overwrite records by id; returns the number written
    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize>;

    /// Top `top_k` records by descending similarity to `vector`
    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedRecord>>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
