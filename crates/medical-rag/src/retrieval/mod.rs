//! Similarity retrieval over the vector index

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::RetrievedRecord;

/// Embeds a query and fetches the nearest chunks from one index
pub struct Retriever {
    store: Arc<dyn VectorStoreProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    index_name: String,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever over an existing index
    pub fn new(
        store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        index_name: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            store,
            embedder,
            index_name: index_name.into(),
            top_k,
        }
    }

    /// Create from configuration (`vector_db.index_name`, `retrieval.top_k`)
    pub fn from_config(
        config: &RagConfig,
        store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self::new(store, embedder, config.vector_db.index_name.clone(), config.retrieval.top_k)
    }

    /// Number of records returned per query
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top-k records for `query`, best first
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedRecord>> {
        let vector = self.embedder.embed(query).await?;
        let mut records = self.store.query(&self.index_name, &vector, self.top_k).await?;
        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        records.truncate(self.top_k);

        tracing::debug!(
            "Retrieved {} records from '{}' (best score {:?})",
            records.len(),
            self.index_name,
            records.first().map(|r| r.score)
        );

        Ok(records)
    }
}
