//! Embedding chunks and writing them to the vector index

use std::sync::Arc;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, IndexRecord, IndexSpec, VectorStoreProvider};
use crate::types::response::TEXT_KEY;
use crate::types::Chunk;

/// Writes chunk embeddings to a named index, creating it when absent
pub struct Indexer {
    store: Arc<dyn VectorStoreProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    spec: IndexSpec,
    upsert_batch_size: usize,
    embed_batch_size: usize,
}

impl Indexer {
    /// Create an indexer; the index dimension follows the embedder
    pub fn new(
        store: Arc<dyn VectorStoreProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: &RagConfig,
    ) -> Self {
        let spec = IndexSpec {
            dimension: embedder.dimensions(),
            metric: config.vector_db.metric,
            cloud: config.vector_db.cloud.clone(),
            region: config.vector_db.region.clone(),
        };

        Self {
            store,
            embedder,
            spec,
            upsert_batch_size: config.vector_db.upsert_batch_size.max(1),
            embed_batch_size: config.embeddings.batch_size.max(1),
        }
    }

    /// Spec used when the index has to be created
    pub fn index_spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// Create the index if it does not exist; returns whether it was created
    pub async fn ensure_index(&self, name: &str) -> Result<bool> {
        if self.store.has_index(name).await? {
            if let Some(description) = self.store.describe_index(name).await? {
                if description.dimension != self.spec.dimension {
                    return Err(Error::DimensionMismatch {
                        expected: self.spec.dimension,
                        actual: description.dimension,
                    });
                }
            }
            tracing::info!("Using existing index '{}' on {}", name, self.store.name());
            return Ok(false);
        }

        self.store.create_index(name, &self.spec).await?;
        tracing::info!(
            "Created index '{}' on {} ({} dims, {})",
            name,
            self.store.name(),
            self.spec.dimension,
            self.spec.metric.as_str()
        );
        Ok(true)
    }

    /// Upsert embedded chunks in batches; returns the number of records written
    pub async fn upsert(&self, name: &str, pairs: &[(Chunk, Vec<f32>)]) -> Result<usize> {
        if let Some((_, bad)) = pairs.iter().find(|(_, v)| v.len() != self.spec.dimension) {
            return Err(Error::DimensionMismatch {
                expected: self.spec.dimension,
                actual: bad.len(),
            });
        }

        let mut written = 0;
        for batch in pairs.chunks(self.upsert_batch_size) {
            let records: Vec<IndexRecord> = batch
                .iter()
                .map(|(chunk, values)| to_record(chunk, values.clone()))
                .collect();
            written += self.store.upsert(name, &records).await?;
            tracing::debug!("Upserted {} records into '{}'", written, name);
        }

        Ok(written)
    }

    /// Ensure the index, embed every chunk and upsert the results
    pub async fn index_chunks(&self, name: &str, chunks: &[Chunk]) -> Result<usize> {
        self.ensure_index(name).await?;
        self.embed_and_upsert(name, chunks).await
    }

    /// Embed every chunk and upsert into an index that already exists
    pub async fn embed_and_upsert(&self, name: &str, chunks: &[Chunk]) -> Result<usize> {
        let mut written = 0;
        for batch in chunks.chunks(self.embed_batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    vectors.len()
                )));
            }

            let pairs: Vec<(Chunk, Vec<f32>)> = batch.iter().cloned().zip(vectors).collect();
            written += self.upsert(name, &pairs).await?;
        }

        tracing::info!("Indexed {} chunks into '{}'", written, name);
        Ok(written)
    }
}

/// Index record for a chunk: deterministic id, chunk metadata plus its text
fn to_record(chunk: &Chunk, values: Vec<f32>) -> IndexRecord {
    let mut metadata = chunk.metadata.clone();
    metadata.insert(TEXT_KEY.to_string(), chunk.content.clone());
    IndexRecord {
        id: chunk.record_id(),
        values,
        metadata,
    }
}
