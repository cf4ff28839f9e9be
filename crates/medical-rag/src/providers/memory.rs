//! In-process vector store with brute-force similarity search

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};

use crate::embeddings::cosine_similarity;
use crate::error::{Error, Result};
use crate::types::RetrievedRecord;

use super::vector_store::{DistanceMetric, IndexDescription, IndexRecord, IndexSpec, VectorStoreProvider};

struct MemoryIndex {
    spec: IndexSpec,
    records: BTreeMap<String, IndexRecord>,
}

/// Vector store keeping every index in memory
///
/// Used for tests and offline runs; behaves like the hosted store for the
/// operations the pipelines rely on (duplicate creation fails, upsert
/// overwrites by id, dimension is enforced).
#[derive(Default)]
pub struct MemoryVectorStore {
    indexes: RwLock<HashMap<String, MemoryIndex>>,
}

impl MemoryVectorStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of indexes
    pub fn index_count(&self) -> usize {
        self.indexes.read().len()
    }

    /// Number of records in an index (0 if it does not exist)
    pub fn record_count(&self, index: &str) -> usize {
        self.indexes.read().get(index).map_or(0, |i| i.records.len())
    }
}

fn score(metric: DistanceMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        DistanceMetric::Cosine => cosine_similarity(a, b),
        DistanceMetric::DotProduct => a.iter().zip(b).map(|(x, y)| x * y).sum(),
        // Higher is better, so return the negated distance
        DistanceMetric::Euclidean => -a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f32>().sqrt(),
    }
}

#[async_trait]
impl VectorStoreProvider for MemoryVectorStore {
    async fn has_index(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.read().contains_key(name))
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        Ok(self.indexes.read().get(name).map(|index| IndexDescription {
            name: name.to_string(),
            dimension: index.spec.dimension,
            metric: index.spec.metric,
            host: None,
            ready: true,
        }))
    }

    async fn create_index(&self, name: &str, spec: &IndexSpec) -> Result<()> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(name) {
            return Err(Error::vector_store(format!("Index '{}' already exists", name)));
        }
        indexes.insert(
            name.to_string(),
            MemoryIndex {
                spec: spec.clone(),
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize> {
        let mut indexes = self.indexes.write();
        let target = indexes
            .get_mut(index)
            .ok_or_else(|| Error::vector_store(format!("Index '{}' not found", index)))?;

        if let Some(bad) = records.iter().find(|r| r.values.len() != target.spec.dimension) {
            return Err(Error::DimensionMismatch {
                expected: target.spec.dimension,
                actual: bad.values.len(),
            });
        }

        for record in records {
            target.records.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedRecord>> {
        let indexes = self.indexes.read();
        let target = indexes
            .get(index)
            .ok_or_else(|| Error::vector_store(format!("Index '{}' not found", index)))?;

        if vector.len() != target.spec.dimension {
            return Err(Error::DimensionMismatch {
                expected: target.spec.dimension,
                actual: vector.len(),
            });
        }

        let mut scored: Vec<(f32, &IndexRecord)> = target
            .records
            .values()
            .map(|record| (score(target.spec.metric, vector, &record.values), record))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(top_k);

        Ok(scored
            .into_iter()
            .map(|(score, record)| {
                RetrievedRecord::from_index_metadata(record.id.clone(), record.metadata.clone(), score)
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
