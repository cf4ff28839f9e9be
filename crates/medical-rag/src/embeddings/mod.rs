//! Embedding generation

pub mod hash_embedder;
pub mod onnx_embedder;

pub use hash_embedder::HashEmbedder;
pub use onnx_embedder::OnnxEmbedder;

use std::sync::Arc;

use crate::config::{EmbeddingBackend, EmbeddingConfig};
use crate::error::Result;
use crate::providers::EmbeddingProvider;

/// Build the configured embedder
pub async fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    match config.provider {
        EmbeddingBackend::Onnx => Ok(Arc::new(OnnxEmbedder::new(config).await?)),
        EmbeddingBackend::Hash => {
            tracing::warn!("Using hash embedder; answers will be keyword-based only");
            Ok(Arc::new(HashEmbedder::new(config.dimensions)))
        }
    }
}

/// Compute cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Scale to unit length; zero vectors are left alone
pub(crate) fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for val in vector.iter_mut() {
            *val /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_create_hash_embedder() {
        let config = EmbeddingConfig {
            provider: EmbeddingBackend::Hash,
            dimensions: 16,
            ..EmbeddingConfig::default()
        };
        let embedder = create_embedder(&config).await.unwrap();
        assert_eq!(embedder.dimensions(), 16);
        assert_eq!(embedder.embed("aspirin").await.unwrap().len(), 16);
    }
}
