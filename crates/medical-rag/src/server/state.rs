//! Application state for the chat server

use std::sync::Arc;

use crate::config::{Credentials, RagConfig};
use crate::embeddings::create_embedder;
use crate::error::Result;
use crate::generation::RagChain;
use crate::providers::{GroqClient, PineconeStore};
use crate::retrieval::Retriever;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Query pipeline
    chain: RagChain,
}

impl AppState {
    /// Wrap an already assembled chain
    pub fn new(config: RagConfig, chain: RagChain) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, chain }),
        }
    }

    /// Build the hosted providers (ONNX embedder, Pinecone, Groq) and the chain
    pub async fn from_config(config: RagConfig, credentials: &Credentials) -> Result<Self> {
        let embedder = create_embedder(&config.embeddings).await?;
        let store = Arc::new(PineconeStore::new(&config.vector_db, &credentials.pinecone_api_key)?);
        let llm = Arc::new(GroqClient::new(&config.llm, credentials.groq_api_key.clone())?);

        tracing::info!(
            "Query pipeline: embedder={}, index={}, llm={}, top_k={}",
            embedder.name(),
            config.vector_db.index_name,
            config.llm.model,
            config.retrieval.top_k
        );

        let retriever = Retriever::from_config(&config, store, embedder);
        Ok(Self::new(config, RagChain::new(retriever, llm)))
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the query chain
    pub fn chain(&self) -> &RagChain {
        &self.inner.chain
    }
}
