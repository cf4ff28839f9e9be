//! medical-rag: PDF question answering backed by a hosted vector index
//!
//! Two pipelines make up the system:
//!
//! - **Ingestion** (offline): `PdfLoader -> filter_to_minimal_docs -> RecursiveTextSplitter
//!   -> EmbeddingProvider -> Indexer`, driven by [`ingestion::IngestPipeline`].
//! - **Query** (per chat request): `Retriever -> PromptBuilder -> LlmProvider`,
//!   driven by [`generation::RagChain`] and exposed over HTTP by [`server::RagServer`].
//!
//! External services (embedding model, vector index, LLM) sit behind the traits in
//! [`providers`], so tests and offline runs can swap in in-process implementations.

pub mod config;
pub mod embeddings;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::{Credentials, RagConfig};
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, Document, Metadata},
    response::{ChatAnswer, RetrievedRecord},
};
