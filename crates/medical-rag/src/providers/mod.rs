//! Provider abstractions for embeddings, LLM completion and vector storage
//!
//! Each external service sits behind a trait so the pipelines can run against
//! the hosted backends (Pinecone, Groq) or in-process stand-ins.

pub mod embedding;
pub mod groq;
pub mod llm;
pub mod memory;
pub mod pinecone;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use groq::GroqClient;
pub use llm::LlmProvider;
pub use memory::MemoryVectorStore;
pub use pinecone::PineconeStore;
pub use vector_store::{DistanceMetric, IndexDescription, IndexRecord, IndexSpec, VectorStoreProvider};

#[cfg(test)]
pub(crate) mod test_support {
    use axum::Router;

    /// Serve `build(base_url)` on a loopback port; returns the base URL
    pub(crate) async fn spawn_stub(build: impl FnOnce(String) -> Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let router = build(base_url.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        base_url
    }
}
