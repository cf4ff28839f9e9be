//! Retrieve-then-generate chain behind the chat endpoint

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::LlmProvider;
use crate::retrieval::Retriever;
use crate::types::ChatAnswer;

use super::prompt::PromptBuilder;

/// Single-turn RAG chain; holds no per-conversation state
pub struct RagChain {
    retriever: Retriever,
    llm: Arc<dyn LlmProvider>,
}

impl RagChain {
    /// Create a chain
    pub fn new(retriever: Retriever, llm: Arc<dyn LlmProvider>) -> Self {
        Self { retriever, llm }
    }

    /// Answer a question from the top-k retrieved chunks
    pub async fn answer(&self, question: &str) -> Result<ChatAnswer> {
        let start = Instant::now();

        let context = self.retriever.retrieve(question).await?;
        let system_prompt = PromptBuilder::system_prompt(&PromptBuilder::build_context(&context));

        tracing::debug!(
            "Generating with {} ({}) over {} records",
            self.llm.name(),
            self.llm.model(),
            context.len()
        );
        let answer = self.llm.complete(&system_prompt, question).await?;

        Ok(ChatAnswer {
            answer: answer.trim().to_string(),
            context,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::error::Error;
    use crate::providers::{DistanceMetric, IndexRecord, IndexSpec, MemoryVectorStore, VectorStoreProvider};
    use crate::types::response::TEXT_KEY;
    use crate::types::Metadata;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    /// Replies with the context part of the system prompt; records every call
    #[derive(Default)]
    pub(crate) struct EchoLlm {
        pub(crate) calls: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl LlmProvider for EchoLlm {
        async fn complete(&self, system_prompt: &str, question: &str) -> Result<String> {
            self.calls
                .lock()
                .push((system_prompt.to_string(), question.to_string()));
            let context = system_prompt.split_once("\n\n").map_or("", |(_, context)| context);
            Ok(format!(" {} ", context))
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }
    }

    /// Always fails like an unreachable LLM
    pub(crate) struct DownLlm;

    #[async_trait]
    impl LlmProvider for DownLlm {
        async fn complete(&self, _system_prompt: &str, _question: &str) -> Result<String> {
            Err(Error::llm("connection refused"))
        }

        fn name(&self) -> &str {
            "down"
        }

        fn model(&self) -> &str {
            "none"
        }
    }

    /// Retriever over an in-memory index holding `texts`
    pub(crate) async fn retriever_over(texts: &[&str]) -> Retriever {
        let embedder = HashEmbedder::new(384);
        let store = Arc::new(MemoryVectorStore::new());
        let spec = IndexSpec {
            dimension: 384,
            metric: DistanceMetric::Cosine,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        };
        store.create_index("medical-rag", &spec).await.unwrap();
        let records: Vec<IndexRecord> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| IndexRecord {
                id: format!("r{}", i),
                values: embedder.embed_text(text),
                metadata: Metadata::from([(TEXT_KEY.to_string(), text.to_string())]),
            })
            .collect();
        store.upsert("medical-rag", &records).await.unwrap();

        Retriever::new(store, Arc::new(embedder), "medical-rag", 3)
    }

    #[tokio::test]
    async fn test_answer_uses_retrieved_context() {
        let llm = Arc::new(EchoLlm::default());
        let chain = RagChain::new(
            retriever_over(&["Aspirin is used to reduce pain.", "Insulin regulates blood glucose."]).await,
            llm.clone(),
        );

        let answer = chain.answer("What is Aspirin used for?").await.unwrap();

        assert!(answer.answer.starts_with("Aspirin is used to reduce pain."));
        assert_eq!(answer.context.len(), 2);
        let calls = llm.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, "What is Aspirin used for?");
        assert!(calls[0].0.contains("Aspirin is used to reduce pain."));
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let chain = RagChain::new(retriever_over(&["Aspirin is used to reduce pain."]).await, Arc::new(DownLlm));
        let err = chain.answer("What is Aspirin used for?").await.unwrap_err();
        assert!(matches!(err, Error::Llm(_)));
    }
}
