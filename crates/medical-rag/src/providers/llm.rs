//! LLM provider trait for generating answers

use async_trait::async_trait;

use crate::error::Result;

/// Trait for single-turn chat completion
///
/// Implementations:
/// - `GroqClient`: Groq OpenAI-compatible API (llama-3.3-70b-versatile)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Answer `question` under `system_prompt` (which already carries the context)
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
