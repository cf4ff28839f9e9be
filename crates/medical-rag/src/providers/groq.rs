//! Groq chat completion client (OpenAI-compatible API) with retry logic

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::llm::LlmProvider;

/// Groq API client
pub struct GroqClient {
    client: Client,
    config: LlmConfig,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqClient {
    /// Create a new client
    pub fn new(config: &LlmConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
            api_key: api_key.into(),
        })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Groq request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    async fn send_completion(&self, system_prompt: &str, question: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: question,
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::llm(format!("Completion request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::llm(format!("Completion failed: HTTP {} - {}", status, body)));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| Error::llm(format!("Failed to parse completion response: {}", e)))?;

        first_choice_text(completion)
    }
}

fn first_choice_text(completion: ChatCompletionResponse) -> Result<String> {
    completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::llm("Completion response contained no message"))
}

#[async_trait]
impl LlmProvider for GroqClient {
    async fn complete(&self, system_prompt: &str, question: &str) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.config.model);
        self.retry_request(|| self.send_completion(system_prompt, question))
            .await
    }

    fn name(&self) -> &str {
        "groq"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::test_support::spawn_stub;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Completions endpoint that fails its first `failures` calls
    #[derive(Default)]
    struct Stub {
        failures: usize,
        calls: AtomicUsize,
        authorization: Mutex<Option<String>>,
        last_body: Mutex<Option<Value>>,
    }

    async fn completions(State(stub): State<Arc<Stub>>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
        let call = stub.calls.fetch_add(1, Ordering::SeqCst);
        *stub.authorization.lock() = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        *stub.last_body.lock() = Some(body);

        if call < stub.failures {
            return (StatusCode::SERVICE_UNAVAILABLE, "over capacity").into_response();
        }
        Json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "Aspirin reduces pain."}}]
        }))
        .into_response()
    }

    async fn client(failures: usize, max_retries: u32) -> (Arc<Stub>, GroqClient) {
        let stub = Arc::new(Stub {
            failures,
            ..Stub::default()
        });
        let state = stub.clone();
        let base_url = spawn_stub(move |_| {
            Router::new()
                .route("/chat/completions", post(completions))
                .with_state(state)
        })
        .await;

        let config = LlmConfig {
            base_url,
            max_retries,
            ..LlmConfig::default()
        };
        (stub, GroqClient::new(&config, "groq-key").unwrap())
    }

    #[tokio::test]
    async fn test_completion_round_trip() {
        let (stub, client) = client(0, 0).await;

        let answer = client.complete("You are a medical assistant.", "What is Aspirin?").await.unwrap();

        assert_eq!(answer, "Aspirin reduces pain.");
        assert_eq!(stub.authorization.lock().as_deref(), Some("Bearer groq-key"));
        let body = stub.last_body.lock().clone().unwrap();
        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "What is Aspirin?");
    }

    #[tokio::test]
    async fn test_error_status_is_llm_error_without_retry() {
        let (stub, client) = client(usize::MAX, 0).await;

        match client.complete("system", "question").await {
            Err(Error::Llm(message)) => {
                assert!(message.contains("503"));
                assert!(message.contains("over capacity"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(stub.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_after_failure() {
        let (stub, client) = client(1, 1).await;

        let answer = client.complete("system", "question").await.unwrap();

        assert_eq!(answer, "Aspirin reduces pain.");
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let (stub, client) = client(usize::MAX, 1).await;

        assert!(matches!(client.complete("system", "question").await, Err(Error::Llm(_))));
        assert_eq!(stub.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_request_shape() {
        let request = ChatCompletionRequest {
            model: "llama-3.3-70b-versatile",
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "context",
                },
                ChatMessage {
                    role: "user",
                    content: "What is Aspirin?",
                },
            ],
            temperature: 0.3,
        };
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "llama-3.3-70b-versatile");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "What is Aspirin?");
    }

    #[test]
    fn test_parses_first_choice() {
        let completion: ChatCompletionResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"Pain relief."}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(completion).unwrap(), "Pain relief.");

        let empty: ChatCompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_choice_text(empty), Err(Error::Llm(_))));
    }

    #[test]
    fn test_url_tolerates_trailing_slash() {
        let config = LlmConfig {
            base_url: "https://api.groq.com/openai/v1/".to_string(),
            ..LlmConfig::default()
        };
        let client = GroqClient::new(&config, "key").unwrap();
        assert_eq!(
            client.completions_url(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }
}
