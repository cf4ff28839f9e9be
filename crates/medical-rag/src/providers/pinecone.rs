//! Pinecone serverless index provider
//!
//! Control plane calls (list, describe, create) go to the controller URL; data
//! plane calls (upsert, query) go to the per-index host reported by describe.

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::VectorDbConfig;
use crate::error::{Error, Result};
use crate::types::{Metadata, RetrievedRecord};

use super::vector_store::{DistanceMetric, IndexDescription, IndexRecord, IndexSpec, VectorStoreProvider};

/// Polls of describe while waiting for a new index to become ready
const READY_POLL_ATTEMPTS: u32 = 60;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Pinecone vector store
pub struct PineconeStore {
    client: Client,
    controller_url: String,
    /// Data plane hosts by index name
    hosts: RwLock<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct IndexList {
    #[serde(default)]
    indexes: Vec<IndexName>,
}

#[derive(Debug, Deserialize)]
struct IndexName {
    name: String,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: usize,
    metric: DistanceMetric,
    #[serde(default)]
    host: Option<String>,
    #[serde(default)]
    status: Option<IndexStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexStatus {
    ready: bool,
}

impl From<IndexModel> for IndexDescription {
    fn from(model: IndexModel) -> Self {
        Self {
            name: model.name,
            dimension: model.dimension,
            metric: model.metric,
            host: model.host,
            ready: model.status.map_or(false, |s| s.ready),
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: DistanceMetric,
    spec: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    serverless: CloudRegion<'a>,
}

#[derive(Debug, Serialize)]
struct CloudRegion<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [IndexRecord],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl QueryMatch {
    fn into_record(self) -> RetrievedRecord {
        let metadata: Metadata = self
            .metadata
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, value)
            })
            .collect();
        RetrievedRecord::from_index_metadata(self.id, metadata, self.score)
    }
}

impl PineconeStore {
    /// Create a client for the Pinecone API
    pub fn new(config: &VectorDbConfig, api_key: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::Config("PINECONE_API_KEY contains invalid characters".to_string()))?;
        key.set_sensitive(true);
        headers.insert("api-key", key);
        headers.insert(
            "x-pinecone-api-version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|_| Error::Config(format!("Invalid api_version '{}'", config.api_version)))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::vector_store(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            controller_url: config.controller_url.trim_end_matches('/').to_string(),
            hosts: RwLock::new(HashMap::new()),
        })
    }

    fn indexes_url(&self) -> String {
        format!("{}/indexes", self.controller_url)
    }

    fn index_url(&self, name: &str) -> String {
        format!("{}/indexes/{}", self.controller_url, name)
    }

    /// Data plane base URL for an index, resolved through describe once
    async fn data_url(&self, index: &str) -> Result<String> {
        let cached = self.hosts.read().get(index).cloned();
        if let Some(host) = cached {
            return Ok(data_plane_url(&host));
        }

        let description = self
            .describe_index(index)
            .await?
            .ok_or_else(|| Error::vector_store(format!("Index '{}' not found", index)))?;
        let host = description
            .host
            .ok_or_else(|| Error::vector_store(format!("Index '{}' has no host yet", index)))?;

        Ok(data_plane_url(&host))
    }

    async fn wait_until_ready(&self, name: &str) -> Result<()> {
        for _ in 0..READY_POLL_ATTEMPTS {
            if let Some(description) = self.describe_index(name).await? {
                if description.ready {
                    return Ok(());
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        Err(Error::vector_store(format!(
            "Index '{}' did not become ready in time",
            name
        )))
    }

    async fn check(response: reqwest::Response, action: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::vector_store(format!("{} failed: HTTP {} - {}", action, status, body)))
    }
}

fn data_plane_url(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", host.trim_end_matches('/'))
    }
}

#[async_trait]
impl VectorStoreProvider for PineconeStore {
    async fn has_index(&self, name: &str) -> Result<bool> {
        let response = self
            .client
            .get(self.indexes_url())
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("List indexes request failed: {}", e)))?;
        let list: IndexList = Self::check(response, "List indexes")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("Failed to parse index list: {}", e)))?;

        Ok(list.indexes.iter().any(|index| index.name == name))
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let response = self
            .client
            .get(self.index_url(name))
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Describe index request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let model: IndexModel = Self::check(response, "Describe index")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("Failed to parse index description: {}", e)))?;

        let description = IndexDescription::from(model);
        if let Some(host) = &description.host {
            self.hosts.write().insert(name.to_string(), host.clone());
        }
        Ok(Some(description))
    }

    async fn create_index(&self, name: &str, spec: &IndexSpec) -> Result<()> {
        let request = CreateIndexRequest {
            name,
            dimension: spec.dimension,
            metric: spec.metric,
            spec: ServerlessSpec {
                serverless: CloudRegion {
                    cloud: &spec.cloud,
                    region: &spec.region,
                },
            },
        };

        tracing::info!(
            "Creating Pinecone index '{}' ({} dims, {}, {}/{})",
            name,
            spec.dimension,
            spec.metric.as_str(),
            spec.cloud,
            spec.region
        );

        let response = self
            .client
            .post(self.indexes_url())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Create index request failed: {}", e)))?;
        Self::check(response, "Create index").await?;

        self.wait_until_ready(name).await
    }

    async fn upsert(&self, index: &str, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let url = format!("{}/vectors/upsert", self.data_url(index).await?);
        let response = self
            .client
            .post(url)
            .json(&UpsertRequest { vectors: records })
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Upsert request failed: {}", e)))?;

        let result: UpsertResponse = Self::check(response, "Upsert")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("Failed to parse upsert response: {}", e)))?;

        Ok(result.upserted_count)
    }

    async fn query(&self, index: &str, vector: &[f32], top_k: usize) -> Result<Vec<RetrievedRecord>> {
        let url = format!("{}/query", self.data_url(index).await?);
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            include_values: false,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Query request failed: {}", e)))?;

        let result: QueryResponse = Self::check(response, "Query")
            .await?
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("Failed to parse query response: {}", e)))?;

        let mut records: Vec<RetrievedRecord> =
            result.matches.into_iter().map(QueryMatch::into_record).collect();
        records.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(records)
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}
