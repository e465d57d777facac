//! Pinecone REST client.
//!
//! Control plane (`{control_url}`):
//! - GET    /indexes            → `{indexes: [{name, dimension, metric, host, status}]}`
//! - GET    /indexes/{name}     → one index, 404 when absent
//! - POST   /indexes            → create (serverless spec), 409 when the name is taken
//! - DELETE /indexes/{name}     → 202 accepted, 404 when absent
//!
//! Data plane (`https://{host}`, host resolved via describe and cached):
//! - POST /vectors/upsert       → `{vectors: [{id, values, metadata}], namespace}`
//! - POST /query                → `{namespace, vector, topK, includeValues, includeMetadata}`
//!
//! Every request carries `Api-Key` and `X-Pinecone-API-Version`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use embedding_service::error_handler::make_snippet;
use reqwest::{StatusCode, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::PineconeConfig;
use crate::errors::{IndexError, RagError};
use crate::index::{
    IndexStatus, IndexSummary, QueryRequest, UpsertVector, VectorIndexClient, metadata_from_json,
};
use crate::record::{IndexDescriptor, Metadata, Metric, QueryMatch};

/// Pinecone backend for [`VectorIndexClient`].
#[derive(Debug)]
pub struct PineconeIndexClient {
    http: reqwest::Client,
    control_url: String,
    /// index name → data-plane base URL
    hosts: RwLock<HashMap<String, String>>,
}

impl PineconeIndexClient {
    /// Builds the HTTP client with auth/version headers and a per-request timeout.
    ///
    /// # Errors
    /// `RagError::Config` if the key cannot be used as a header value,
    /// `RagError::Index` if the HTTP client cannot be built.
    pub fn new(cfg: &PineconeConfig, timeout: Duration) -> Result<Self, RagError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "api-key",
            header::HeaderValue::from_str(&cfg.api_key)
                .map_err(|e| RagError::Config(format!("invalid PINECONE_API_KEY: {e}")))?,
        );
        headers.insert(
            "x-pinecone-api-version",
            header::HeaderValue::from_str(&cfg.api_version)
                .map_err(|e| RagError::Config(format!("invalid PINECONE_API_VERSION: {e}")))?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(IndexError::from)?;

        let control_url = cfg.control_url.trim().trim_end_matches('/').to_string();
        info!(%control_url, api_version = %cfg.api_version, "PineconeIndexClient initialized");

        Ok(Self {
            http,
            control_url,
            hosts: RwLock::new(HashMap::new()),
        })
    }

    fn index_url(&self, name: &str) -> String {
        format!("{}/indexes/{}", self.control_url, name)
    }

    /// Data-plane base URL of `index`, resolved once and cached.
    async fn data_url(&self, index: &str) -> Result<String, IndexError> {
        if let Some(url) = self.hosts.read().await.get(index) {
            return Ok(url.clone());
        }

        let host = self
            .describe_index(index)
            .await?
            .and_then(|s| s.host)
            .filter(|h| !h.is_empty())
            .ok_or_else(|| IndexError::NotFound(index.to_string()))?;

        let url = data_plane_url(&host);
        self.hosts
            .write()
            .await
            .insert(index.to_string(), url.clone());
        debug!(index, %url, "resolved data-plane host");
        Ok(url)
    }
}

#[async_trait]
impl VectorIndexClient for PineconeIndexClient {
    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, IndexError> {
        let url = format!("{}/indexes", self.control_url);
        debug!("GET {url}");
        let resp = ensure_success(self.http.get(&url).send().await?).await?;
        let out: ListIndexesResponse = decode(resp, "indexes[]").await?;

        Ok(out
            .indexes
            .into_iter()
            .map(|m| IndexSummary {
                name: m.name,
                dimension: m.dimension,
                metric: m.metric.as_deref().and_then(|s| s.parse::<Metric>().ok()),
            })
            .collect())
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexStatus>, IndexError> {
        let url = self.index_url(name);
        debug!("GET {url}");
        let resp = self.http.get(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let model: IndexModel = decode(ensure_success(resp).await?, "index model").await?;

        Ok(Some(IndexStatus {
            ready: model.status.map(|s| s.ready).unwrap_or(false),
            dimension: model.dimension,
            host: model.host,
        }))
    }

    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), IndexError> {
        let url = format!("{}/indexes", self.control_url);
        let body = CreateIndexRequest {
            name: &descriptor.name,
            dimension: descriptor.dimension,
            metric: descriptor.metric.as_str(),
            spec: IndexSpec {
                serverless: ServerlessSpec {
                    cloud: &descriptor.placement.cloud,
                    region: &descriptor.placement.region,
                },
            },
        };
        debug!(index = %descriptor.name, dimension = descriptor.dimension, "POST {url}");

        let resp = self.http.post(&url).json(&body).send().await?;
        if resp.status() == StatusCode::CONFLICT {
            return Err(IndexError::AlreadyExists(descriptor.name.clone()));
        }
        ensure_success(resp).await?;
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> Result<(), IndexError> {
        let url = self.index_url(name);
        debug!("DELETE {url}");
        let resp = self.http.delete(&url).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(IndexError::NotFound(name.to_string()));
        }
        ensure_success(resp).await?;
        self.hosts.write().await.remove(name);
        Ok(())
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        vectors: Vec<UpsertVector>,
    ) -> Result<u64, IndexError> {
        if vectors.is_empty() {
            return Ok(0);
        }
        let started = Instant::now();
        let url = format!("{}/vectors/upsert", self.data_url(index).await?);
        let body = UpsertRequest {
            vectors: vectors
                .iter()
                .map(|v| WireVector {
                    id: &v.id,
                    values: &v.values,
                    metadata: &v.metadata,
                })
                .collect(),
            namespace,
        };

        let resp = self.http.post(&url).json(&body).send().await?;
        let out: UpsertResponse = decode(ensure_success(resp).await?, "upsertedCount").await?;

        debug!(
            index,
            namespace,
            upserted = out.upserted_count,
            latency_ms = started.elapsed().as_millis(),
            "upsert completed"
        );
        Ok(out.upserted_count)
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        request: QueryRequest,
    ) -> Result<Vec<QueryMatch>, IndexError> {
        let started = Instant::now();
        let url = format!("{}/query", self.data_url(index).await?);
        let body = QueryBody {
            namespace,
            vector: &request.vector,
            top_k: request.top_k,
            include_values: request.include_values,
            include_metadata: request.include_metadata,
        };

        let resp = self.http.post(&url).json(&body).send().await?;
        let out: QueryResponse = decode(ensure_success(resp).await?, "matches[]").await?;

        debug!(
            index,
            namespace,
            matches = out.matches.len(),
            latency_ms = started.elapsed().as_millis(),
            "query completed"
        );

        Ok(out
            .matches
            .into_iter()
            .map(|m| QueryMatch {
                id: m.id,
                score: m.score,
                values: m.values.filter(|v| request.include_values && !v.is_empty()),
                metadata: m
                    .metadata
                    .filter(|_| request.include_metadata)
                    .map(metadata_from_json),
            })
            .collect())
    }
}

/// Hosts come back without a scheme; tests and proxies may supply one.
fn data_plane_url(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, IndexError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let url = resp.url().to_string();
    let text = resp.text().await.unwrap_or_default();
    let snippet = make_snippet(&text);
    error!(%status, %url, %snippet, "Pinecone returned non-success status");
    Err(IndexError::HttpStatus {
        status,
        url,
        snippet,
    })
}

async fn decode<T: for<'de> Deserialize<'de>>(
    resp: reqwest::Response,
    expected: &str,
) -> Result<T, IndexError> {
    resp.json::<T>()
        .await
        .map_err(|e| IndexError::Decode(format!("serde error: {e}; expected `{expected}`")))
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Deserialize)]
struct ListIndexesResponse {
    #[serde(default)]
    indexes: Vec<IndexModel>,
}

#[derive(Debug, Deserialize)]
struct IndexModel {
    name: String,
    dimension: Option<usize>,
    metric: Option<String>,
    host: Option<String>,
    status: Option<IndexModelStatus>,
}

#[derive(Debug, Deserialize)]
struct IndexModelStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Debug, Serialize)]
struct CreateIndexRequest<'a> {
    name: &'a str,
    dimension: usize,
    metric: &'a str,
    spec: IndexSpec<'a>,
}

#[derive(Debug, Serialize)]
struct IndexSpec<'a> {
    serverless: ServerlessSpec<'a>,
}

#[derive(Debug, Serialize)]
struct ServerlessSpec<'a> {
    cloud: &'a str,
    region: &'a str,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: Vec<WireVector<'a>>,
    namespace: &'a str,
}

#[derive(Debug, Serialize)]
struct WireVector<'a> {
    id: &'a str,
    values: &'a [f32],
    #[serde(skip_serializing_if = "no_metadata")]
    metadata: &'a Metadata,
}

fn no_metadata(m: &&Metadata) -> bool {
    m.is_empty()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryBody<'a> {
    namespace: &'a str,
    vector: &'a [f32],
    top_k: u64,
    include_values: bool,
    include_metadata: bool,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<WireMatch>,
}

#[derive(Debug, Deserialize)]
struct WireMatch {
    id: String,
    #[serde(default)]
    score: f32,
    values: Option<Vec<f32>>,
    metadata: Option<serde_json::Map<String, Value>>,
}
