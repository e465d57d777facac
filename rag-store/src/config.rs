//! Runtime configuration, read once from the environment and then immutable.
//!
//! Environment variables (defaults in parentheses):
//! - `VECTOR_BACKEND` (`pinecone`): `pinecone` or `qdrant`
//! - `PINECONE_API_KEY` (required for pinecone), `PINECONE_CONTROL_URL` (`https://api.pinecone.io`),
//!   `PINECONE_API_VERSION` (`2024-07`)
//! - `QDRANT_URL` (`http://localhost:6334`), `QDRANT_API_KEY` (optional)
//! - `RAG_NAMESPACE` (`your-namespace`), `RAG_INDEX_NAME` (`your-index-name`),
//!   `RAG_EMBEDDING_ID` (`your-embedding-id`)
//! - `EMBEDDING_DIM` (`1536`), `RAG_METRIC` (`cosine`), `RAG_CLOUD` (`aws`), `RAG_REGION` (`us-west-2`)
//! - `RAG_QUERY` (`What is my dog's name?`)
//! - `RAG_TOP_K` (`1`), `RAG_INCLUDE_VALUES` (`false`), `RAG_INCLUDE_METADATA` (`true`)
//! - `RAG_RECORDS_PATH` (optional JSONL), `RAG_DELETE_AFTER_RUN` (`false`)
//! - `INGEST_CONCURRENCY` (`16`), `REMOTE_TIMEOUT_SECS` (`30`), `RETRY_MAX` (`3`),
//!   `RETRY_INITIAL_DELAY_MS` (`200`), `RETRY_MAX_DELAY_MS` (`5000`)
//! - `INDEX_READY_TIMEOUT_SECS` (`60`), `INDEX_READY_POLL_MS` (`1000`)

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::RagError;
use crate::record::{IndexDescriptor, Metric, Placement, SimilarityQuery};
use crate::retry::RetryPolicy;

/// Pinecone control-plane settings.
#[derive(Clone, Debug)]
pub struct PineconeConfig {
    pub api_key: String,
    /// Control-plane base URL, e.g. `https://api.pinecone.io`.
    pub control_url: String,
    /// Value of the `X-Pinecone-API-Version` header.
    pub api_version: String,
}

/// Qdrant endpoint settings.
#[derive(Clone, Debug)]
pub struct QdrantConfig {
    /// gRPC URL, e.g. `http://localhost:6334`.
    pub url: String,
    pub api_key: Option<String>,
}

/// Which vector store holds the index.
#[derive(Clone, Debug)]
pub enum VectorBackend {
    Pinecone(PineconeConfig),
    Qdrant(QdrantConfig),
}

/// Configuration for one pipeline run.
#[derive(Clone, Debug)]
pub struct RagConfig {
    pub backend: VectorBackend,
    /// Index the run provisions and writes to.
    pub index: IndexDescriptor,
    pub namespace: String,
    /// Prefix of vector ids (`<prefix>-<position>`).
    pub embedding_id: String,
    /// Query text issued after ingestion.
    pub query: String,
    pub similarity: SimilarityQuery,
    /// JSONL records to ingest; the built-in batch when `None`.
    pub records_path: Option<PathBuf>,
    pub delete_after_run: bool,
    /// Upper bound of in-flight embed+upsert units.
    pub ingest_concurrency: usize,
    pub retry: RetryPolicy,
    pub ready_timeout: Duration,
    pub ready_poll: Duration,
}

impl RagConfig {
    /// Defaults of the reference setup for a given backend.
    pub fn new_default(backend: VectorBackend) -> Self {
        Self {
            backend,
            index: IndexDescriptor {
                name: "your-index-name".into(),
                dimension: 1536,
                metric: Metric::Cosine,
                placement: Placement {
                    cloud: "aws".into(),
                    region: "us-west-2".into(),
                },
            },
            namespace: "your-namespace".into(),
            embedding_id: "your-embedding-id".into(),
            query: "What is my dog's name?".into(),
            similarity: SimilarityQuery::default(),
            records_path: None,
            delete_after_run: false,
            ingest_concurrency: 16,
            retry: RetryPolicy::default(),
            ready_timeout: Duration::from_secs(60),
            ready_poll: Duration::from_millis(1000),
        }
    }

    /// Build configuration from environment variables (see module docs).
    ///
    /// # Errors
    /// `RagError::Config` for missing credentials, unparsable values, or a
    /// combination rejected by [`RagConfig::validate`].
    pub fn from_env() -> Result<Self, RagError> {
        let backend = match env_or("VECTOR_BACKEND", "pinecone").to_lowercase().as_str() {
            "pinecone" => VectorBackend::Pinecone(PineconeConfig {
                api_key: must_env("PINECONE_API_KEY")?,
                control_url: env_or("PINECONE_CONTROL_URL", "https://api.pinecone.io"),
                api_version: env_or("PINECONE_API_VERSION", "2024-07"),
            }),
            "qdrant" => VectorBackend::Qdrant(QdrantConfig {
                url: env_or("QDRANT_URL", "http://localhost:6334"),
                api_key: opt_env("QDRANT_API_KEY"),
            }),
            other => {
                return Err(RagError::Config(format!(
                    "VECTOR_BACKEND '{other}' is not supported (expected pinecone | qdrant)"
                )));
            }
        };

        let defaults = Self::new_default(backend);

        let index = IndexDescriptor {
            name: env_or("RAG_INDEX_NAME", &defaults.index.name),
            dimension: parse_env("EMBEDDING_DIM", defaults.index.dimension)?,
            metric: match opt_env("RAG_METRIC") {
                Some(m) => Metric::from_str(&m)?,
                None => defaults.index.metric,
            },
            placement: Placement {
                cloud: env_or("RAG_CLOUD", &defaults.index.placement.cloud),
                region: env_or("RAG_REGION", &defaults.index.placement.region),
            },
        };

        let similarity = SimilarityQuery {
            top_k: parse_env("RAG_TOP_K", defaults.similarity.top_k)?,
            include_values: parse_env("RAG_INCLUDE_VALUES", defaults.similarity.include_values)?,
            include_metadata: parse_env(
                "RAG_INCLUDE_METADATA",
                defaults.similarity.include_metadata,
            )?,
        };

        let retry = RetryPolicy {
            max_retries: parse_env("RETRY_MAX", defaults.retry.max_retries)?,
            initial_delay: Duration::from_millis(parse_env(
                "RETRY_INITIAL_DELAY_MS",
                defaults.retry.initial_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(parse_env(
                "RETRY_MAX_DELAY_MS",
                defaults.retry.max_delay.as_millis() as u64,
            )?),
            backoff_multiplier: defaults.retry.backoff_multiplier,
            timeout: Duration::from_secs(parse_env(
                "REMOTE_TIMEOUT_SECS",
                defaults.retry.timeout.as_secs(),
            )?),
        };

        let cfg = Self {
            index,
            namespace: env_or("RAG_NAMESPACE", &defaults.namespace),
            embedding_id: env_or("RAG_EMBEDDING_ID", &defaults.embedding_id),
            query: env_or("RAG_QUERY", &defaults.query),
            similarity,
            records_path: opt_env("RAG_RECORDS_PATH").map(PathBuf::from),
            delete_after_run: parse_env("RAG_DELETE_AFTER_RUN", defaults.delete_after_run)?,
            ingest_concurrency: parse_env("INGEST_CONCURRENCY", defaults.ingest_concurrency)?,
            retry,
            ready_timeout: Duration::from_secs(parse_env(
                "INDEX_READY_TIMEOUT_SECS",
                defaults.ready_timeout.as_secs(),
            )?),
            ready_poll: Duration::from_millis(parse_env(
                "INDEX_READY_POLL_MS",
                defaults.ready_poll.as_millis() as u64,
            )?),
            backend: defaults.backend,
        };

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.index.name.trim().is_empty() {
            return Err(RagError::Config("RAG_INDEX_NAME is empty".into()));
        }
        if self.index.dimension == 0 {
            return Err(RagError::Config("EMBEDDING_DIM must be > 0".into()));
        }
        if self.embedding_id.trim().is_empty() {
            return Err(RagError::Config("RAG_EMBEDDING_ID is empty".into()));
        }
        if self.similarity.top_k == 0 {
            return Err(RagError::Config("RAG_TOP_K must be > 0".into()));
        }
        if self.ingest_concurrency == 0 {
            return Err(RagError::Config("INGEST_CONCURRENCY must be > 0".into()));
        }
        if self.retry.timeout.is_zero() {
            return Err(RagError::Config("REMOTE_TIMEOUT_SECS must be > 0".into()));
        }
        match &self.backend {
            VectorBackend::Pinecone(p) => {
                if !(p.control_url.starts_with("http://") || p.control_url.starts_with("https://")) {
                    return Err(RagError::Config(
                        "PINECONE_CONTROL_URL must start with http:// or https://".into(),
                    ));
                }
            }
            VectorBackend::Qdrant(q) => {
                if q.url.trim().is_empty() {
                    return Err(RagError::Config("QDRANT_URL is empty".into()));
                }
            }
        }
        Ok(())
    }
}

fn opt_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    opt_env(key).unwrap_or_else(|| default.to_string())
}

fn must_env(key: &str) -> Result<String, RagError> {
    opt_env(key).ok_or_else(|| RagError::Config(format!("missing env variable: {key}")))
}

/// Parse `key` into `T`, falling back to `default` when unset.
fn parse_env<T: FromStr>(key: &str, default: T) -> Result<T, RagError> {
    match opt_env(key) {
        Some(v) => v.trim().parse::<T>().map_err(|_| {
            RagError::Config(format!("failed to parse env variable: {key} = '{v}'"))
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLEARED: [&str; 12] = [
        "VECTOR_BACKEND",
        "RAG_INDEX_NAME",
        "EMBEDDING_DIM",
        "RAG_METRIC",
        "RAG_TOP_K",
        "RAG_INCLUDE_VALUES",
        "RAG_NAMESPACE",
        "RAG_EMBEDDING_ID",
        "RAG_QUERY",
        "INGEST_CONCURRENCY",
        "REMOTE_TIMEOUT_SECS",
        "RAG_RECORDS_PATH",
    ];

    fn with_env<F: FnOnce()>(set: &[(&str, &str)], f: F) {
        let mut vars: Vec<(String, Option<String>)> =
            CLEARED.iter().map(|k| (k.to_string(), None)).collect();
        for (k, v) in set {
            vars.retain(|(name, _)| name != k);
            vars.push((k.to_string(), Some(v.to_string())));
        }
        temp_env::with_vars(vars, f);
    }

    #[test]
    fn defaults_match_reference_setup() {
        with_env(&[("PINECONE_API_KEY", "pc-test")], || {
            let cfg = RagConfig::from_env().unwrap();
            assert_eq!(cfg.index.name, "your-index-name");
            assert_eq!(cfg.index.dimension, 1536);
            assert_eq!(cfg.index.metric, Metric::Cosine);
            assert_eq!(cfg.index.placement.cloud, "aws");
            assert_eq!(cfg.index.placement.region, "us-west-2");
            assert_eq!(cfg.namespace, "your-namespace");
            assert_eq!(cfg.embedding_id, "your-embedding-id");
            assert_eq!(cfg.query, "What is my dog's name?");
            assert_eq!(cfg.similarity, SimilarityQuery::default());
            assert!(!cfg.delete_after_run);
            assert!(matches!(cfg.backend, VectorBackend::Pinecone(_)));
        });
    }

    #[test]
    fn pinecone_requires_api_key() {
        with_env(&[("PINECONE_API_KEY", "")], || {
            let err = RagConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("PINECONE_API_KEY"));
        });
    }

    #[test]
    fn overrides_and_qdrant_backend() {
        with_env(
            &[
                ("VECTOR_BACKEND", "qdrant"),
                ("RAG_METRIC", "euclidean"),
                ("EMBEDDING_DIM", "768"),
                ("RAG_TOP_K", "3"),
                ("RAG_INCLUDE_VALUES", "true"),
            ],
            || {
                let cfg = RagConfig::from_env().unwrap();
                assert!(matches!(cfg.backend, VectorBackend::Qdrant(_)));
                assert_eq!(cfg.index.metric, Metric::Euclidean);
                assert_eq!(cfg.index.dimension, 768);
                assert_eq!(cfg.similarity.top_k, 3);
                assert!(cfg.similarity.include_values);
            },
        );
    }

    #[test]
    fn rejects_bad_numbers_and_zero_values() {
        with_env(
            &[("VECTOR_BACKEND", "qdrant"), ("EMBEDDING_DIM", "many")],
            || assert!(RagConfig::from_env().is_err()),
        );
        with_env(&[("VECTOR_BACKEND", "qdrant"), ("RAG_TOP_K", "0")], || {
            assert!(RagConfig::from_env().is_err())
        });
        with_env(&[("VECTOR_BACKEND", "milvus")], || {
            assert!(RagConfig::from_env().is_err())
        });
    }
}
