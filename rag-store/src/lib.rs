//! Embedding-and-retrieval pipeline over a remote vector index.
//!
//! This crate provides:
//! - Idempotent index lifecycle (create / delete, wait for readiness)
//! - Concurrent per-record ingestion with one outcome per record
//! - Top-K similarity queries in the index's own rank order
//!
//! Backends: Pinecone (REST) and Qdrant (gRPC), behind [`VectorIndexClient`].

pub mod config;
pub mod embed;
pub mod errors;
pub mod index;
pub mod ingest;
pub mod io_jsonl;
pub mod lifecycle;
pub mod orchestrator;
pub mod record;
pub mod retrieve;
pub mod retry;

use std::sync::Arc;

use embedding_service::EmbeddingService;
use tracing::trace;

pub use config::{PineconeConfig, QdrantConfig, RagConfig, VectorBackend};
pub use embed::{EmbeddingClient, ServiceEmbedder};
pub use errors::{
    EmbedError, IndexError, IngestCause, IngestError, IngestStage, ProvisioningError, QueryError,
    RagError,
};
pub use index::{VectorIndexClient, build_index_client};
pub use ingest::IngestionPipeline;
pub use lifecycle::{IndexAction, IndexLifecycleManager, LifecycleOutcome};
pub use orchestrator::{Orchestrator, RunReport};
pub use record::{
    Embedding, IndexDescriptor, IndexedVector, Metadata, MetadataValue, Metric, Placement,
    QueryMatch, QueryResult, Record, SimilarityQuery,
};
pub use retrieve::QueryPipeline;
pub use retry::RetryPolicy;

/// High-level facade that wires configuration, the embedder and the index client.
///
/// This is the single entry point recommended for application code.
pub struct RagStore {
    orchestrator: Orchestrator,
}

impl RagStore {
    /// Builds the index client for `cfg.backend` and embeds through `svc`.
    ///
    /// # Errors
    /// Returns `RagError::Config`/`RagError::Index` if the backend client
    /// cannot be initialized.
    pub fn new(cfg: RagConfig, svc: Arc<EmbeddingService>) -> Result<Self, RagError> {
        trace!("RagStore::new index={}", cfg.index.name);
        let index = build_index_client(&cfg.backend, cfg.retry.timeout)?;
        let embedder: Arc<dyn EmbeddingClient> = Arc::new(ServiceEmbedder::new(svc));
        Ok(Self::with_clients(cfg, embedder, index))
    }

    /// Wires explicit clients; used when the caller owns them.
    pub fn with_clients(
        cfg: RagConfig,
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndexClient>,
    ) -> Self {
        Self {
            orchestrator: Orchestrator::new(cfg, embedder, index),
        }
    }

    pub fn config(&self) -> &RagConfig {
        self.orchestrator.config()
    }

    /// Records to ingest: `cfg.records_path` if set, otherwise the demo batch.
    ///
    /// # Errors
    /// Returns `RagError::Io`/`RagError::Parse` for unreadable JSONL.
    pub fn load_records(&self) -> Result<Vec<Record>, RagError> {
        match &self.config().records_path {
            Some(path) => io_jsonl::read_records(path),
            None => Ok(io_jsonl::default_records()),
        }
    }

    /// Ensure → ingest → query over `records`.
    ///
    /// # Errors
    /// See [`Orchestrator::run`].
    pub async fn run(&self, records: &[Record]) -> Result<RunReport, RagError> {
        trace!("RagStore::run records={}", records.len());
        self.orchestrator.run(records).await
    }
}
