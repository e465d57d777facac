//! Vector index boundary: control plane (list/describe/create/delete) and
//! data plane (upsert/query), plus the backends implementing it.

pub mod pinecone;
pub mod qdrant_facade;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::VectorBackend;
use crate::errors::{IndexError, RagError};
use crate::record::{IndexDescriptor, Metadata, MetadataValue, Metric, QueryMatch};

pub use pinecone::PineconeIndexClient;
pub use qdrant_facade::QdrantFacade;

/// One entry of the index listing.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexSummary {
    pub name: String,
    pub dimension: Option<usize>,
    pub metric: Option<Metric>,
}

/// Provisioning state of an existing index.
#[derive(Clone, Debug, PartialEq)]
pub struct IndexStatus {
    pub ready: bool,
    pub dimension: Option<usize>,
    /// Data-plane host, when the backend routes data calls separately.
    pub host: Option<String>,
}

/// A vector to write, keyed by its id.
#[derive(Clone, Debug, PartialEq)]
pub struct UpsertVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// Nearest-neighbour request against one namespace.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: u64,
    pub include_values: bool,
    pub include_metadata: bool,
}

/// Remote vector index.
///
/// Upserts are last-write-wins per id within a namespace. Query results come
/// back in the backend's rank order and are never re-sorted by callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<IndexSummary>, IndexError>;

    /// `Ok(None)` when the index does not exist.
    async fn describe_index(&self, name: &str) -> Result<Option<IndexStatus>, IndexError>;

    /// Fails with [`IndexError::AlreadyExists`] when the name is taken.
    async fn create_index(&self, descriptor: &IndexDescriptor) -> Result<(), IndexError>;

    /// Fails with [`IndexError::NotFound`] when the index is absent.
    async fn delete_index(&self, name: &str) -> Result<(), IndexError>;

    /// Returns the number of vectors acknowledged.
    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        vectors: Vec<UpsertVector>,
    ) -> Result<u64, IndexError>;

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        request: QueryRequest,
    ) -> Result<Vec<QueryMatch>, IndexError>;
}

/// Builds the client for the configured backend.
///
/// `timeout` bounds each HTTP request of REST backends; callers still wrap
/// calls in their own deadline.
pub fn build_index_client(
    backend: &VectorBackend,
    timeout: Duration,
) -> Result<Arc<dyn VectorIndexClient>, RagError> {
    Ok(match backend {
        VectorBackend::Pinecone(cfg) => Arc::new(PineconeIndexClient::new(cfg, timeout)?),
        VectorBackend::Qdrant(cfg) => Arc::new(QdrantFacade::new(cfg, timeout)?),
    })
}

/// Converts a JSON object returned by a backend into [`Metadata`].
///
/// Strings and string lists map directly; other scalars are kept in their
/// JSON text form. Nested objects and nulls are dropped.
pub(crate) fn metadata_from_json(map: serde_json::Map<String, Value>) -> Metadata {
    map.into_iter()
        .filter_map(|(k, v)| MetadataValue::from_json(v).map(|v| (k, v)))
        .collect()
}
