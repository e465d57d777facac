//! Similarity query: embed the query text, ask the index for its nearest
//! neighbours, return them in the index's rank order.

use std::sync::Arc;

use reqwest::StatusCode;
use tracing::{debug, info};

use crate::embed::EmbeddingClient;
use crate::errors::{IndexError, QueryError};
use crate::index::{QueryRequest, VectorIndexClient};
use crate::record::{IndexDescriptor, QueryResult, SimilarityQuery};
use crate::retry::RetryPolicy;

/// Answers similarity queries against one index.
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndexClient>,
    retry: RetryPolicy,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndexClient>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            embedder,
            index,
            retry,
        }
    }

    /// Embeds `text` and retrieves at most `options.top_k` matches from
    /// `descriptor.name` / `namespace`.
    ///
    /// The embedder must be the one used at ingestion time; only the vector
    /// size can be checked locally.
    ///
    /// # Errors
    /// - [`QueryError::Embedding`] if the query text cannot be embedded
    /// - [`QueryError::DimensionMismatch`] if the vector does not fit the index
    /// - [`QueryError::IndexNotFound`] if the index is absent
    /// - [`QueryError::Retrieval`] for any other index failure
    pub async fn query(
        &self,
        text: &str,
        descriptor: &IndexDescriptor,
        namespace: &str,
        options: &SimilarityQuery,
    ) -> Result<QueryResult, QueryError> {
        let embedding = self
            .retry
            .run("embed_query", || self.embedder.embed(text))
            .await
            .map_err(QueryError::Embedding)?;

        if embedding.dimension() != descriptor.dimension {
            return Err(QueryError::DimensionMismatch {
                index: descriptor.name.clone(),
                got: embedding.dimension(),
                want: descriptor.dimension,
            });
        }

        let request = QueryRequest {
            vector: embedding.vector,
            top_k: options.top_k,
            include_values: options.include_values,
            include_metadata: options.include_metadata,
        };
        debug!(index = %descriptor.name, namespace, top_k = options.top_k, "querying index");

        let matches = self
            .retry
            .run("query", || {
                self.index
                    .query(&descriptor.name, namespace, request.clone())
            })
            .await
            .map_err(|e| match e {
                IndexError::NotFound(name) => QueryError::IndexNotFound(name),
                IndexError::HttpStatus { status, .. } if status == StatusCode::NOT_FOUND => {
                    QueryError::IndexNotFound(descriptor.name.clone())
                }
                source => QueryError::Retrieval {
                    index: descriptor.name.clone(),
                    source,
                },
            })?;

        let result = QueryResult {
            query: text.to_string(),
            namespace: namespace.to_string(),
            metric: descriptor.metric,
            matches,
        };

        match result.top() {
            Some(top) => info!(
                query = %result.query,
                matches = result.matches.len(),
                top_id = %top.id,
                top_score = top.score,
                metric = %result.metric,
                higher_is_closer = result.metric.higher_is_closer(),
                "query answered"
            ),
            None => info!(query = %result.query, namespace, "query returned no matches"),
        }

        Ok(result)
    }
}
