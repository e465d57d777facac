//! Batch ingestion: embed each record, validate its size, upsert it.
//!
//! Every record is an independent unit. Units run concurrently (bounded by
//! `concurrency`) and complete in any order; ids come from input positions,
//! so completion order never affects which id a record receives. One failed
//! unit never aborts its siblings.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::embed::EmbeddingClient;
use crate::errors::{IngestCause, IngestError, IngestStage};
use crate::index::{UpsertVector, VectorIndexClient};
use crate::record::{IndexDescriptor, IndexedVector, Record};
use crate::retry::RetryPolicy;

/// Id of the record at 0-based `position`: `<prefix>-<position + 1>`.
pub fn vector_id(prefix: &str, position: usize) -> String {
    format!("{}-{}", prefix, position + 1)
}

/// Embeds and stores batches of records.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    index: Arc<dyn VectorIndexClient>,
    retry: RetryPolicy,
    id_prefix: String,
    concurrency: usize,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndexClient>,
        retry: RetryPolicy,
        id_prefix: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            retry,
            id_prefix: id_prefix.into(),
            concurrency: 16,
        }
    }

    /// Maximum number of units in flight.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Ingests `records` into `descriptor.name` under `namespace`.
    ///
    /// Returns one outcome per input record, in input order. Completes only
    /// after every unit has settled.
    pub async fn ingest(
        &self,
        records: &[Record],
        descriptor: &IndexDescriptor,
        namespace: &str,
    ) -> Vec<Result<IndexedVector, IngestError>> {
        info!(
            index = %descriptor.name,
            namespace,
            total = records.len(),
            concurrency = self.concurrency,
            "ingesting batch"
        );

        let mut settled: Vec<(usize, Result<IndexedVector, IngestError>)> =
            stream::iter(records.iter().enumerate())
                .map(|(position, record)| async move {
                    (
                        position,
                        self.ingest_one(position, record, descriptor, namespace).await,
                    )
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;

        settled.sort_by_key(|(position, _)| *position);

        let failed = settled.iter().filter(|(_, r)| r.is_err()).count();
        debug!(
            stored = settled.len() - failed,
            failed, "batch settled"
        );

        settled.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn ingest_one(
        &self,
        position: usize,
        record: &Record,
        descriptor: &IndexDescriptor,
        namespace: &str,
    ) -> Result<IndexedVector, IngestError> {
        let id = vector_id(&self.id_prefix, position);
        let fail = |stage: IngestStage, cause: IngestCause| {
            let err = IngestError {
                position,
                id: id.clone(),
                stage,
                cause,
            };
            warn!(error = %err, "record not stored");
            err
        };

        let embedding = self
            .retry
            .run("embed", || self.embedder.embed(&record.text))
            .await
            .map_err(|e| fail(IngestStage::Embed, IngestCause::Embedding(e)))?;

        if embedding.dimension() != descriptor.dimension {
            return Err(fail(
                IngestStage::Validate,
                IngestCause::DimensionMismatch {
                    got: embedding.dimension(),
                    want: descriptor.dimension,
                },
            ));
        }

        let vector = UpsertVector {
            id: id.clone(),
            values: embedding.vector.clone(),
            metadata: record.metadata.clone(),
        };
        self.retry
            .run("upsert", || {
                self.index
                    .upsert(&descriptor.name, namespace, vec![vector.clone()])
            })
            .await
            .map_err(|e| fail(IngestStage::Upsert, IngestCause::Index(e)))?;

        info!(id = %id, index = %descriptor.name, namespace, "Embedding {id} stored");

        Ok(IndexedVector {
            id,
            position,
            embedding,
            metadata: record.metadata.clone(),
        })
    }
}
