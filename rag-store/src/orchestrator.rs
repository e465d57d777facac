//! One pipeline run: ensure the index, ingest the batch, query it.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::RagConfig;
use crate::embed::EmbeddingClient;
use crate::errors::{IngestError, RagError};
use crate::index::VectorIndexClient;
use crate::ingest::IngestionPipeline;
use crate::lifecycle::{IndexAction, IndexLifecycleManager, LifecycleOutcome};
use crate::record::{IndexedVector, QueryResult, Record};
use crate::retrieve::QueryPipeline;

/// Everything a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    /// Outcome of the initial `create`.
    pub lifecycle: LifecycleOutcome,
    /// Stored vectors, in input order.
    pub stored: Vec<IndexedVector>,
    /// Records that were not stored, in input order.
    pub failures: Vec<IngestError>,
    pub query: QueryResult,
    /// Outcome of the trailing `delete`, when enabled.
    pub deleted: Option<LifecycleOutcome>,
}

impl RunReport {
    /// True when every record was stored.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sequences lifecycle → ingestion → query for one configuration.
pub struct Orchestrator {
    cfg: RagConfig,
    lifecycle: IndexLifecycleManager,
    ingestion: IngestionPipeline,
    query: QueryPipeline,
}

impl Orchestrator {
    pub fn new(
        cfg: RagConfig,
        embedder: Arc<dyn EmbeddingClient>,
        index: Arc<dyn VectorIndexClient>,
    ) -> Self {
        let lifecycle = IndexLifecycleManager::new(Arc::clone(&index), cfg.retry.clone())
            .with_readiness(cfg.ready_timeout, cfg.ready_poll);
        let ingestion = IngestionPipeline::new(
            Arc::clone(&embedder),
            Arc::clone(&index),
            cfg.retry.clone(),
            cfg.embedding_id.clone(),
        )
        .with_concurrency(cfg.ingest_concurrency);
        let query = QueryPipeline::new(embedder, index, cfg.retry.clone());

        Self {
            cfg,
            lifecycle,
            ingestion,
            query,
        }
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    /// Runs the full sequence over `records`.
    ///
    /// The query is issued only after every ingestion unit has settled.
    /// Per-record failures are collected in the report; a lifecycle or query
    /// failure aborts the run.
    ///
    /// # Errors
    /// [`RagError::Provisioning`] or [`RagError::Query`].
    pub async fn run(&self, records: &[Record]) -> Result<RunReport, RagError> {
        let cfg = &self.cfg;

        let lifecycle = self.lifecycle.ensure(IndexAction::Create, &cfg.index).await?;
        self.lifecycle.wait_until_ready(&cfg.index.name).await?;

        let outcomes = self
            .ingestion
            .ingest(records, &cfg.index, &cfg.namespace)
            .await;
        let (stored, failures) = partition(outcomes);
        info!(
            index = %cfg.index.name,
            namespace = %cfg.namespace,
            stored = stored.len(),
            failed = failures.len(),
            "ingestion finished"
        );
        for f in &failures {
            error!(position = f.position, id = %f.id, stage = %f.stage, error = %f.cause, "ingestion failure");
        }

        let query = self
            .query
            .query(&cfg.query, &cfg.index, &cfg.namespace, &cfg.similarity)
            .await?;

        let deleted = if cfg.delete_after_run {
            Some(self.lifecycle.ensure(IndexAction::Delete, &cfg.index).await?)
        } else {
            None
        };

        Ok(RunReport {
            lifecycle,
            stored,
            failures,
            query,
            deleted,
        })
    }
}

/// Splits per-record outcomes, keeping input order on both sides.
pub fn partition(
    outcomes: Vec<Result<IndexedVector, IngestError>>,
) -> (Vec<IndexedVector>, Vec<IngestError>) {
    let mut stored = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for o in outcomes {
        match o {
            Ok(v) => stored.push(v),
            Err(e) => failures.push(e),
        }
    }
    (stored, failures)
}
