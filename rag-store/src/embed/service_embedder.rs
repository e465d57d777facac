use std::sync::Arc;

use async_trait::async_trait;
use embedding_service::EmbeddingService;
use tracing::trace;

use crate::embed::EmbeddingClient;
use crate::errors::EmbedError;
use crate::record::Embedding;

/// [`EmbeddingClient`] backed by the shared [`EmbeddingService`].
#[derive(Clone)]
pub struct ServiceEmbedder {
    svc: Arc<EmbeddingService>,
}

impl ServiceEmbedder {
    pub fn new(svc: Arc<EmbeddingService>) -> Self {
        Self { svc }
    }
}

#[async_trait]
impl EmbeddingClient for ServiceEmbedder {
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError> {
        if text.trim().is_empty() {
            return Err(EmbedError::Rejected("input text is empty".into()));
        }
        let vector = self.svc.embed(text).await?;
        trace!(model = %self.svc.config().model, dim = vector.len(), "embedded text");
        Ok(Embedding::new(vector))
    }
}
