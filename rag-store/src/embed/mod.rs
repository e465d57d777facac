//! Text → vector boundary used by the pipelines.

pub mod service_embedder;

use async_trait::async_trait;

use crate::errors::EmbedError;
use crate::record::Embedding;

pub use service_embedder::ServiceEmbedder;

/// Produces one embedding per input text.
///
/// Implementations are shared across concurrent ingestion tasks and must be
/// safe to call in parallel.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embeds `text` with the configured model.
    async fn embed(&self, text: &str) -> Result<Embedding, EmbedError>;
}
