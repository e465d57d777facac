//! Shared embedding service bound to one model profile.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - The underlying HTTP client is built at construction, so a bad config
//!   fails at startup instead of on the first call.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use embedding_service::EmbeddingService;
//! use embedding_service::config::default_config::config_from_env;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let svc = Arc::new(EmbeddingService::new(config_from_env()?)?);
//! let emb = svc.embed("Ferris").await?;
//! println!("Embedding dim = {}", emb.len());
//! # Ok(()) }
//! ```

use tracing::trace;

use crate::{
    config::{embedding_model_config::EmbeddingModelConfig, embedding_provider::EmbeddingProvider},
    error_handler::EmbeddingError,
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

enum Backend {
    Ollama(OllamaService),
    OpenAi(OpenAiService),
}

/// Embedding service for a single configured model.
pub struct EmbeddingService {
    cfg: EmbeddingModelConfig,
    backend: Backend,
}

impl EmbeddingService {
    /// Builds the provider client for `cfg`.
    ///
    /// # Errors
    /// Returns [`EmbeddingError`] if the provider rejects the config
    /// (missing key, bad endpoint) or the HTTP client cannot be built.
    pub fn new(cfg: EmbeddingModelConfig) -> Result<Self, EmbeddingError> {
        let backend = match cfg.provider {
            EmbeddingProvider::Ollama => Backend::Ollama(OllamaService::new(cfg.clone())?),
            EmbeddingProvider::OpenAI => Backend::OpenAi(OpenAiService::new(cfg.clone())?),
        };
        Ok(Self { cfg, backend })
    }

    /// Computes one embedding vector for `input`.
    ///
    /// # Errors
    /// Returns [`EmbeddingError`] if the provider call fails.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, EmbeddingError> {
        trace!(provider = ?self.cfg.provider, model = %self.cfg.model, "EmbeddingService::embed");
        match &self.backend {
            Backend::Ollama(cli) => cli.embeddings(input).await,
            Backend::OpenAi(cli) => cli.embeddings(input).await,
        }
    }

    /// The model profile this service is bound to.
    pub fn config(&self) -> &EmbeddingModelConfig {
        &self.cfg
    }
}
