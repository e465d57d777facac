//! Embedding providers behind a single entry point.
//!
//! - [`config`] builds [`EmbeddingModelConfig`] values from the environment.
//! - [`services`] holds the HTTP clients (OpenAI, Ollama).
//! - [`EmbeddingService`] dispatches to the configured provider.
//! - [`telemetry`] exposes a tracing layer scoped to this crate.

pub mod config;
pub mod embedding_service;
pub mod error_handler;
pub mod services;
pub mod telemetry;

pub use config::embedding_model_config::EmbeddingModelConfig;
pub use config::embedding_provider::EmbeddingProvider;
pub use embedding_service::EmbeddingService;
pub use error_handler::{EmbeddingError, Provider, ProviderError, ProviderErrorKind};
