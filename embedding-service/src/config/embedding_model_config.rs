use crate::config::embedding_provider::EmbeddingProvider;

/// Configuration for one embedding model endpoint.
///
/// # Fields
///
/// - `provider`: which backend serves the model.
/// - `model`: model identifier (e.g., `"text-embedding-ada-002"`).
/// - `endpoint`: base URL of the API, without the route suffix.
/// - `api_key`: optional key for providers that require authentication.
/// - `timeout_secs`: optional per-request timeout.
///
/// # Examples
///
/// ```
/// use embedding_service::{EmbeddingModelConfig, EmbeddingProvider};
///
/// let cfg = EmbeddingModelConfig {
///     provider: EmbeddingProvider::OpenAI,
///     model: "text-embedding-ada-002".to_string(),
///     endpoint: "https://api.openai.com".to_string(),
///     api_key: Some("sk-...".to_string()),
///     timeout_secs: Some(30),
/// };
/// assert_eq!(cfg.model, "text-embedding-ada-002");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmbeddingModelConfig {
    /// The embedding provider/backend.
    pub provider: EmbeddingProvider,

    /// Model identifier string.
    pub model: String,

    /// Base URL (local socket/URL or remote API URL).
    pub endpoint: String,

    /// Optional API key for authentication (e.g., OpenAI).
    pub api_key: Option<String>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}
