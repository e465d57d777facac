use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Backend used to turn text into embedding vectors.
///
/// # Examples
///
/// ```
/// use embedding_service::EmbeddingProvider;
///
/// let provider: EmbeddingProvider = "openai".parse().unwrap();
/// assert_eq!(provider, EmbeddingProvider::OpenAI);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingProvider {
    /// Local Ollama runtime.
    Ollama,
    /// OpenAI `/v1/embeddings` API.
    OpenAI,
}

impl FromStr for EmbeddingProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "chatgpt" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
