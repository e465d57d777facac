//! Default embedding configs loaded from environment variables.
//!
//! # Environment variables
//!
//! Common:
//! - `EMBEDDING_PROVIDER`      = `openai` (default) or `ollama`
//! - `EMBEDDING_MODEL`         = model id (default `text-embedding-ada-002`)
//! - `EMBEDDING_TIMEOUT_SECS`  = optional per-request timeout (default 30)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY` (mandatory)
//! - `OPENAI_URL`     (default `https://api.openai.com`)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)

use crate::{
    config::{embedding_model_config::EmbeddingModelConfig, embedding_provider::EmbeddingProvider},
    error_handler::{
        ConfigError, EmbeddingError, env_opt_u64, must_env, opt_env, validate_http_endpoint,
    },
};

/// Default OpenAI API base.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";

/// Default embedding model (1536-dimensional).
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, EmbeddingError> {
    if let Some(url) = opt_env("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = opt_env("OLLAMA_PORT") {
        let _ = port
            .trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidNumber {
                var: "OLLAMA_PORT",
                reason: "expected u16 (1..=65535)",
            })?;
        return Ok(format!("http://localhost:{}", port.trim()));
    }
    Err(EmbeddingError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}

fn embedding_model() -> String {
    opt_env("EMBEDDING_MODEL").unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string())
}

fn timeout_secs() -> Result<Option<u64>, EmbeddingError> {
    Ok(Some(
        env_opt_u64("EMBEDDING_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS),
    ))
}

/// Constructs a config for the OpenAI embeddings endpoint.
///
/// # Env
/// - `OPENAI_API_KEY` (required)
/// - `OPENAI_URL`, `EMBEDDING_MODEL`, `EMBEDDING_TIMEOUT_SECS` (optional)
pub fn config_openai_embedding() -> Result<EmbeddingModelConfig, EmbeddingError> {
    let api_key = must_env("OPENAI_API_KEY")?;
    let endpoint = opt_env("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    validate_http_endpoint("OPENAI_URL", &endpoint)?;

    Ok(EmbeddingModelConfig {
        provider: EmbeddingProvider::OpenAI,
        model: embedding_model(),
        endpoint,
        api_key: Some(api_key),
        timeout_secs: timeout_secs()?,
    })
}

/// Constructs a config for a local Ollama embedding model.
///
/// # Env
/// - `OLLAMA_URL` or `OLLAMA_PORT` (required)
/// - `EMBEDDING_MODEL`, `EMBEDDING_TIMEOUT_SECS` (optional)
pub fn config_ollama_embedding() -> Result<EmbeddingModelConfig, EmbeddingError> {
    let endpoint = ollama_endpoint()?;

    Ok(EmbeddingModelConfig {
        provider: EmbeddingProvider::Ollama,
        model: embedding_model(),
        endpoint,
        api_key: None,
        timeout_secs: timeout_secs()?,
    })
}

/// Picks the provider from `EMBEDDING_PROVIDER` (default OpenAI) and builds its config.
pub fn config_from_env() -> Result<EmbeddingModelConfig, EmbeddingError> {
    let provider = match opt_env("EMBEDDING_PROVIDER") {
        Some(p) => p.parse::<EmbeddingProvider>()?,
        None => EmbeddingProvider::OpenAI,
    };
    match provider {
        EmbeddingProvider::OpenAI => config_openai_embedding(),
        EmbeddingProvider::Ollama => config_ollama_embedding(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openai_defaults_apply() {
        temp_env::with_vars(
            [
                ("EMBEDDING_PROVIDER", None),
                ("OPENAI_API_KEY", Some("sk-test")),
                ("OPENAI_URL", None),
                ("EMBEDDING_MODEL", None),
                ("EMBEDDING_TIMEOUT_SECS", None),
            ],
            || {
                let cfg = config_from_env().unwrap();
                assert_eq!(cfg.provider, EmbeddingProvider::OpenAI);
                assert_eq!(cfg.endpoint, DEFAULT_OPENAI_URL);
                assert_eq!(cfg.model, DEFAULT_EMBEDDING_MODEL);
                assert_eq!(cfg.api_key.as_deref(), Some("sk-test"));
                assert_eq!(cfg.timeout_secs, Some(30));
            },
        );
    }

    #[test]
    fn openai_requires_api_key() {
        temp_env::with_vars(
            [("EMBEDDING_PROVIDER", Some("openai")), ("OPENAI_API_KEY", None)],
            || {
                let err = config_from_env().unwrap_err();
                assert!(err.to_string().contains("OPENAI_API_KEY"));
            },
        );
    }

    #[test]
    fn ollama_port_fallback() {
        temp_env::with_vars(
            [
                ("EMBEDDING_PROVIDER", Some("ollama")),
                ("OLLAMA_URL", None),
                ("OLLAMA_PORT", Some("11434")),
                ("EMBEDDING_MODEL", Some("nomic-embed-text")),
            ],
            || {
                let cfg = config_from_env().unwrap();
                assert_eq!(cfg.provider, EmbeddingProvider::Ollama);
                assert_eq!(cfg.endpoint, "http://localhost:11434");
                assert_eq!(cfg.model, "nomic-embed-text");
            },
        );
    }

    #[test]
    fn unknown_provider_is_rejected() {
        temp_env::with_var("EMBEDDING_PROVIDER", Some("cohere"), || {
            assert!(config_from_env().is_err());
        });
    }
}
