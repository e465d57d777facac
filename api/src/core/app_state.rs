use std::time::Duration;

use thiserror::Error;

use crate::relay::ProcessRelay;

/// Startup configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Shared state for all HTTP handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Address the server binds to, e.g. "0.0.0.0:3001".
    pub address: String,
    /// Process answering questions.
    pub relay: ProcessRelay,
}

impl AppState {
    /// Load shared state from environment variables.
    ///
    /// - `API_ADDRESS` (default `0.0.0.0:3001`)
    /// - `RELAY_PROGRAM` (default `python`)
    /// - `RELAY_ARGS`, whitespace separated (default `test.py`)
    /// - `RELAY_TIMEOUT_SECS` (default `120`)
    pub fn from_env() -> Result<Self, ConfigError> {
        let address = env_or("API_ADDRESS", "0.0.0.0:3001");
        let program = env_or("RELAY_PROGRAM", "python");
        let args = env_or("RELAY_ARGS", "test.py")
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let timeout_secs = match std::env::var("RELAY_TIMEOUT_SECS") {
            Ok(v) if !v.trim().is_empty() => {
                v.trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::Invalid {
                        var: "RELAY_TIMEOUT_SECS",
                        reason: e.to_string(),
                    })?
            }
            _ => 120,
        };
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "RELAY_TIMEOUT_SECS",
                reason: "must be > 0".into(),
            });
        }

        Ok(Self {
            address,
            relay: ProcessRelay::new(program, args, Duration::from_secs(timeout_secs)),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}
