//! Unified error types for the crate.
//!
//! - [`IndexError`]: one failed call to the vector index backend.
//! - [`EmbedError`]: one failed call to the embedding backend.
//! - [`ProvisioningError`]: index create/delete rejected or never became ready.
//! - [`IngestError`]: one record of a batch failed (which record, which stage, why).
//! - [`QueryError`]: query-time embedding or retrieval failed.
//! - [`RagError`]: top-level error for config loading and the orchestrated run.

use std::fmt;
use std::time::Duration;

use embedding_service::EmbeddingError;
use reqwest::StatusCode;
use thiserror::Error;

use crate::lifecycle::IndexAction;

/// Errors that may be retried with backoff.
pub trait Transient {
    /// Whether the same call may succeed if repeated.
    fn is_transient(&self) -> bool;

    /// Builds the error reported when a call exceeds its deadline.
    fn timed_out(after: Duration) -> Self;
}

/// Vector index backend failure.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Index (or its data-plane host) is absent.
    #[error("index '{0}' not found")]
    NotFound(String),

    /// Create was rejected because the index is already present.
    #[error("index '{0}' already exists")]
    AlreadyExists(String),

    /// Non-2xx response from a REST backend.
    #[error("HTTP {status} from {url}: {snippet}")]
    HttpStatus {
        status: StatusCode,
        url: String,
        snippet: String,
    },

    /// Transport/client failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Qdrant client errors (wrapped).
    #[error("qdrant error: {0}")]
    Qdrant(String),

    #[error("index call timed out after {0:?}")]
    Timeout(Duration),
}

impl Transient for IndexError {
    fn is_transient(&self) -> bool {
        match self {
            IndexError::Timeout(_) => true,
            IndexError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            IndexError::HttpStatus { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            _ => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        IndexError::Timeout(after)
    }
}

/// Embedding backend failure as seen by the pipelines.
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error(transparent)]
    Service(#[from] EmbeddingError),

    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    /// Rejected input or provider without a transient cause.
    #[error("embedding rejected: {0}")]
    Rejected(String),
}

impl Transient for EmbedError {
    fn is_transient(&self) -> bool {
        match self {
            EmbedError::Service(e) => e.is_transient(),
            EmbedError::Timeout(_) => true,
            EmbedError::Rejected(_) => false,
        }
    }

    fn timed_out(after: Duration) -> Self {
        EmbedError::Timeout(after)
    }
}

/// Index lifecycle failure.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Action outside `create | delete`; no remote call was made.
    #[error("invalid action '{0}': use \"create\" or \"delete\"")]
    InvalidAction(String),

    #[error("{action} of index '{index}' rejected: {source}")]
    Rejected {
        index: String,
        action: IndexAction,
        #[source]
        source: IndexError,
    },

    #[error("index '{index}' not ready after {waited:?}")]
    NotReady { index: String, waited: Duration },
}

/// Stage of a record's embed + upsert unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngestStage {
    Embed,
    Validate,
    Upsert,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IngestStage::Embed => "embed",
            IngestStage::Validate => "validate",
            IngestStage::Upsert => "upsert",
        })
    }
}

/// Underlying cause of an [`IngestError`].
#[derive(Debug, Error)]
pub enum IngestCause {
    #[error(transparent)]
    Embedding(EmbedError),

    #[error("vector size mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error(transparent)]
    Index(IndexError),
}

/// Failure of one record; siblings in the batch are unaffected.
#[derive(Debug, Error)]
#[error("record at position {position} ({id}) failed at {stage}: {cause}")]
pub struct IngestError {
    /// 0-based position of the record in its batch.
    pub position: usize,
    /// Id the record would have been stored under.
    pub id: String,
    pub stage: IngestStage,
    #[source]
    pub cause: IngestCause,
}

/// Query-time failure.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("query embedding failed: {0}")]
    Embedding(#[source] EmbedError),

    #[error("query vector has dimension {got}, index '{index}' expects {want}")]
    DimensionMismatch {
        index: String,
        got: usize,
        want: usize,
    },

    #[error("index '{0}' does not exist")]
    IndexNotFound(String),

    #[error("similarity query against '{index}' failed: {source}")]
    Retrieval {
        index: String,
        #[source]
        source: IndexError,
    },
}

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// I/O or filesystem errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSONL line could not be parsed.
    #[error("parse error at line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Index(#[from] IndexError),
}
