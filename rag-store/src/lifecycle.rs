//! Idempotent index provisioning.
//!
//! `create` and `delete` first list the existing indexes and only issue the
//! mutating call when it would change something. A create racing with another
//! creator (remote reports "already exists") and a delete racing with another
//! deleter (remote reports "not found") resolve to the same no-op outcomes.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{IndexError, ProvisioningError};
use crate::index::VectorIndexClient;
use crate::record::IndexDescriptor;
use crate::retry::RetryPolicy;

/// Lifecycle action on an index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndexAction {
    Create,
    Delete,
}

impl fmt::Display for IndexAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexAction::Create => "create",
            IndexAction::Delete => "delete",
        })
    }
}

impl FromStr for IndexAction {
    type Err = ProvisioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(IndexAction::Create),
            "delete" => Ok(IndexAction::Delete),
            _ => Err(ProvisioningError::InvalidAction(s.to_string())),
        }
    }
}

/// What `ensure` did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleOutcome {
    Created,
    AlreadyExists,
    Deleted,
    DoesNotExist,
}

impl LifecycleOutcome {
    /// Whether a mutating remote call succeeded.
    pub fn changed(&self) -> bool {
        matches!(self, LifecycleOutcome::Created | LifecycleOutcome::Deleted)
    }
}

impl fmt::Display for LifecycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleOutcome::Created => "created",
            LifecycleOutcome::AlreadyExists => "already exists",
            LifecycleOutcome::Deleted => "deleted",
            LifecycleOutcome::DoesNotExist => "does not exist",
        })
    }
}

/// Creates and deletes indexes idempotently.
pub struct IndexLifecycleManager {
    client: Arc<dyn VectorIndexClient>,
    retry: RetryPolicy,
    ready_timeout: Duration,
    ready_poll: Duration,
}

impl IndexLifecycleManager {
    pub fn new(client: Arc<dyn VectorIndexClient>, retry: RetryPolicy) -> Self {
        Self {
            client,
            retry,
            ready_timeout: Duration::from_secs(60),
            ready_poll: Duration::from_secs(1),
        }
    }

    /// Overrides how long [`Self::wait_until_ready`] polls and how often.
    pub fn with_readiness(mut self, timeout: Duration, poll: Duration) -> Self {
        self.ready_timeout = timeout;
        self.ready_poll = poll;
        self
    }

    /// Parses `action` and applies it. An unknown action fails with
    /// [`ProvisioningError::InvalidAction`] before any remote call.
    pub async fn ensure_str(
        &self,
        action: &str,
        descriptor: &IndexDescriptor,
    ) -> Result<LifecycleOutcome, ProvisioningError> {
        let action = match action.parse::<IndexAction>() {
            Ok(a) => a,
            Err(e) => {
                warn!(action, "Invalid action. Use \"create\" or \"delete\".");
                return Err(e);
            }
        };
        self.ensure(action, descriptor).await
    }

    /// Brings the index named by `descriptor` into the state implied by `action`.
    ///
    /// # Errors
    /// [`ProvisioningError::Rejected`] when listing or the mutating call fails.
    pub async fn ensure(
        &self,
        action: IndexAction,
        descriptor: &IndexDescriptor,
    ) -> Result<LifecycleOutcome, ProvisioningError> {
        let name = descriptor.name.as_str();
        let rejected = |source: IndexError| ProvisioningError::Rejected {
            index: name.to_string(),
            action,
            source,
        };

        let existing = self
            .retry
            .run("list_indexes", || self.client.list_indexes())
            .await
            .map_err(rejected)?;
        let exists = existing.iter().any(|s| s.name == name);
        debug!(index = name, %action, exists, "listed indexes");

        let outcome = match (action, exists) {
            (IndexAction::Create, true) => LifecycleOutcome::AlreadyExists,
            (IndexAction::Create, false) => {
                match self
                    .retry
                    .run("create_index", || self.client.create_index(descriptor))
                    .await
                {
                    Ok(()) => LifecycleOutcome::Created,
                    Err(IndexError::AlreadyExists(_)) => LifecycleOutcome::AlreadyExists,
                    Err(e) => return Err(rejected(e)),
                }
            }
            (IndexAction::Delete, false) => LifecycleOutcome::DoesNotExist,
            (IndexAction::Delete, true) => {
                match self
                    .retry
                    .run("delete_index", || self.client.delete_index(name))
                    .await
                {
                    Ok(()) => LifecycleOutcome::Deleted,
                    Err(IndexError::NotFound(_)) => LifecycleOutcome::DoesNotExist,
                    Err(e) => return Err(rejected(e)),
                }
            }
        };

        match outcome {
            LifecycleOutcome::Created => info!(
                index = name,
                dimension = descriptor.dimension,
                metric = %descriptor.metric,
                cloud = %descriptor.placement.cloud,
                region = %descriptor.placement.region,
                "Index created"
            ),
            LifecycleOutcome::AlreadyExists => info!(index = name, "Index already exists"),
            LifecycleOutcome::Deleted => info!(index = name, "Index deleted"),
            LifecycleOutcome::DoesNotExist => info!(index = name, "Index does not exist"),
        }
        Ok(outcome)
    }

    /// Polls the index until the backend reports it ready.
    ///
    /// # Errors
    /// [`ProvisioningError::NotReady`] when the deadline passes first,
    /// [`ProvisioningError::Rejected`] when describing fails.
    pub async fn wait_until_ready(&self, name: &str) -> Result<(), ProvisioningError> {
        let started = Instant::now();
        loop {
            let status = self
                .retry
                .run("describe_index", || self.client.describe_index(name))
                .await
                .map_err(|source| ProvisioningError::Rejected {
                    index: name.to_string(),
                    action: IndexAction::Create,
                    source,
                })?;

            if status.as_ref().is_some_and(|s| s.ready) {
                debug!(index = name, waited_ms = started.elapsed().as_millis() as u64, "index ready");
                return Ok(());
            }

            if started.elapsed() >= self.ready_timeout {
                return Err(ProvisioningError::NotReady {
                    index: name.to_string(),
                    waited: started.elapsed(),
                });
            }
            tokio::time::sleep(self.ready_poll).await;
        }
    }
}
