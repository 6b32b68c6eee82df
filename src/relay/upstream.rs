use super::pump::pump_upstream;
use crate::error::{RegistryError, RelayError, TransportError};
use crate::events::Source;
use crate::observability::Observer;
use crate::task::{Submission, TaskRegistry, TaskRunner};
use crate::transport::SseClient;
use futures_util::future::BoxFuture;
use std::sync::Arc;

/// Where a hop's events come from.
///
/// The worker's producer is its own reasoning loop; coordinator and gateway
/// pull from the next hop inward over HTTP.
pub trait Upstream: Send + Sync {
    fn name(&self) -> &str;

    /// Accept new work and return its task id.
    fn submit(&self, submission: Submission) -> BoxFuture<'_, Result<String, RelayError>>;

    /// Make sure `task_id` is known to the local registry.
    fn ensure<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<(), RelayError>>;
}

/// Innermost upstream: tasks run in this process.
pub struct LocalUpstream {
    runner: Arc<TaskRunner>,
}

impl LocalUpstream {
    pub fn new(runner: Arc<TaskRunner>) -> Self {
        Self { runner }
    }
}

impl Upstream for LocalUpstream {
    fn name(&self) -> &str {
        "local"
    }

    fn submit(&self, submission: Submission) -> BoxFuture<'_, Result<String, RelayError>> {
        Box::pin(async move { self.runner.submit(submission) })
    }

    fn ensure<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<(), RelayError>> {
        Box::pin(async move {
            if self.runner.registry().contains(task_id) {
                Ok(())
            } else {
                Err(RelayError::UnknownTask(task_id.to_string()))
            }
        })
    }
}

/// Upstream reached over HTTP; mirrors remote tasks into the local registry.
pub struct HttpUpstream {
    client: SseClient,
    registry: Arc<TaskRegistry>,
    observer: Arc<dyn Observer>,
    hop: String,
    source: Source,
}

impl HttpUpstream {
    pub fn new(
        client: SseClient,
        registry: Arc<TaskRegistry>,
        observer: Arc<dyn Observer>,
        hop: impl Into<String>,
        source: Source,
    ) -> Self {
        Self {
            client,
            registry,
            observer,
            hop: hop.into(),
            source,
        }
    }

    /// Register the task locally and start its pump, once per process.
    fn adopt(&self, task_id: &str) -> Result<(), RelayError> {
        match self.registry.register(task_id) {
            Ok(()) => {
                tokio::spawn(pump_upstream(
                    self.client.clone(),
                    Arc::clone(&self.registry),
                    Arc::clone(&self.observer),
                    task_id.to_string(),
                    self.hop.clone(),
                    self.source,
                ));
                Ok(())
            }
            // Another request adopted it first; its pump is already running.
            Err(RegistryError::DuplicateTask(_)) => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

impl Upstream for HttpUpstream {
    fn name(&self) -> &str {
        self.client.base_url()
    }

    fn submit(&self, submission: Submission) -> BoxFuture<'_, Result<String, RelayError>> {
        Box::pin(async move {
            let task_id = self
                .client
                .submit(&submission)
                .await
                .map_err(|error| match error {
                    TransportError::Status { code: 400, .. } => {
                        RelayError::InvalidSubmission(format!("rejected upstream: {error}"))
                    }
                    other => RelayError::Transport(other),
                })?;
            tracing::info!(hop = %self.hop, task_id = %task_id, "submission forwarded upstream");
            self.adopt(&task_id)?;
            Ok(task_id)
        })
    }

    fn ensure<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<(), RelayError>> {
        Box::pin(async move {
            if self.registry.contains(task_id) {
                return Ok(());
            }
            match self.client.status(task_id).await {
                Ok(_) => {
                    tracing::debug!(hop = %self.hop, task_id, "discovered task upstream");
                    self.adopt(task_id)
                }
                Err(TransportError::NotFound(_)) => Err(RelayError::UnknownTask(task_id.to_string())),
                Err(error) => Err(RelayError::Upstream(error.to_string())),
            }
        })
    }
}
