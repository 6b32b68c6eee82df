use super::capability::{CapabilityContext, CapabilityOutput, CapabilityRegistry, ProgressReporter};
use crate::error::CapabilityError;
use crate::events::{Signal, SignalSender};
use crate::observability::{Observer, ObserverEvent};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

/// Wraps capability execution with lifecycle signals.
///
/// Every invocation emits exactly one `CapabilityStarted` and then exactly one
/// of `CapabilityCompleted` / `CapabilityFailed`. Failures are returned to the
/// caller unchanged: no retry, no fallback value.
pub struct CapabilityInvoker {
    registry: Arc<CapabilityRegistry>,
    signals: SignalSender,
    observer: Arc<dyn Observer>,
    task_id: String,
}

impl CapabilityInvoker {
    pub fn new(
        task_id: impl Into<String>,
        registry: Arc<CapabilityRegistry>,
        signals: SignalSender,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            registry,
            signals,
            observer,
            task_id: task_id.into(),
        }
    }

    pub async fn invoke(
        &self,
        name: &str,
        input: Value,
    ) -> Result<CapabilityOutput, CapabilityError> {
        self.signals
            .emit(Signal::CapabilityStarted {
                name: name.to_string(),
            })
            .await;
        let started = Instant::now();

        let result = match self.registry.get(name) {
            Some(capability) => {
                let ctx = CapabilityContext {
                    task_id: self.task_id.clone(),
                    progress: ProgressReporter::new(name, self.signals.clone()),
                };
                capability
                    .invoke(input, &ctx)
                    .await
                    .map_err(|error| CapabilityError::Failed {
                        name: name.to_string(),
                        message: format!("{error:#}"),
                    })
            }
            None => Err(CapabilityError::NotFound {
                name: name.to_string(),
            }),
        };
        let duration = started.elapsed();

        self.observer.record_event(&ObserverEvent::CapabilityCall {
            task_id: self.task_id.clone(),
            capability: name.to_string(),
            duration,
            success: result.is_ok(),
        });

        match &result {
            Ok(output) => {
                self.signals
                    .emit(Signal::CapabilityCompleted {
                        name: name.to_string(),
                        summary: output.summary.clone(),
                        duration,
                    })
                    .await;
            }
            Err(error) => {
                tracing::warn!(task_id = %self.task_id, capability = name, error = %error, "capability failed");
                self.signals
                    .emit(Signal::CapabilityFailed {
                        name: name.to_string(),
                        message: error.message(),
                        duration,
                    })
                    .await;
            }
        }

        result
    }
}
