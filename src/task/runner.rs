use super::registry::TaskRegistry;
use crate::agent::ReasoningLoop;
use crate::error::RelayError;
use crate::events::{EventMapper, Signal, SignalSender};
use crate::observability::{Observer, ObserverEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Body of `POST /tasks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub alert: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
}

/// Accepts work on the worker and wires controller -> mapper -> registry.
pub struct TaskRunner {
    registry: Arc<TaskRegistry>,
    controller: Arc<ReasoningLoop>,
    observer: Arc<dyn Observer>,
    default_agent: String,
    signal_buffer: usize,
}

impl TaskRunner {
    pub fn new(
        registry: Arc<TaskRegistry>,
        controller: Arc<ReasoningLoop>,
        observer: Arc<dyn Observer>,
        default_agent: impl Into<String>,
        signal_buffer: usize,
    ) -> Self {
        Self {
            registry,
            controller,
            observer,
            default_agent: default_agent.into(),
            signal_buffer,
        }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Register a task and start it in the background; returns immediately.
    pub fn submit(&self, submission: Submission) -> Result<String, RelayError> {
        let agent = submission
            .agent
            .unwrap_or_else(|| self.default_agent.clone());
        if !self.controller.planners().contains(&agent) {
            return Err(RelayError::UnknownAgent(agent));
        }
        if !submission.alert.is_object() {
            return Err(RelayError::InvalidSubmission(
                "alert must be a JSON object".to_string(),
            ));
        }

        let task_id = uuid::Uuid::new_v4().to_string();
        self.registry.register(&task_id)?;
        self.observer.record_event(&ObserverEvent::TaskSubmitted {
            task_id: task_id.clone(),
            agent: agent.clone(),
        });

        let (signals, rx) = SignalSender::channel(self.signal_buffer);
        tokio::spawn(drive_mapper(
            Arc::clone(&self.registry),
            Arc::clone(&self.observer),
            task_id.clone(),
            rx,
        ));

        let controller = Arc::clone(&self.controller);
        let id = task_id.clone();
        tokio::spawn(async move {
            let outcome = controller
                .run(&id, submission.alert, &agent, signals)
                .await;
            tracing::debug!(
                task_id = %id,
                phase = %outcome.phase,
                reason = %outcome.termination_reason,
                iterations = outcome.iterations,
                "reasoning loop finished"
            );
        });

        Ok(task_id)
    }
}

/// Sole writer of a worker task's log.
///
/// Runs until the terminal event is appended. If every signal sender is gone
/// first (the controller returned early or panicked) a terminal error is
/// appended in its place.
pub(crate) async fn drive_mapper(
    registry: Arc<TaskRegistry>,
    observer: Arc<dyn Observer>,
    task_id: String,
    mut rx: mpsc::Receiver<Signal>,
) {
    let started = Instant::now();
    let mut mapper = EventMapper::new(task_id.as_str());

    while let Some(signal) = rx.recv().await {
        let Some(event) = mapper.normalize(signal) else {
            continue;
        };
        let is_final = event.is_final;
        if let Err(error) = registry.append(&task_id, event) {
            tracing::error!(task_id = %task_id, error = %error, "event append rejected; mapper stopping");
            return;
        }
        if is_final {
            break;
        }
    }

    if !mapper.is_terminated() {
        tracing::warn!(task_id = %task_id, "reasoning loop stopped without a terminal event");
        if let Some(event) = mapper.synthesize_failure(
            "reasoning_loop",
            "reasoning loop stopped without a terminal event",
        ) && let Err(error) = registry.append(&task_id, event)
        {
            tracing::error!(task_id = %task_id, error = %error, "synthesized failure rejected");
            return;
        }
    }

    let state = registry
        .get_state(&task_id)
        .map(|state| state.to_string())
        .unwrap_or_default();
    observer.record_event(&ObserverEvent::TaskTerminal {
        task_id,
        state,
        events: mapper.next_id().saturating_sub(1),
        duration: started.elapsed(),
    });
}
