use super::envelope::{Event, EventKind, Source};
use super::signal::Signal;
use serde_json::Value;

/// Normalizes internal [`Signal`]s for one task into canonical [`Event`]s.
///
/// Ids are a per-task counter starting at 1, so consumers can detect gaps from
/// the integer sequence alone. Once a final event has been produced every
/// further signal is dropped.
#[derive(Debug)]
pub struct EventMapper {
    task_id: String,
    next_id: u64,
    terminated: bool,
}

impl EventMapper {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            next_id: 1,
            terminated: false,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Id the next mapped event will carry.
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    pub fn normalize(&mut self, signal: Signal) -> Option<Event> {
        if self.terminated {
            tracing::warn!(
                task_id = %self.task_id,
                signal = signal.kind_name(),
                "signal after terminal event dropped"
            );
            return None;
        }
        let (source, kind, is_final) = map_signal(signal, &self.task_id)?;
        Some(self.stamp(source, kind, is_final))
    }

    /// Terminal error for a producer that stopped without a final event.
    pub fn synthesize_failure(&mut self, stage: &str, message: &str) -> Option<Event> {
        if self.terminated {
            return None;
        }
        let kind = EventKind::Error {
            message: message.to_string(),
            capability: None,
            stage: stage.to_string(),
        };
        Some(self.stamp(Source::Worker, kind, true))
    }

    fn stamp(&mut self, source: Source, kind: EventKind, is_final: bool) -> Event {
        let event = Event::new(self.next_id, self.task_id.clone(), source, kind, is_final);
        self.next_id += 1;
        self.terminated = is_final;
        event
    }
}

fn map_signal(signal: Signal, task_id: &str) -> Option<(Source, EventKind, bool)> {
    let mapped = match signal {
        Signal::AnalysisStarted {
            agent,
            max_iterations,
        } => (
            Source::ReasoningLoop,
            EventKind::AnalysisStarted {
                agent,
                max_iterations,
            },
            false,
        ),
        Signal::Thinking { agent, iteration } => (
            Source::ReasoningLoop,
            EventKind::AgentThinking { agent, iteration },
            false,
        ),
        Signal::Routed { from, to, reason } => (
            Source::ReasoningLoop,
            EventKind::Routing { from, to, reason },
            false,
        ),
        Signal::HandedOff { from, to } => (
            Source::ReasoningLoop,
            EventKind::AgentHandoff { from, to },
            false,
        ),
        Signal::CapabilityStarted { name } => (
            Source::CapabilityInvoker,
            EventKind::ToolStarted { name },
            false,
        ),
        Signal::CapabilityProgress {
            name,
            message,
            fraction,
        } => (
            Source::CapabilityInvoker,
            EventKind::ToolProgress {
                name,
                message,
                fraction,
            },
            false,
        ),
        Signal::CapabilityCompleted {
            name,
            summary,
            duration,
        } => (
            Source::CapabilityInvoker,
            EventKind::ToolCompleted {
                name,
                summary,
                duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
            },
            false,
        ),
        Signal::CapabilityFailed { name, message, .. } => (
            Source::CapabilityInvoker,
            EventKind::Error {
                message,
                capability: Some(name),
                stage: "capability".to_string(),
            },
            true,
        ),
        Signal::Completed {
            determination,
            reason,
            iterations,
        } => (
            Source::ReasoningLoop,
            EventKind::AnalysisComplete {
                determination,
                termination_reason: reason,
                iterations,
            },
            true,
        ),
        Signal::Failed { stage, message } => (
            Source::ReasoningLoop,
            EventKind::Error {
                message,
                capability: None,
                stage,
            },
            true,
        ),
        Signal::Custom { kind, body } => return map_custom(&kind, &body, task_id),
    };
    Some(mapped)
}

fn map_custom(kind: &str, body: &Value, task_id: &str) -> Option<(Source, EventKind, bool)> {
    let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_string);
    match kind {
        "tool_progress" | "progress" => {
            let (Some(name), Some(message)) = (text("name"), text("message")) else {
                tracing::debug!(task_id, kind, "progress signal missing name/message; dropped");
                return None;
            };
            Some((
                Source::CapabilityInvoker,
                EventKind::ToolProgress {
                    name,
                    message,
                    fraction: body.get("fraction").and_then(Value::as_f64),
                },
                false,
            ))
        }
        _ => {
            tracing::debug!(task_id, kind, "unmapped signal dropped");
            None
        }
    }
}
