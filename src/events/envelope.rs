use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{Display, EnumString, IntoStaticStr};

/// Envelope schema version written on every event.
pub const ENVELOPE_VERSION: u32 = 1;

/// Closed set of event types carried on the wire.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    AnalysisStarted,
    ToolStarted,
    ToolProgress,
    ToolCompleted,
    AgentThinking,
    Routing,
    AgentHandoff,
    AnalysisComplete,
    Error,
    KeepAlive,
}

/// Component that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Source {
    CapabilityInvoker,
    ReasoningLoop,
    Worker,
    Coordinator,
    Gateway,
}

/// Why the reasoning loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum TerminationReason {
    ToolCallsExhausted,
    ExplicitAnswer,
    IterationLimitReached,
    Error,
}

/// Final verdict produced by the responding phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Determination {
    pub determination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub summary: String,
}

/// Typed payload of an event; the variant decides the wire `event_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "payload", rename_all = "snake_case")]
pub enum EventKind {
    AnalysisStarted {
        agent: String,
        max_iterations: u32,
    },
    ToolStarted {
        name: String,
    },
    ToolProgress {
        name: String,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fraction: Option<f64>,
    },
    ToolCompleted {
        name: String,
        summary: String,
        duration_ms: u64,
    },
    AgentThinking {
        agent: String,
        iteration: u32,
    },
    Routing {
        from: String,
        to: String,
        reason: String,
    },
    AgentHandoff {
        from: String,
        to: String,
    },
    AnalysisComplete {
        determination: Determination,
        termination_reason: TerminationReason,
        iterations: u32,
    },
    Error {
        message: String,
        /// Capability that failed, when the failure came from one.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        capability: Option<String>,
        /// Pipeline stage that failed (`capability`, `reasoning_loop`, `relay`, ...).
        stage: String,
    },
    KeepAlive {},
}

impl EventKind {
    pub fn event_type(&self) -> EventType {
        match self {
            Self::AnalysisStarted { .. } => EventType::AnalysisStarted,
            Self::ToolStarted { .. } => EventType::ToolStarted,
            Self::ToolProgress { .. } => EventType::ToolProgress,
            Self::ToolCompleted { .. } => EventType::ToolCompleted,
            Self::AgentThinking { .. } => EventType::AgentThinking,
            Self::Routing { .. } => EventType::Routing,
            Self::AgentHandoff { .. } => EventType::AgentHandoff,
            Self::AnalysisComplete { .. } => EventType::AnalysisComplete,
            Self::Error { .. } => EventType::Error,
            Self::KeepAlive {} => EventType::KeepAlive,
        }
    }
}

/// The canonical event envelope relayed through every hop.
///
/// `event_id` starts at 1 and increases by one per task. Keep-alive frames are
/// not part of the task log and carry id 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireEnvelope", try_from = "WireEnvelope")]
pub struct Event {
    pub event_id: u64,
    pub task_id: String,
    pub timestamp: DateTime<Utc>,
    pub source: Source,
    pub kind: EventKind,
    pub is_final: bool,
}

impl Event {
    pub fn new(
        event_id: u64,
        task_id: impl Into<String>,
        source: Source,
        kind: EventKind,
        is_final: bool,
    ) -> Self {
        Self {
            event_id,
            task_id: task_id.into(),
            timestamp: Utc::now(),
            source,
            kind,
            is_final,
        }
    }

    pub fn keep_alive(task_id: impl Into<String>, source: Source) -> Self {
        Self::new(0, task_id, source, EventKind::KeepAlive {}, false)
    }

    /// Terminal `error` event used when a stage fails without producing one.
    pub fn synthetic_error(
        event_id: u64,
        task_id: impl Into<String>,
        source: Source,
        stage: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            event_id,
            task_id,
            source,
            EventKind::Error {
                message: message.into(),
                capability: None,
                stage: stage.to_string(),
            },
            true,
        )
    }

    pub fn event_type(&self) -> EventType {
        self.kind.event_type()
    }

    pub fn is_keep_alive(&self) -> bool {
        matches!(self.kind, EventKind::KeepAlive {})
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, EventKind::Error { .. })
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"event_id":{},"task_id":"{}","event_type":"error","payload":{{"message":"serialization failed","stage":"envelope"}},"final":true}}"#,
                self.event_id, self.task_id
            )
        })
    }
}

/// Flat JSON shape: `{event_id, task_id, timestamp, source, event_type, payload, final}`.
#[derive(Serialize, Deserialize)]
struct WireEnvelope {
    #[serde(default = "default_version")]
    version: u32,
    event_id: u64,
    task_id: String,
    timestamp: DateTime<Utc>,
    source: Source,
    event_type: EventType,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "final", default)]
    is_final: bool,
}

fn default_version() -> u32 {
    ENVELOPE_VERSION
}

impl From<Event> for WireEnvelope {
    fn from(event: Event) -> Self {
        let event_type = event.kind.event_type();
        let payload = serde_json::to_value(&event.kind)
            .ok()
            .and_then(|mut tagged| tagged.get_mut("payload").map(Value::take))
            .unwrap_or(Value::Object(serde_json::Map::new()));
        Self {
            version: ENVELOPE_VERSION,
            event_id: event.event_id,
            task_id: event.task_id,
            timestamp: event.timestamp,
            source: event.source,
            event_type,
            payload,
            is_final: event.is_final,
        }
    }
}

impl TryFrom<WireEnvelope> for Event {
    type Error = String;

    fn try_from(wire: WireEnvelope) -> Result<Self, Self::Error> {
        let payload = if wire.payload.is_null() {
            Value::Object(serde_json::Map::new())
        } else {
            wire.payload
        };
        let kind: EventKind = serde_json::from_value(serde_json::json!({
            "event_type": wire.event_type,
            "payload": payload,
        }))
        .map_err(|error| format!("invalid {} payload: {error}", wire.event_type))?;
        Ok(Self {
            event_id: wire.event_id,
            task_id: wire.task_id,
            timestamp: wire.timestamp,
            source: wire.source,
            kind,
            is_final: wire.is_final,
        })
    }
}
