use crate::error::ClientError;
use crate::events::{Event, EventKind};
use serde::Serialize;

/// Ordered, de-duplicated events of one task as seen by the client.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Timeline {
    pub task_id: String,
    pub events: Vec<Event>,
}

impl Timeline {
    pub fn new(task_id: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            events: Vec::new(),
        }
    }

    /// Id to resume after; 0 before anything was delivered.
    pub fn last_event_id(&self) -> u64 {
        self.events.last().map_or(0, |event| event.event_id)
    }

    pub fn terminal(&self) -> Option<&Event> {
        self.events.last().filter(|event| event.is_final)
    }

    pub fn is_complete(&self) -> bool {
        self.terminal().is_some_and(|event| !event.is_error())
    }

    pub(crate) fn push(&mut self, event: Event) {
        self.events.push(event);
    }
}

/// Callbacks invoked while a timeline is being reconstructed.
pub trait TimelineHandler {
    /// Every substantive event, in order, exactly once.
    fn on_event(&mut self, event: &Event);

    /// The task finished with `analysis_complete`.
    fn on_complete(&mut self, _event: &Event) {}

    /// Fatal outcome: task failure, gap, missing task or exhausted reconnects.
    fn on_error(&mut self, _error: &ClientError) {}
}

/// Handler that ignores everything; the returned [`Timeline`] has it all.
#[derive(Debug, Default)]
pub struct NullHandler;

impl TimelineHandler for NullHandler {
    fn on_event(&mut self, _event: &Event) {}
}

/// Prints one line per event, for the CLI.
#[derive(Debug, Default)]
pub struct PrintHandler;

impl TimelineHandler for PrintHandler {
    fn on_event(&mut self, event: &Event) {
        println!("{}", describe(event));
    }

    fn on_complete(&mut self, _event: &Event) {
        println!("task complete");
    }

    fn on_error(&mut self, error: &ClientError) {
        eprintln!("error: {error}");
    }
}

/// One-line human rendering of an event.
pub fn describe(event: &Event) -> String {
    let detail = match &event.kind {
        EventKind::AnalysisStarted {
            agent,
            max_iterations,
        } => format!("{agent} (max {max_iterations} iterations)"),
        EventKind::ToolStarted { name } => name.clone(),
        EventKind::ToolProgress {
            name,
            message,
            fraction,
        } => match fraction {
            Some(fraction) => format!("{name}: {message} ({:.0}%)", fraction * 100.0),
            None => format!("{name}: {message}"),
        },
        EventKind::ToolCompleted {
            name,
            summary,
            duration_ms,
        } => format!("{name}: {summary} in {duration_ms}ms"),
        EventKind::AgentThinking { agent, iteration } => format!("{agent} iteration {iteration}"),
        EventKind::Routing { from, to, reason } => format!("{from} -> {to}: {reason}"),
        EventKind::AgentHandoff { from, to } => format!("{from} -> {to}"),
        EventKind::AnalysisComplete {
            determination,
            termination_reason,
            iterations,
        } => format!(
            "{} ({termination_reason}, {iterations} iterations) {}",
            determination.determination, determination.summary
        ),
        EventKind::Error {
            message,
            capability,
            stage,
        } => match capability {
            Some(capability) => format!("{stage}/{capability}: {message}"),
            None => format!("{stage}: {message}"),
        },
        EventKind::KeepAlive {} => String::new(),
    };
    format!("[{:>3}] {:<18} {detail}", event.event_id, event.event_type())
}
