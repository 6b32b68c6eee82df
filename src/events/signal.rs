use super::envelope::{Determination, TerminationReason};
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;

/// Internal lifecycle signal emitted by the controller and capability invoker.
///
/// Signals never leave the worker process; the mapper turns them into
/// [`Event`](super::Event)s with task-scoped ids.
#[derive(Debug, Clone)]
pub enum Signal {
    AnalysisStarted {
        agent: String,
        max_iterations: u32,
    },
    Thinking {
        agent: String,
        iteration: u32,
    },
    Routed {
        from: String,
        to: String,
        reason: String,
    },
    HandedOff {
        from: String,
        to: String,
    },
    CapabilityStarted {
        name: String,
    },
    CapabilityProgress {
        name: String,
        message: String,
        fraction: Option<f64>,
    },
    CapabilityCompleted {
        name: String,
        summary: String,
        duration: Duration,
    },
    CapabilityFailed {
        name: String,
        message: String,
        duration: Duration,
    },
    Completed {
        determination: Determination,
        reason: TerminationReason,
        iterations: u32,
    },
    Failed {
        stage: String,
        message: String,
    },
    /// Loosely-typed signal from plug-in code; only known kinds are mapped.
    Custom {
        kind: String,
        body: Value,
    },
}

impl Signal {
    pub fn kind_name(&self) -> &str {
        match self {
            Self::AnalysisStarted { .. } => "analysis_started",
            Self::Thinking { .. } => "thinking",
            Self::Routed { .. } => "routed",
            Self::HandedOff { .. } => "handed_off",
            Self::CapabilityStarted { .. } => "capability_started",
            Self::CapabilityProgress { .. } => "capability_progress",
            Self::CapabilityCompleted { .. } => "capability_completed",
            Self::CapabilityFailed { .. } => "capability_failed",
            Self::Completed { .. } => "completed",
            Self::Failed { .. } => "failed",
            Self::Custom { kind, .. } => kind,
        }
    }
}

/// Sending half of a task's signal channel.
#[derive(Clone)]
pub struct SignalSender {
    tx: mpsc::Sender<Signal>,
}

impl SignalSender {
    pub fn new(tx: mpsc::Sender<Signal>) -> Self {
        Self { tx }
    }

    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Signal>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }

    pub async fn emit(&self, signal: Signal) {
        if let Err(error) = self.tx.send(signal).await {
            tracing::warn!(
                signal = error.0.kind_name(),
                "signal dropped: mapper is no longer running"
            );
        }
    }
}
