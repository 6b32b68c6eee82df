use std::time::Duration;

/// Events the observer can record
#[derive(Debug, Clone)]
pub enum ObserverEvent {
    TaskSubmitted {
        task_id: String,
        agent: String,
    },
    TaskTerminal {
        task_id: String,
        state: String,
        events: u64,
        duration: Duration,
    },
    CapabilityCall {
        task_id: String,
        capability: String,
        duration: Duration,
        success: bool,
    },
    SubscriberAttached {
        hop: String,
        task_id: String,
        after: u64,
    },
    SubscriberDetached {
        hop: String,
        task_id: String,
        delivered: u64,
    },
    KeepAlive {
        hop: String,
        task_id: String,
    },
    UpstreamFailure {
        task_id: String,
        message: String,
    },
}

/// Sink for pipeline lifecycle events
pub trait Observer: Send + Sync {
    /// Record a discrete event
    fn record_event(&self, event: &ObserverEvent);

    /// Flush any buffered data (no-op for most backends)
    fn flush(&self) {}

    /// Human-readable name of this observer
    fn name(&self) -> &str;
}
