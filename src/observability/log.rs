use super::traits::{Observer, ObserverEvent};
use tracing::{debug, info, warn};

/// Writes observer events as `tracing` records
pub struct LogObserver;

impl LogObserver {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogObserver {
    fn default() -> Self {
        Self::new()
    }
}

fn millis(duration: std::time::Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Observer for LogObserver {
    fn record_event(&self, event: &ObserverEvent) {
        match event {
            ObserverEvent::TaskSubmitted { task_id, agent } => {
                info!(task_id = %task_id, agent = %agent, "task.submitted");
            }
            ObserverEvent::TaskTerminal {
                task_id,
                state,
                events,
                duration,
            } => {
                info!(
                    task_id = %task_id,
                    state = %state,
                    events = events,
                    duration_ms = millis(*duration),
                    "task.terminal"
                );
            }
            ObserverEvent::CapabilityCall {
                task_id,
                capability,
                duration,
                success,
            } => {
                info!(
                    task_id = %task_id,
                    capability = %capability,
                    duration_ms = millis(*duration),
                    success = success,
                    "capability.call"
                );
            }
            ObserverEvent::SubscriberAttached {
                hop,
                task_id,
                after,
            } => {
                info!(hop = %hop, task_id = %task_id, after = after, "relay.subscriber_attached");
            }
            ObserverEvent::SubscriberDetached {
                hop,
                task_id,
                delivered,
            } => {
                info!(
                    hop = %hop,
                    task_id = %task_id,
                    delivered = delivered,
                    "relay.subscriber_detached"
                );
            }
            ObserverEvent::KeepAlive { hop, task_id } => {
                debug!(hop = %hop, task_id = %task_id, "relay.keep_alive");
            }
            ObserverEvent::UpstreamFailure { task_id, message } => {
                warn!(task_id = %task_id, error = %message, "relay.upstream_failure");
            }
        }
    }

    fn name(&self) -> &str {
        "log"
    }
}
