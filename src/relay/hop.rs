use super::subscription::Subscription;
use super::upstream::Upstream;
use crate::error::RelayError;
use crate::events::{Event, Source};
use crate::observability::{Observer, ObserverEvent};
use crate::task::TaskRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Tunables shared by every subscriber of a hop.
#[derive(Debug, Clone)]
pub struct HopSettings {
    /// Name used in logs and synthesized errors (`worker`, `coordinator`, `gateway`).
    pub name: String,
    pub source: Source,
    pub keep_alive: Duration,
    pub subscriber_buffer: usize,
}

/// Subscribe-and-forward primitive, identical at every service boundary.
///
/// Each subscriber gets its own forwarding task and bounded channel fed from
/// the task registry, so a slow or vanished subscriber never holds up the
/// producer or any other subscriber.
pub struct RelayHop {
    settings: HopSettings,
    registry: Arc<TaskRegistry>,
    upstream: Arc<dyn Upstream>,
    observer: Arc<dyn Observer>,
}

impl RelayHop {
    pub fn new(
        settings: HopSettings,
        registry: Arc<TaskRegistry>,
        upstream: Arc<dyn Upstream>,
        observer: Arc<dyn Observer>,
    ) -> Self {
        Self {
            settings,
            registry,
            upstream,
            observer,
        }
    }

    pub fn name(&self) -> &str {
        &self.settings.name
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn upstream(&self) -> &Arc<dyn Upstream> {
        &self.upstream
    }

    /// Replay events after `resume_after` (all events when `None`), then
    /// forward live events until the final one.
    pub async fn subscribe(
        &self,
        task_id: &str,
        resume_after: Option<u64>,
    ) -> Result<Subscription, RelayError> {
        self.upstream.ensure(task_id).await?;
        let head = self
            .registry
            .watch(task_id)
            .ok_or_else(|| RelayError::UnknownTask(task_id.to_string()))?;

        let after = resume_after.unwrap_or(0);
        let (tx, rx) = mpsc::channel(self.settings.subscriber_buffer.max(1));
        let cancel = CancellationToken::new();

        self.observer.record_event(&ObserverEvent::SubscriberAttached {
            hop: self.settings.name.clone(),
            task_id: task_id.to_string(),
            after,
        });
        tokio::spawn(
            Forwarder {
                settings: self.settings.clone(),
                registry: Arc::clone(&self.registry),
                observer: Arc::clone(&self.observer),
                task_id: task_id.to_string(),
                cursor: after,
                delivered: 0,
                tx,
                cancel: cancel.clone(),
            }
            .run(head),
        );

        Ok(Subscription::new(task_id.to_string(), rx, cancel.drop_guard()))
    }
}

/// One subscriber's forwarding loop.
struct Forwarder {
    settings: HopSettings,
    registry: Arc<TaskRegistry>,
    observer: Arc<dyn Observer>,
    task_id: String,
    /// Id of the last event handed to the subscriber.
    cursor: u64,
    delivered: u64,
    tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
}

enum Step {
    Continue,
    Done,
}

impl Forwarder {
    async fn run(mut self, mut head: watch::Receiver<u64>) {
        loop {
            head.borrow_and_update();
            if let Step::Done = self.drain().await {
                break;
            }

            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = self.tx.closed() => break,
                changed = tokio::time::timeout(self.settings.keep_alive, head.changed()) => match changed {
                    // New events; the task may also have been evicted, which
                    // the next drain turns into a synthesized failure.
                    Ok(_) => {}
                    Err(_) => {
                        let keep_alive = Event::keep_alive(self.task_id.as_str(), self.settings.source);
                        if !self.send(keep_alive).await {
                            break;
                        }
                        self.observer.record_event(&ObserverEvent::KeepAlive {
                            hop: self.settings.name.clone(),
                            task_id: self.task_id.clone(),
                        });
                    }
                },
            }
        }

        self.observer.record_event(&ObserverEvent::SubscriberDetached {
            hop: self.settings.name.clone(),
            task_id: self.task_id.clone(),
            delivered: self.delivered,
        });
    }

    /// Forward everything after the cursor.
    async fn drain(&mut self) -> Step {
        let Some(slice) = self.registry.events_after(&self.task_id, self.cursor) else {
            tracing::warn!(
                hop = %self.settings.name,
                task_id = %self.task_id,
                "task left the registry before its final event"
            );
            let failure = Event::synthetic_error(
                self.cursor + 1,
                self.task_id.as_str(),
                self.settings.source,
                "relay",
                format!("{}: task is no longer available", self.settings.name),
            );
            self.send(failure).await;
            return Step::Done;
        };

        for event in slice.events {
            let event_id = event.event_id;
            let is_final = event.is_final;
            if !self.send(event).await {
                return Step::Done;
            }
            self.cursor = event_id;
            self.delivered += 1;
            if is_final {
                return Step::Done;
            }
        }

        // Resumed past the final event: nothing left to deliver.
        if slice.terminal {
            return Step::Done;
        }
        Step::Continue
    }

    /// `false` when the subscriber is gone.
    async fn send(&self, event: Event) -> bool {
        tokio::select! {
            () = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        }
    }
}

#[cfg(test)]
mod tests;
