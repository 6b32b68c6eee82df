use crate::events::Event;
use futures_util::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::DropGuard;

/// Downstream end of one subscriber's forwarding loop.
///
/// Dropping it cancels that subscriber's forwarder and nothing else: the task
/// keeps running and other subscribers are unaffected.
pub struct Subscription {
    task_id: String,
    rx: mpsc::Receiver<Event>,
    _cancel: DropGuard,
}

impl Subscription {
    pub(crate) fn new(task_id: String, rx: mpsc::Receiver<Event>, cancel: DropGuard) -> Self {
        Self {
            task_id,
            rx,
            _cancel: cancel,
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Next event, or `None` once the stream has closed.
    pub async fn next_event(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

impl Stream for Subscription {
    type Item = Event;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
