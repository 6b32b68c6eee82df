use super::timeline::{Timeline, TimelineHandler};
use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::events::{EventKind, decode_event};
use crate::task::TaskSnapshot;
use crate::transport::{FrameStream, SseClient};
use futures_util::StreamExt;
use futures_util::future::BoxFuture;
use std::time::Duration;

/// How the consumer reaches the outermost hop.
pub trait EventTransport: Send + Sync {
    /// Open the event stream, resuming after `after` (0 = from the start).
    fn open<'a>(
        &'a self,
        task_id: &'a str,
        after: u64,
    ) -> BoxFuture<'a, Result<FrameStream, TransportError>>;

    fn status<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<TaskSnapshot, TransportError>>;
}

impl EventTransport for SseClient {
    fn open<'a>(
        &'a self,
        task_id: &'a str,
        after: u64,
    ) -> BoxFuture<'a, Result<FrameStream, TransportError>> {
        Box::pin(self.open_events(task_id, after))
    }

    fn status<'a>(&'a self, task_id: &'a str) -> BoxFuture<'a, Result<TaskSnapshot, TransportError>> {
        Box::pin(SseClient::status(self, task_id))
    }
}

/// Why one connection ended.
enum Disconnect {
    /// Transport-level loss; may reconnect.
    Retry {
        error: TransportError,
        progressed: bool,
    },
    Fatal(ClientError),
}

/// Reconnecting stream client that rebuilds an ordered task timeline.
///
/// Only transport-level disconnects are retried, with a fixed delay, carrying
/// the last delivered id. A received `error` event is terminal and never
/// triggers a reconnect. There is no fallback transport.
pub struct TimelineConsumer<T: EventTransport> {
    transport: T,
    max_reconnect_attempts: u32,
    reconnect_delay: Duration,
}

impl TimelineConsumer<SseClient> {
    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = SseClient::new(
            &config.base_url,
            Duration::from_secs(config.connect_timeout_secs),
        )?;
        Ok(Self::new(
            client,
            config.max_reconnect_attempts,
            Duration::from_millis(config.reconnect_delay_ms),
        ))
    }
}

impl<T: EventTransport> TimelineConsumer<T> {
    pub fn new(transport: T, max_reconnect_attempts: u32, reconnect_delay: Duration) -> Self {
        Self {
            transport,
            max_reconnect_attempts,
            reconnect_delay,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Follow `task_id` until its final event.
    ///
    /// Returns the full timeline when the task completes; any fatal outcome is
    /// reported to `handler.on_error` and returned as the error.
    pub async fn connect(
        &self,
        task_id: &str,
        handler: &mut impl TimelineHandler,
    ) -> Result<Timeline, ClientError> {
        self.connect_after(task_id, 0, handler).await
    }

    /// Like [`connect`](Self::connect), treating events up to `after` as already seen.
    ///
    /// When the task had already finished at or before `after`, the returned
    /// timeline is empty and the outcome comes from the task's status.
    pub async fn connect_after(
        &self,
        task_id: &str,
        after: u64,
        handler: &mut impl TimelineHandler,
    ) -> Result<Timeline, ClientError> {
        let mut timeline = Timeline::new(task_id);
        let mut cursor = after;
        let mut delay = self.reconnect_delay;
        let mut attempts = 0_u32;

        loop {
            let outcome = self
                .stream_once(task_id, &mut cursor, &mut timeline, &mut delay, handler)
                .await;
            let error = match outcome {
                Ok(()) => return Ok(timeline),
                Err(Disconnect::Fatal(error)) => error,
                Err(Disconnect::Retry { error, progressed }) => {
                    if progressed {
                        attempts = 0;
                    }
                    if attempts < self.max_reconnect_attempts {
                        attempts += 1;
                        tracing::warn!(
                            task_id,
                            attempt = attempts,
                            max = self.max_reconnect_attempts,
                            after = cursor,
                            error = %error,
                            "stream lost; reconnecting"
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }
                    tracing::error!(task_id, attempts, error = %error, "reconnect attempts exhausted");
                    ClientError::ReconnectExhausted { attempts }
                }
            };
            handler.on_error(&error);
            return Err(error);
        }
    }

    async fn stream_once(
        &self,
        task_id: &str,
        cursor: &mut u64,
        timeline: &mut Timeline,
        delay: &mut Duration,
        handler: &mut impl TimelineHandler,
    ) -> Result<(), Disconnect> {
        let mut frames = self
            .transport
            .open(task_id, *cursor)
            .await
            .map_err(|error| classify(error, false))?;
        let mut progressed = false;

        while let Some(frame) = frames.next().await {
            let frame = frame.map_err(|error| classify(error, progressed))?;
            if let Some(retry) = frame.retry {
                *delay = Duration::from_millis(retry);
            }
            let event = decode_event(&frame).map_err(|error| Disconnect::Fatal(error.into()))?;
            if event.is_keep_alive() {
                continue;
            }

            let expected = *cursor + 1;
            if event.event_id < expected {
                tracing::debug!(task_id, event_id = event.event_id, "duplicate event skipped");
                continue;
            }
            if event.event_id > expected {
                return Err(Disconnect::Fatal(ClientError::Gap {
                    expected,
                    got: event.event_id,
                }));
            }

            progressed = true;
            *cursor = event.event_id;
            handler.on_event(&event);
            let is_final = event.is_final;
            let failure = match &event.kind {
                EventKind::Error {
                    message,
                    capability,
                    ..
                } if is_final => Some(ClientError::TaskFailed {
                    message: message.clone(),
                    capability: capability.clone(),
                }),
                _ => None,
            };
            timeline.push(event);

            if is_final {
                return match failure {
                    Some(error) => Err(Disconnect::Fatal(error)),
                    None => {
                        if let Some(terminal) = timeline.terminal() {
                            handler.on_complete(terminal);
                        }
                        Ok(())
                    }
                };
            }
        }

        if !progressed
            && *cursor > 0
            && let Some(outcome) = self.finished_at_or_before(task_id, *cursor, handler).await
        {
            return outcome;
        }

        Err(Disconnect::Retry {
            error: TransportError::Stream("stream ended before the final event".to_string()),
            progressed,
        })
    }

    /// An empty stream after a non-zero cursor may mean the task had already
    /// ended at or before that cursor. One status lookup settles it; `None`
    /// leaves the disconnect to the normal retry path.
    async fn finished_at_or_before(
        &self,
        task_id: &str,
        cursor: u64,
        handler: &mut impl TimelineHandler,
    ) -> Option<Result<(), Disconnect>> {
        let snapshot = self.transport.status(task_id).await.ok()?;
        let terminal = snapshot
            .event_log
            .last()
            .filter(|event| event.is_final && event.event_id <= cursor)?;
        tracing::info!(
            task_id,
            after = cursor,
            final_event_id = terminal.event_id,
            "resume cursor is at or past the final event"
        );
        Some(match &terminal.kind {
            EventKind::Error {
                message,
                capability,
                ..
            } => Err(Disconnect::Fatal(ClientError::TaskFailed {
                message: message.clone(),
                capability: capability.clone(),
            })),
            _ => {
                handler.on_complete(terminal);
                Ok(())
            }
        })
    }

    /// Post-hoc state and full log of a task.
    pub async fn fetch_status(&self, task_id: &str) -> Result<TaskSnapshot, ClientError> {
        self.transport
            .status(task_id)
            .await
            .map_err(|error| match error {
                TransportError::NotFound(id) => ClientError::NotFound(id),
                other => ClientError::Transport(other),
            })
    }
}

fn classify(error: TransportError, progressed: bool) -> Disconnect {
    match error {
        TransportError::NotFound(id) => Disconnect::Fatal(ClientError::NotFound(id)),
        error if error.is_retryable() => Disconnect::Retry { error, progressed },
        error => Disconnect::Fatal(error.into()),
    }
}
