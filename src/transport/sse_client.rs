use crate::error::TransportError;
use crate::events::{SseBuffer, SseFrame, parse_frame};
use crate::task::{Submission, TaskSnapshot};
use futures_util::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::Deserialize;
use std::pin::Pin;
use std::time::Duration;

/// Header a subscriber uses to resume after its last delivered event.
pub const LAST_EVENT_ID: &str = "Last-Event-ID";

pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame, TransportError>> + Send + 'static>>;

#[derive(Debug, Deserialize)]
struct Accepted {
    task_id: String,
}

/// HTTP client for one hop's task endpoints (`/tasks`, `/tasks/{id}`, `/tasks/{id}/events`).
///
/// Used by relay hops to pull from their upstream and by the timeline client.
#[derive(Debug, Clone)]
pub struct SseClient {
    http: reqwest::Client,
    base_url: String,
}

impl SseClient {
    pub fn new(base_url: &str, connect_timeout: Duration) -> Result<Self, TransportError> {
        let parsed = url::Url::parse(base_url).map_err(|error| TransportError::Connect {
            url: base_url.to_string(),
            message: format!("invalid base url: {error}"),
        })?;
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|error| TransportError::Connect {
                url: base_url.to_string(),
                message: error.to_string(),
            })?;
        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn connect_error(url: &str, error: &reqwest::Error) -> TransportError {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    /// `POST /tasks`; returns the accepted task id.
    pub async fn submit(&self, submission: &Submission) -> Result<String, TransportError> {
        let url = self.endpoint("/tasks");
        let response = self
            .http
            .post(&url)
            .json(submission)
            .send()
            .await
            .map_err(|error| Self::connect_error(&url, &error))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url,
                code: status.as_u16(),
            });
        }
        let accepted: Accepted = response
            .json()
            .await
            .map_err(|error| TransportError::Decode(format!("submit response: {error}")))?;
        Ok(accepted.task_id)
    }

    /// `GET /tasks/{id}`.
    pub async fn status(&self, task_id: &str) -> Result<TaskSnapshot, TransportError> {
        let url = self.endpoint(&format!("/tasks/{task_id}"));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|error| Self::connect_error(&url, &error))?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(TransportError::NotFound(task_id.to_string())),
            status if !status.is_success() => Err(TransportError::Status {
                url,
                code: status.as_u16(),
            }),
            _ => response
                .json()
                .await
                .map_err(|error| TransportError::Decode(format!("status response: {error}"))),
        }
    }

    /// `GET /tasks/{id}/events`, resuming after `after` when it is non-zero.
    ///
    /// The returned stream yields parsed frames (keep-alives included) and
    /// simply ends when the server closes the connection.
    pub async fn open_events(&self, task_id: &str, after: u64) -> Result<FrameStream, TransportError> {
        let url = self.endpoint(&format!("/tasks/{task_id}/events"));
        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "text/event-stream");
        if after > 0 {
            request = request.header(LAST_EVENT_ID, after.to_string());
        }
        let response = request
            .send()
            .await
            .map_err(|error| Self::connect_error(&url, &error))?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(TransportError::NotFound(task_id.to_string())),
            status if !status.is_success() => {
                return Err(TransportError::Status {
                    url,
                    code: status.as_u16(),
                });
            }
            _ => {}
        }

        let mut byte_stream = response.bytes_stream();
        let stream = async_stream::try_stream! {
            let mut sse_buffer = SseBuffer::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = chunk_result.map_err(|error| TransportError::Stream(error.to_string()))?;
                sse_buffer.push_chunk(&chunk);

                while let Some(event_block) = sse_buffer.next_event_block() {
                    let frame = parse_frame(&event_block?);
                    if !frame.is_empty() {
                        yield frame;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}
