//! HTTP transport between hops and to the timeline client.

pub mod sse_client;

pub use sse_client::{FrameStream, LAST_EVENT_ID, SseClient};
