//! Canonical event envelope, internal signals, and the SSE wire codec.

pub mod envelope;
pub mod mapper;
pub mod signal;
pub mod sse;

pub use envelope::{
    Determination, ENVELOPE_VERSION, Event, EventKind, EventType, Source, TerminationReason,
};
pub use mapper::EventMapper;
pub use signal::{Signal, SignalSender};
pub use sse::{SseBuffer, SseFrame, decode_event, encode_frame, parse_frame};
