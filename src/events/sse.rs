use super::envelope::Event;
use crate::error::TransportError;

/// Render one event as a text/event-stream frame.
///
/// Keep-alive frames omit the `id:` line so they never move a client's
/// last-event-id cursor.
pub fn encode_frame(event: &Event, retry_ms: u64) -> String {
    let mut frame = String::with_capacity(256);
    if !event.is_keep_alive() {
        frame.push_str("id: ");
        frame.push_str(&event.event_id.to_string());
        frame.push('\n');
    }
    let event_type: &'static str = event.event_type().into();
    frame.push_str("event: ");
    frame.push_str(event_type);
    frame.push('\n');
    frame.push_str("retry: ");
    frame.push_str(&retry_ms.to_string());
    frame.push('\n');
    for line in event.to_json().lines() {
        frame.push_str("data: ");
        frame.push_str(line);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

/// Byte-level frame accumulator.
///
/// Chunks may split a multi-byte character, so text is only decoded once a
/// whole block (terminated by a blank line) is buffered.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn push_chunk(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.windows(2).any(|pair| pair == b"\r\n") {
            let mut normalized = Vec::with_capacity(self.buffer.len());
            let mut bytes = self.buffer.iter().copied().peekable();
            while let Some(byte) = bytes.next() {
                if byte == b'\r' && bytes.peek() == Some(&b'\n') {
                    continue;
                }
                normalized.push(byte);
            }
            self.buffer = normalized;
        }
    }

    /// Next complete block, or `None` while only a partial block is buffered.
    pub fn next_event_block(&mut self) -> Option<Result<String, TransportError>> {
        let boundary = self.buffer.windows(2).position(|pair| pair == b"\n\n")?;
        let remaining = self.buffer.split_off(boundary + 2);
        let event_block = std::mem::replace(&mut self.buffer, remaining);
        Some(
            String::from_utf8(event_block)
                .map_err(|error| TransportError::Decode(format!("frame is not utf-8: {error}"))),
        )
    }

    pub fn has_partial(&self) -> bool {
        self.buffer.iter().any(|byte| !byte.is_ascii_whitespace())
    }
}

/// Fields of one parsed frame.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub id: Option<String>,
    pub event: Option<String>,
    pub retry: Option<u64>,
    pub data: String,
}

impl SseFrame {
    /// Comment-only blocks (`: ping`) carry nothing.
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.event.is_none() && self.data.is_empty()
    }
}

pub fn parse_frame(event_block: &str) -> SseFrame {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in event_block.lines() {
        if line.starts_with(':') {
            continue;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "id" => frame.id = Some(value.to_string()),
            "event" => frame.event = Some(value.to_string()),
            "retry" => frame.retry = value.trim().parse().ok(),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    frame.data = data_lines.join("\n");
    frame
}

/// Decode the JSON envelope of a frame, cross-checking the `id:` line.
pub fn decode_event(frame: &SseFrame) -> Result<Event, TransportError> {
    let event: Event = serde_json::from_str(&frame.data)
        .map_err(|error| TransportError::Decode(format!("envelope: {error}")))?;
    if let Some(id) = frame.id.as_deref()
        && id.parse::<u64>().ok() != Some(event.event_id)
    {
        return Err(TransportError::Decode(format!(
            "frame id {id} does not match envelope id {}",
            event.event_id
        )));
    }
    Ok(event)
}
