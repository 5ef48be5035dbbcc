//! Line-oriented event-stream framing.
//!
//! The pipeline backend emits one `data:` line per event, optionally preceded by
//! an `event:` line naming it. Frames are yielded as soon as their data line is
//! terminated; nothing waits for the blank separator line.

use tracing::{debug, trace};

/// Label used for data lines that were not preceded by an `event:` line.
pub const DEFAULT_EVENT: &str = "message";

/// Heartbeat payload. Never surfaced as a frame.
pub const KEEP_ALIVE: &str = "keep-alive";

/// One `(event, payload)` unit decoded from the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub event: String,
    pub data: String,
}

impl Frame {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }
}

/// Incremental decoder fed with raw network chunks.
///
/// Bytes are buffered until a `\n` arrives, so chunk boundaries that fall inside a
/// line (or inside a multi-byte character) never change the decoded output.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    current_event: String,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self {
            buf: Vec::new(),
            current_event: DEFAULT_EVENT.to_string(),
        }
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every frame completed by it, in arrival order.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.buf[start..].iter().position(|b| *b == b'\n') {
            let end = start + offset;
            let line = String::from_utf8_lossy(&self.buf[start..end]).into_owned();
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
            start = end + 1;
        }
        self.buf.drain(..start);
        frames
    }

    /// Number of bytes held back waiting for a line terminator.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Ends the stream and returns the unterminated trailing text, if any.
    ///
    /// That text never produced a frame.
    pub fn finish(self) -> Option<String> {
        if self.buf.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&self.buf).into_owned())
    }

    fn process_line(&mut self, raw_line: &str) -> Option<Frame> {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if let Some(rest) = line.strip_prefix("event:") {
            let label = rest.trim();
            self.current_event = if label.is_empty() {
                DEFAULT_EVENT.to_string()
            } else {
                label.to_string()
            };
            return None;
        }
        let rest = line.strip_prefix("data:")?;
        let payload = rest.strip_prefix(' ').unwrap_or(rest);
        // A heartbeat yields no frame, so a pending label carries over to the next data line.
        if payload.trim() == KEEP_ALIVE {
            trace!("keep-alive heartbeat");
            return None;
        }
        let event = std::mem::replace(&mut self.current_event, DEFAULT_EVENT.to_string());
        debug!(event = %event, bytes = payload.len(), "sse frame");
        Some(Frame {
            event,
            data: payload.to_string(),
        })
    }
}
