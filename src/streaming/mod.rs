//! Server-sent-event framing.
//!
//! Byte chunks from the wire rarely align with line or event boundaries.
//! [`SseLineBuffer`] reassembles complete lines across chunks and
//! [`SseFrame`] interprets a frame's `field: value` lines into the event
//! type and data payload.

/// Buffer for accumulating incomplete SSE lines across chunk boundaries.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    incomplete: String,
}

impl SseLineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return the complete lines they finish.
    ///
    /// Lines are returned without their trailing newline; empty lines (the
    /// SSE event separator) are dropped. Incomplete trailing data stays
    /// buffered for the next call. Invalid UTF-8 is replaced lossily.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<String> {
        self.incomplete.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(pos) = self.incomplete.find('\n') {
            let rest = self.incomplete.split_off(pos + 1);
            let mut line = std::mem::replace(&mut self.incomplete, rest);
            line.truncate(pos);
            if !line.is_empty() {
                lines.push(line);
            }
        }
        lines
    }

    /// True if a truncated line is still buffered.
    pub fn has_incomplete(&self) -> bool {
        !self.incomplete.is_empty()
    }

    /// Remaining buffered data, for end-of-stream truncation checks.
    pub fn remaining(&self) -> &str {
        &self.incomplete
    }
}

/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// Value of the `event:` field, if present.
    pub event_type: Option<String>,
    /// Joined value of the `data:` fields.
    pub data: String,
}

impl SseFrame {
    /// Parse one frame from its raw text (one or more `field: value` lines).
    ///
    /// Multiple `data:` lines join with `\n` per the SSE spec; comment lines
    /// and unknown fields are ignored.
    pub fn parse(raw: &str) -> Self {
        let mut event_type = None;
        let mut data_lines: Vec<&str> = Vec::new();

        for line in raw.lines() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "event" => event_type = Some(value.to_string()),
                "data" => data_lines.push(value),
                _ => {}
            }
        }

        Self {
            event_type,
            data: data_lines.join("\n"),
        }
    }
}
