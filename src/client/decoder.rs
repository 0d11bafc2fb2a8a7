//! Line-oriented decoding of the upstream event stream

use crate::api::StreamEvent;

/// Bytes received but not yet terminated by a newline.
///
/// Splitting happens on raw bytes, so a multi-byte character cut across two
/// reads is only decoded once its line is complete.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line it completes, in order.
    /// The trailing fragment stays buffered for the next read.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let rest = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, rest);

        complete[..complete.len() - 1]
            .split(|&b| b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Bytes of the unterminated trailing line
    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// Outcome of one complete line
#[derive(Debug)]
pub enum DataLine {
    /// Not a `data: ` line (event names, comments, blank separators)
    Ignored,
    /// The `[DONE]` sentinel
    Done,
    Event(StreamEvent),
    Malformed(serde_json::Error),
}

pub fn parse_line(line: &str) -> DataLine {
    let Some(payload) = line.strip_prefix("data: ") else {
        return DataLine::Ignored;
    };

    let payload = payload.trim();
    if payload == "[DONE]" {
        return DataLine::Done;
    }

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => DataLine::Event(event),
        Err(e) => DataLine::Malformed(e),
    }
}
