//! Incremental text accumulation over a byte stream

use futures::{Stream, StreamExt};

use super::decoder::{parse_line, DataLine, LineBuffer};
use crate::api::StreamEvent;

/// Append-only text for one streaming call
#[derive(Debug, Default)]
pub struct Accumulator {
    text: String,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the full text so far
    pub fn push(&mut self, delta: &str) -> &str {
        self.text.push_str(delta);
        &self.text
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Length in characters, not bytes
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Final text, or `None` if nothing arrived
    pub fn into_text(self) -> Option<String> {
        if self.text.is_empty() {
            None
        } else {
            Some(self.text)
        }
    }
}

/// Drain `stream`, calling `on_increment` with the whole accumulated text
/// after every text delta.
///
/// Lines that are not events, fail to parse, or carry no text are skipped.
/// The first transport error ends the loop and is returned.
pub async fn accumulate<S, B, E, F>(stream: S, on_increment: &mut F) -> Result<Accumulator, E>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    F: FnMut(&str),
{
    let mut stream = std::pin::pin!(stream);
    let mut lines = LineBuffer::new();
    let mut accumulator = Accumulator::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;

        for line in lines.push(chunk.as_ref()) {
            match parse_line(&line) {
                DataLine::Event(event) => {
                    if let Some(text) = event.text_delta() {
                        on_increment(accumulator.push(text));
                    } else if let StreamEvent::Error { error } = &event {
                        tracing::warn!(error = %error, "Upstream reported an error mid-stream");
                    }
                }
                DataLine::Malformed(e) => {
                    tracing::trace!(error = %e, line = %line, "Skipping malformed stream event");
                }
                DataLine::Done | DataLine::Ignored => {}
            }
        }
    }

    if !lines.pending().is_empty() {
        tracing::trace!(
            bytes = lines.pending().len(),
            "Stream closed with an unterminated line; discarding it"
        );
    }

    Ok(accumulator)
}
