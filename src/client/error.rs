//! Client-side failure reasons.
//!
//! The public client operations report absence rather than errors; these
//! variants exist so the cause can be logged and so `stream` can tell a
//! transport failure (worth a buffered retry) from a refusal.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("relay returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("response body is not a chat response: {0}")]
    Decode(serde_json::Error),

    #[error("upstream reported an error: {0}")]
    Upstream(serde_json::Value),

    #[error("response carried no text")]
    Empty,

    #[error("model output is not valid JSON: {0}")]
    MalformedResult(serde_json::Error),
}

impl ClientError {
    /// True when the relay could not be reached or the body stopped mid-read
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
