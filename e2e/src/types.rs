//! Shared types for the e2e test framework

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A mock response the upstream will serve for the next request to /v1/messages
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl MockResponse {
    /// A buffered Messages API response
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "application/json".to_string(),
        }
    }

    /// A raw event stream body
    pub fn event_stream(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            content_type: "text/event-stream".to_string(),
        }
    }

    pub fn error(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: "application/json".to_string(),
        }
    }
}

/// Shared state for the mock upstream
#[derive(Debug, Default)]
pub struct UpstreamState {
    /// Tests push responses, the upstream pops and serves them
    pub response_queue: VecDeque<MockResponse>,
    /// All requests received by the upstream (for inspection)
    pub received_requests: Vec<ReceivedRequest>,
}

/// A request received by the mock upstream
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub path: String,
    pub api_key: Option<String>,
    pub api_version: Option<String>,
    pub body: serde_json::Value,
}

pub type SharedUpstreamState = Arc<Mutex<UpstreamState>>;

/// A relay response read to completion
#[derive(Debug)]
pub struct RelayResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    pub body: String,
}

impl RelayResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            anyhow::anyhow!(
                "Relay response is not valid JSON: {}: {}",
                e,
                &self.body[..self.body.len().min(500)]
            )
        })
    }

    /// `error.message` of a relay-generated error body
    pub fn error_message(&self) -> Option<String> {
        let json = self.json().ok()?;
        json.pointer("/error/message")?.as_str().map(str::to_string)
    }
}

/// A parsed SSE event from the relay
#[derive(Debug, Clone)]
pub struct SseEvent {
    #[allow(dead_code)]
    pub event: Option<String>,
    pub data: String,
}

impl SseEvent {
    pub fn parse_json(&self) -> anyhow::Result<serde_json::Value> {
        serde_json::from_str(&self.data).map_err(|e| anyhow::anyhow!("SSE JSON parse error: {}: {}", e, self.data))
    }
}

/// Result of a streaming relay request
#[derive(Debug)]
pub struct StreamingResponse {
    pub raw: String,
    pub events: Vec<SseEvent>,
}

impl StreamingResponse {
    /// `type` of every data event, in order
    pub fn event_types(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| e.parse_json().ok())
            .filter_map(|json| json.get("type").and_then(|t| t.as_str()).map(str::to_string))
            .collect()
    }

    /// Concatenate every text delta
    pub fn accumulated_text(&self) -> String {
        let mut result = String::new();
        for event in &self.events {
            if let Ok(json) = event.parse_json() {
                if json.get("type").and_then(|t| t.as_str()) != Some("content_block_delta") {
                    continue;
                }
                if json.pointer("/delta/type").and_then(|t| t.as_str()) != Some("text_delta") {
                    continue;
                }
                if let Some(text) = json.pointer("/delta/text").and_then(|t| t.as_str()) {
                    result.push_str(text);
                }
            }
        }
        result
    }
}

/// How a single case ended
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(&'static str),
}

/// Result of a single test case
#[derive(Debug)]
pub struct TestResult {
    #[allow(dead_code)]
    pub name: String,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

impl TestResult {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed(_))
    }
}
