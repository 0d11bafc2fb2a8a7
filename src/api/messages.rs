//! Messages API type definitions

use serde::{Deserialize, Serialize};

/// Chat request sent by the client to the relay
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDescriptor>>,
    /// Omitted from the wire when false
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl ChatRequest {
    /// Single-turn user prompt
    pub fn user(model: impl Into<String>, max_tokens: u32, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens,
            messages: vec![Message::user(prompt)],
            system: None,
            tools: None,
            stream: false,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn with_tool(mut self, tool: ToolDescriptor) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Server-side tool descriptor (e.g. web search)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ToolDescriptor {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub name: String,
}

impl ToolDescriptor {
    pub fn web_search() -> Self {
        Self {
            tool_type: "web_search_20250305".to_string(),
            name: "web_search".to_string(),
        }
    }
}

/// Buffered chat response
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<serde_json::Value>,
}

impl ChatResponse {
    /// Text blocks in order, skipping blocks without text
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|b| b.text.as_deref())
    }

    /// True when the body carries a non-null `error` field
    pub fn has_error(&self) -> bool {
        self.error.as_ref().is_some_and(|e| !e.is_null())
    }
}

/// Content block; only `text` matters here, other block kinds
/// (tool use, search results) carry no text and are skipped.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ContentBlock {
    #[serde(rename = "type", default)]
    pub block_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Upstream stream event, keyed on `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    MessageStart,
    ContentBlockStart,
    ContentBlockDelta { delta: Delta },
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Ping,
    Error {
        #[serde(default)]
        error: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl StreamEvent {
    /// Payload text of a `content_block_delta` / `text_delta` event
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::ContentBlockDelta { delta } if delta.delta_type == "text_delta" => {
                delta.text.as_deref()
            }
            _ => None,
        }
    }
}

/// Streaming delta
#[derive(Debug, Clone, Deserialize)]
pub struct Delta {
    #[serde(rename = "type")]
    pub delta_type: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// `{"error":{"message":...}}` body produced by the relay
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: ErrorMessage {
                message: message.into(),
            },
        }
    }
}
