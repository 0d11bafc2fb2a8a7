//! Relay-side request shaping

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::UpstreamConfig;

/// Body accepted by the relay. Every field stays raw JSON: values of the
/// wrong type are forwarded as given and rejected by upstream, not here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayRequest {
    #[serde(default)]
    pub model: Option<Value>,
    #[serde(default)]
    pub max_tokens: Option<Value>,
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub system: Option<Value>,
    #[serde(default)]
    pub tools: Option<Value>,
    #[serde(default)]
    pub stream: Option<Value>,
}

/// Normalized body sent upstream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpstreamRequest {
    pub model: Value,
    pub max_tokens: Value,
    pub messages: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

impl RelayRequest {
    /// True only for a literal `"stream": true`
    pub fn wants_stream(&self) -> bool {
        matches!(self.stream, Some(Value::Bool(true)))
    }

    /// Apply defaults and drop empty optional fields.
    ///
    /// Upstream treats the presence of `system`, `tools` and `stream` as
    /// significant, so empty or false values are never sent.
    pub fn into_upstream(self, defaults: &UpstreamConfig) -> UpstreamRequest {
        let stream = self.wants_stream();
        UpstreamRequest {
            model: self
                .model
                .filter(is_truthy)
                .unwrap_or_else(|| Value::from(defaults.default_model.as_str())),
            max_tokens: self
                .max_tokens
                .filter(is_truthy)
                .unwrap_or_else(|| Value::from(defaults.default_max_tokens)),
            messages: self
                .messages
                .filter(|m| !m.is_null())
                .unwrap_or_else(|| Value::Array(Vec::new())),
            system: self.system.filter(is_truthy),
            tools: self.tools.filter(is_truthy),
            stream,
        }
    }
}

/// Null, false, 0 and "" count as absent
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
