//! Request logging formatter

use serde_json::Value;

use crate::api::UpstreamRequest;

/// One-line summary of a relayed request.
///
/// Only shape information and a truncated first user message are included;
/// nothing from request headers ends up here.
pub fn format_request_log(request: &UpstreamRequest) -> String {
    let msg_count = request.messages.as_array().map(|a| a.len()).unwrap_or(0);

    let mut parts = vec![
        format!("model={}", display_value(&request.model)),
        format!("max_tokens={}", display_value(&request.max_tokens)),
        format!("msgs={}", msg_count),
    ];

    if request.stream {
        parts.push("stream".to_string());
    }

    if request.system.is_some() {
        parts.push("system".to_string());
    }

    if let Some(count) = request.tools.as_ref().and_then(|t| t.as_array()).map(|a| a.len()) {
        if count > 0 {
            parts.push(format!("tools={}", count));
        }
    }

    if let Some(msg) = extract_first_user_message(&request.messages) {
        parts.push(format!("\"{}\"", msg));
    }

    format!("→ {}", parts.join(" "))
}

/// Strings without their JSON quotes, anything else as JSON
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn extract_first_user_message(messages: &Value) -> Option<String> {
    let msg = messages
        .as_array()?
        .iter()
        .find(|m| m.get("role").and_then(|r| r.as_str()) == Some("user"))?;

    let content = extract_message_content(msg)?;
    Some(truncate_message(&normalize_whitespace(&content)))
}

/// String content, or the text parts of block content joined by spaces
fn extract_message_content(msg: &Value) -> Option<String> {
    let content = msg.get("content")?;

    if let Some(text) = content.as_str() {
        return Some(text.to_string());
    }

    let texts: Vec<&str> = content
        .as_array()?
        .iter()
        .filter(|part| part.get("type").and_then(|t| t.as_str()) == Some("text"))
        .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
        .collect();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(" "))
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Up to 100 chars as-is; longer: first 25 + " ... " + last 75
fn truncate_message(s: &str) -> String {
    const MAX_TOTAL: usize = 100;
    const PREFIX_LEN: usize = 25;
    const SUFFIX_LEN: usize = 75;
    const ELLIPSIS: &str = " ... ";

    let char_count = s.chars().count();
    if char_count <= MAX_TOTAL {
        return s.to_string();
    }

    let prefix: String = s.chars().take(PREFIX_LEN).collect();
    let suffix: String = s.chars().skip(char_count - SUFFIX_LEN).collect();

    format!("{}{}{}", prefix, ELLIPSIS, suffix)
}
