//! Common test helpers and JSON builders

use serde_json::{json, Value};

// ─── Request builders ────────────────────────────────────────────────────────

/// The minimal body a front-end sends: just the conversation
pub fn basic_request(prompt: &str) -> Value {
    json!({
        "messages": [{"role": "user", "content": prompt}]
    })
}

// ─── Upstream response builders ───────────────────────────────────────────────

/// A buffered Messages API response with one text block per entry
pub fn upstream_message_response(texts: &[&str]) -> String {
    let content: Vec<Value> = texts.iter().map(|t| json!({"type": "text", "text": t})).collect();
    json!({
        "id": "msg_e2e_001",
        "type": "message",
        "role": "assistant",
        "model": "claude-sonnet-4-20250514",
        "content": content,
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 12, "output_tokens": 8}
    })
    .to_string()
}

/// A complete Messages API event stream carrying the given text deltas
pub fn upstream_event_stream(deltas: &[&str]) -> String {
    let mut body = String::new();
    let mut push = |event: &str, data: Value| {
        body.push_str(&format!("event: {event}\ndata: {data}\n\n"));
    };

    push(
        "message_start",
        json!({"type": "message_start", "message": {"id": "msg_e2e_002", "role": "assistant", "content": []}}),
    );
    push(
        "content_block_start",
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
    );
    push("ping", json!({"type": "ping"}));
    for delta in deltas {
        push(
            "content_block_delta",
            json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": delta}}),
        );
    }
    push("content_block_stop", json!({"type": "content_block_stop", "index": 0}));
    push(
        "message_delta",
        json!({"type": "message_delta", "delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 8}}),
    );
    push("message_stop", json!({"type": "message_stop"}));

    body
}

/// An upstream error body in the Messages API shape
pub fn upstream_error(kind: &str, message: &str) -> String {
    json!({"type": "error", "error": {"type": kind, "message": message}}).to_string()
}

// ─── Assertion helpers ────────────────────────────────────────────────────────

/// Assert two strings are equal, with context on failure
pub fn assert_eq_str(actual: &str, expected: &str, label: &str) -> anyhow::Result<()> {
    if actual != expected {
        Err(anyhow::anyhow!("{label}: expected {:?} but got {:?}", expected, actual))
    } else {
        Ok(())
    }
}

/// Assert condition is true, with message
pub fn assert_true(cond: bool, msg: &str) -> anyhow::Result<()> {
    if !cond {
        Err(anyhow::anyhow!("{}", msg))
    } else {
        Ok(())
    }
}

/// Assert a status code, showing the body on failure
pub fn assert_status(actual: u16, expected: u16, body: &str) -> anyhow::Result<()> {
    assert_true(
        actual == expected,
        &format!("Expected status {}, got {}: {}", expected, actual, &body[..body.len().min(300)]),
    )
}
