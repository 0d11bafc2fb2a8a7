//! Mock upstream that simulates the Anthropic Messages API
//!
//! Tests pre-configure responses via SharedUpstreamState before each request.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    response::Response,
    routing::post,
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::types::{MockResponse, ReceivedRequest, SharedUpstreamState, UpstreamState};

/// Served when a test forgot to queue a response
fn default_message_response() -> MockResponse {
    MockResponse::json(
        r#"{"id":"msg_default","type":"message","role":"assistant","model":"claude-sonnet-4-20250514","content":[{"type":"text","text":"Default response (no mock queued)"}],"stop_reason":"end_turn","usage":{"input_tokens":10,"output_tokens":5}}"#,
    )
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string)
}

/// Handle POST /v1/messages - serves pre-configured mock responses
async fn handle_messages(State(state): State<SharedUpstreamState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = axum::body::to_bytes(body, 10 * 1024 * 1024)
        .await
        .unwrap_or_default();
    let body_json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null);

    let received = ReceivedRequest {
        path: parts.uri.path().to_string(),
        api_key: header_value(&parts.headers, "x-api-key"),
        api_version: header_value(&parts.headers, "anthropic-version"),
        body: body_json,
    };

    let mock_response = {
        let mut state = state.lock().unwrap();
        state.received_requests.push(received);
        state.response_queue.pop_front().unwrap_or_else(default_message_response)
    };

    Response::builder()
        .status(mock_response.status)
        .header("Content-Type", &mock_response.content_type)
        .body(Body::from(mock_response.body))
        .unwrap()
}

/// Start the mock upstream and return the shared state handle
pub async fn start(port: u16) -> anyhow::Result<SharedUpstreamState> {
    let state: SharedUpstreamState = std::sync::Arc::new(std::sync::Mutex::new(UpstreamState::default()));

    let app = Router::new()
        .route("/v1/messages", post(handle_messages))
        .with_state(state.clone());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind mock upstream to {}: {}", addr, e))?;

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Mock upstream server failed");
    });

    // Brief pause to let the server start accepting connections
    tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

    Ok(state)
}

/// Configure the next response for /v1/messages
pub fn queue_response(state: &SharedUpstreamState, response: MockResponse) {
    state.lock().unwrap().response_queue.push_back(response);
}

/// All requests received since the last drain
pub fn drain_requests(state: &SharedUpstreamState) -> Vec<ReceivedRequest> {
    let mut s = state.lock().unwrap();
    s.received_requests.drain(..).collect()
}
