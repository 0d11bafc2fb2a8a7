//! HTTP client that talks to the relay the way the browser front-end does

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Method};

use crate::types::{RelayResponse, SseEvent, StreamingResponse};

/// Build an HTTP client
pub fn build_client() -> Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .expect("Failed to build reqwest client")
}

fn relay_url(relay_addr: &str, path: &str) -> String {
    format!("http://{relay_addr}{path}")
}

/// Send any method with an optional raw body and read the whole response
pub async fn send(
    client: &Client,
    relay_addr: &str,
    method: Method,
    path: &str,
    body: Option<String>,
) -> anyhow::Result<RelayResponse> {
    let url = relay_url(relay_addr, path);

    let mut request = client.request(method.clone(), &url);
    if let Some(body) = body {
        request = request.header("Content-Type", "application/json").body(body);
    }

    let resp = request
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send {} {}: {}", method, url, e))?;

    let status = resp.status().as_u16();
    let headers = resp.headers().clone();
    let body = resp
        .text()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to read relay response: {}", e))?;

    Ok(RelayResponse { status, headers, body })
}

/// POST a JSON body to /ai
pub async fn send_json(
    client: &Client,
    relay_addr: &str,
    request_body: &serde_json::Value,
) -> anyhow::Result<RelayResponse> {
    send(client, relay_addr, Method::POST, "/ai", Some(request_body.to_string())).await
}

/// POST a streaming request to /ai and collect every SSE event
pub async fn send_streaming(
    client: &Client,
    relay_addr: &str,
    mut request_body: serde_json::Value,
) -> anyhow::Result<StreamingResponse> {
    request_body["stream"] = serde_json::Value::Bool(true);

    let url = relay_url(relay_addr, "/ai");

    let resp = client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request_body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to send streaming request to relay: {}", e))?;

    let status = resp.status().as_u16();
    if status != 200 {
        let body = resp.text().await.unwrap_or_default();
        return Err(anyhow::anyhow!("Relay returned error {}: {}", status, body));
    }

    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !content_type.contains("text/event-stream") {
        return Err(anyhow::anyhow!("Expected text/event-stream but got: {}", content_type));
    }

    let mut stream = resp.bytes_stream();
    let mut all_bytes: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk: Bytes = chunk.map_err(|e| anyhow::anyhow!("Stream read error: {}", e))?;
        all_bytes.extend_from_slice(&chunk);
    }

    let raw = String::from_utf8_lossy(&all_bytes).into_owned();
    let events = parse_sse(&raw);

    Ok(StreamingResponse { raw, events })
}

/// Parse SSE body text into events
///
/// Events are separated by a blank line. Only `event:` and `data:` fields
/// are kept; blocks without data are dropped.
fn parse_sse(text: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();

    for raw_event in text.split("\n\n") {
        let raw_event = raw_event.trim();
        if raw_event.is_empty() {
            continue;
        }

        let mut event = None;
        let mut data = None;
        for line in raw_event.lines() {
            if let Some(name) = line.strip_prefix("event: ") {
                event = Some(name.to_string());
            } else if let Some(payload) = line.strip_prefix("data: ") {
                data = Some(payload.to_string());
            }
        }

        if let Some(data) = data {
            events.push(SseEvent { event, data });
        }
    }

    events
}
