//! Request/response handler for the relay

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use std::time::{Duration, Instant};
use uuid::Uuid;

use super::error::RelayError;
use super::server::RelayState;
use super::streaming::stream_response;
use crate::api::{RelayRequest, UpstreamRequest};
use crate::stats::format_request_log;

/// Largest request body the relay will read
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Relay request handler
pub struct RelayHandler {
    state: RelayState,
}

impl RelayHandler {
    pub fn new(state: RelayState) -> Self {
        Self { state }
    }

    /// Handle an incoming request. Every failure becomes a JSON error body.
    pub async fn handle(&self, req: Request<Body>) -> Response {
        let request_id = Uuid::new_v4();
        let start = Instant::now();
        let method = req.method().clone();

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %req.uri().path(),
            "Processing relay request"
        );

        if method == Method::OPTIONS {
            return preflight_response();
        }

        match self.relay(req, request_id).await {
            Ok(response) => {
                tracing::debug!(
                    request_id = %request_id,
                    status = %response.status(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Relay response ready"
                );
                response
            }
            Err(e) => {
                match &e {
                    RelayError::MethodNotAllowed => {
                        tracing::debug!(request_id = %request_id, method = %method, "Rejected method")
                    }
                    RelayError::MissingCredential => {
                        tracing::error!(request_id = %request_id, "Upstream API key is not configured")
                    }
                    other => tracing::error!(request_id = %request_id, error = %other, "Relay failed"),
                }
                e.into_response()
            }
        }
    }

    async fn relay(&self, req: Request<Body>, request_id: Uuid) -> Result<Response, RelayError> {
        if req.method() != Method::POST {
            return Err(RelayError::MethodNotAllowed);
        }

        // Checked before the body is read or anything goes out
        let api_key = self
            .state
            .api_key
            .clone()
            .ok_or(RelayError::MissingCredential)?;

        let body_bytes = to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| RelayError::InvalidBody(format!("failed to read request body: {}", e)))?;

        let upstream_request = parse_relay_request(&body_bytes)?.into_upstream(&self.state.config.upstream);
        tracing::info!(request_id = %request_id, "{}", format_request_log(&upstream_request));

        let upstream = &self.state.config.upstream;
        let mut upstream_req = self
            .state
            .http_client
            .post(upstream.messages_url())
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-api-key", api_key.expose())
            .header("anthropic-version", upstream.api_version.as_str())
            .json(&upstream_request);

        // A reqwest timeout also bounds body reads, so streams are left open-ended
        if !upstream_request.stream {
            upstream_req = upstream_req.timeout(Duration::from_secs(upstream.timeout_seconds));
        }

        let upstream_response = upstream_req.send().await?;

        let status = upstream_response.status();
        tracing::debug!(
            request_id = %request_id,
            status = %status,
            "Received response from upstream"
        );

        if !status.is_success() {
            return relay_upstream_error(upstream_response, request_id).await;
        }

        if upstream_request.stream {
            return Ok(stream_response(upstream_response, request_id));
        }

        buffered_response(upstream_response, &upstream_request).await
    }
}

/// Decode the body as a JSON object
fn parse_relay_request(body: &Bytes) -> Result<RelayRequest, RelayError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| RelayError::InvalidBody(format!("invalid JSON body: {}", e)))?;
    if !value.is_object() {
        return Err(RelayError::InvalidBody(
            "request body must be a JSON object".to_string(),
        ));
    }
    serde_json::from_value(value)
        .map_err(|e| RelayError::InvalidBody(format!("invalid request body: {}", e)))
}

/// Answer a CORS preflight without touching upstream
fn preflight_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            (header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
        ],
    )
        .into_response()
}

/// Upstream status and raw body, untouched
async fn relay_upstream_error(
    upstream_response: reqwest::Response,
    request_id: Uuid,
) -> Result<Response, RelayError> {
    let status = upstream_response.status();
    let body = upstream_response.bytes().await?;

    tracing::warn!(
        request_id = %request_id,
        status = %status,
        error_body = %String::from_utf8_lossy(&body[..body.len().min(500)]),
        "Upstream returned error response"
    );

    Ok((status, [(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Buffer the upstream JSON and re-emit the same bytes
async fn buffered_response(
    upstream_response: reqwest::Response,
    upstream_request: &UpstreamRequest,
) -> Result<Response, RelayError> {
    let body = upstream_response.bytes().await?;

    serde_json::from_slice::<serde::de::IgnoredAny>(&body)
        .map_err(|e| RelayError::UpstreamBody(format!("upstream returned invalid JSON: {}", e)))?;

    tracing::debug!(
        model = %upstream_request.model,
        body_size = body.len(),
        "Relaying buffered upstream response"
    );

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
