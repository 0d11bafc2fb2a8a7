//! Streaming (SSE) passthrough

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use futures::StreamExt;
use uuid::Uuid;

/// Forward the upstream byte stream as-is.
///
/// Chunks are handed to the client as they arrive; nothing is buffered
/// or reparsed on the way through.
pub fn stream_response(upstream_response: reqwest::Response, request_id: Uuid) -> Response {
    let mut forwarded = 0usize;

    let stream = upstream_response.bytes_stream().inspect(move |chunk| match chunk {
        Ok(bytes) => {
            forwarded += bytes.len();
            tracing::trace!(
                request_id = %request_id,
                chunk_bytes = bytes.len(),
                total_bytes = forwarded,
                "Forwarding stream chunk"
            );
        }
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Error reading upstream stream");
        }
    });

    let mut response = Response::new(Body::from_stream(stream));
    *response.status_mut() = StatusCode::OK;

    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    response
}
