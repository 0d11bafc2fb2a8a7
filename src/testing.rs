//! In-process mock HTTP server shared by the relay and client tests.
//!
//! Tests queue responses up front; each incoming request pops the next one
//! and is recorded for later inspection.

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::Response,
    Router,
};
use bytes::Bytes;
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

type Chunk = Result<Bytes, std::io::Error>;

enum MockBody {
    Full(String),
    Chunked(UnboundedReceiver<Chunk>),
}

/// A response the mock will serve for the next request
pub struct MockResponse {
    status: u16,
    content_type: String,
    body: MockBody,
}

impl MockResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "application/json".to_string(),
            body: MockBody::Full(body.into()),
        }
    }

    pub fn event_stream(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream".to_string(),
            body: MockBody::Full(body.into()),
        }
    }
}

/// Feeds a chunked response body one piece at a time
pub struct ChunkSender(UnboundedSender<Chunk>);

impl ChunkSender {
    pub fn send(&self, chunk: impl AsRef<[u8]>) {
        let _ = self
            .0
            .unbounded_send(Ok(Bytes::copy_from_slice(chunk.as_ref())));
    }

    /// Abort the body mid-stream
    pub fn fail(&self) {
        let _ = self.0.unbounded_send(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "mock stream aborted",
        )));
    }

    /// Close the body normally
    pub fn finish(self) {}
}

/// A request received by the mock
#[derive(Debug, Clone)]
pub struct ReceivedRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

impl ReceivedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[derive(Default)]
struct MockState {
    queue: VecDeque<MockResponse>,
    received: Vec<ReceivedRequest>,
}

type SharedMockState = Arc<Mutex<MockState>>;

pub struct MockServer {
    addr: SocketAddr,
    state: SharedMockState,
}

impl MockServer {
    /// Bind an ephemeral port and serve every path
    pub async fn start() -> Self {
        let state: SharedMockState = Arc::new(Mutex::new(MockState::default()));
        let app = Router::new().fallback(handle).with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn queue(&self, response: MockResponse) {
        self.state.lock().unwrap().queue.push_back(response);
    }

    /// Queue a response whose body is fed through the returned sender
    pub fn queue_chunked(&self, status: u16, content_type: &str) -> ChunkSender {
        let (tx, rx) = unbounded();
        self.queue(MockResponse {
            status,
            content_type: content_type.to_string(),
            body: MockBody::Chunked(rx),
        });
        ChunkSender(tx)
    }

    pub fn drain_requests(&self) -> Vec<ReceivedRequest> {
        self.state.lock().unwrap().received.drain(..).collect()
    }
}

/// A port nothing is listening on
pub fn unused_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

async fn handle(State(state): State<SharedMockState>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();

    let received = ReceivedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        headers: parts.headers,
        body: serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null),
    };

    let mock = {
        let mut state = state.lock().unwrap();
        state.received.push(received);
        state.queue.pop_front()
    };

    let Some(mock) = mock else {
        return Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"error":{"message":"no mock response queued"}}"#))
            .unwrap();
    };

    let body = match mock.body {
        MockBody::Full(text) => Body::from(text),
        MockBody::Chunked(rx) => Body::from_stream(rx),
    };

    Response::builder()
        .status(mock.status)
        .header("Content-Type", mock.content_type)
        .body(body)
        .unwrap()
}
