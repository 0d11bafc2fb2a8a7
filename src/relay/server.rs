//! Relay server setup

use axum::{
    extract::State,
    http::{header, HeaderValue},
    routing::{any, get},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use super::handler::RelayHandler;
use crate::config::{ApiKey, AppConfig};

/// Path the relay answers on
pub const RELAY_PATH: &str = "/ai";

/// Path used by the original serverless deployment
pub const LEGACY_RELAY_PATH: &str = "/.netlify/functions/ai";

/// Shared state for the relay
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<AppConfig>,
    pub http_client: reqwest::Client,
    /// Resolved once at startup, never mutated
    pub api_key: Option<Arc<ApiKey>>,
}

impl RelayState {
    pub fn new(config: AppConfig, api_key: Option<ApiKey>) -> Result<Self, reqwest::Error> {
        let http_client = build_http_client(&config)?;
        Ok(Self {
            config: Arc::new(config),
            http_client,
            api_key: api_key.map(Arc::new),
        })
    }
}

/// Build the upstream HTTP client.
///
/// Only the connect phase is bounded here; buffered calls set a per-request
/// timeout and streams run until upstream closes them.
fn build_http_client(config: &AppConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(config.upstream.timeout_seconds.min(30)))
        .pool_max_idle_per_host(10)
        .build()
}

/// Build the router
pub fn router(state: RelayState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(RELAY_PATH, any(relay_handler))
        .route(LEGACY_RELAY_PATH, any(relay_handler))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the relay server
pub async fn run_server(config: AppConfig, api_key: Option<ApiKey>) -> Result<(), Box<dyn std::error::Error>> {
    if api_key.is_none() {
        tracing::warn!(
            env = %config.upstream.api_key_env,
            "No upstream API key configured; POST requests will fail until it is set"
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let upstream_url = config.upstream.messages_url();
    let state = RelayState::new(config, api_key)?;

    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("throughline relay listening on {}", addr);
    tracing::info!("Relaying {} to {}", RELAY_PATH, upstream_url);

    Ok(axum::serve(listener, router(state)).await?)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

async fn relay_handler(State(state): State<RelayState>, req: axum::extract::Request) -> axum::response::Response {
    let handler = RelayHandler::new(state);
    handler.handle(req).await
}
