//! Client for the relay endpoint

use std::time::Duration;

use super::accumulator::accumulate;
use super::error::ClientError;
use super::extract::{parse_json_payload, strip_code_fences};
use crate::api::{ChatRequest, ChatResponse, ToolDescriptor};
use crate::config::ClientConfig;

/// Talks to a relay and turns its responses into text or JSON.
///
/// The `call`, `stream`, `search_json` and `json` operations never fail
/// outward: every failure is logged and reported as `None`. The `try_*`
/// variants expose the cause.
#[derive(Debug, Clone)]
pub struct AiClient {
    http: reqwest::Client,
    relay_url: String,
    model: String,
    max_tokens: u32,
    search_max_tokens: u32,
}

impl AiClient {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self::with_http_client(http, config))
    }

    /// Build on an existing HTTP client (shares its connection pool)
    pub fn with_http_client(http: reqwest::Client, config: &ClientConfig) -> Self {
        Self {
            http,
            relay_url: config.relay_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            search_max_tokens: config.search_max_tokens,
        }
    }

    pub fn relay_url(&self) -> &str {
        &self.relay_url
    }

    /// Buffered call; all text blocks concatenated
    pub async fn call(&self, prompt: &str, max_tokens: Option<u32>) -> Option<String> {
        match self.try_call(prompt, max_tokens).await {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(error = %e, "AI call failed");
                None
            }
        }
    }

    pub async fn try_call(&self, prompt: &str, max_tokens: Option<u32>) -> Result<String, ClientError> {
        let request = self.request(prompt, max_tokens.unwrap_or(self.max_tokens));
        let response = self.fetch(&request).await?;

        let text: String = response.texts().collect();
        if text.is_empty() {
            return Err(ClientError::Empty);
        }
        Ok(text)
    }

    /// Streaming call.
    ///
    /// `on_increment` receives the whole text accumulated so far after each
    /// delta. If the connection fails before or during the stream, a buffered
    /// call is made instead and its result delivered as a single increment.
    /// A non-success status from the relay is final.
    pub async fn stream<F>(&self, prompt: &str, mut on_increment: F, max_tokens: Option<u32>) -> Option<String>
    where
        F: FnMut(&str),
    {
        let max_tokens = max_tokens.unwrap_or(self.max_tokens);

        match self.try_stream(prompt, &mut on_increment, Some(max_tokens)).await {
            Ok(text) => text,
            Err(e) if e.is_transport() => {
                tracing::warn!(error = %e, "Stream interrupted, retrying as a buffered call");
                let text = self.call(prompt, Some(max_tokens)).await?;
                on_increment(&text);
                Some(text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "AI stream failed");
                None
            }
        }
    }

    /// Streaming call without the buffered fallback.
    /// `Ok(None)` means the stream completed but carried no text.
    pub async fn try_stream<F>(
        &self,
        prompt: &str,
        on_increment: &mut F,
        max_tokens: Option<u32>,
    ) -> Result<Option<String>, ClientError>
    where
        F: FnMut(&str),
    {
        let request = self
            .request(prompt, max_tokens.unwrap_or(self.max_tokens))
            .streaming();
        let response = self.post(&request).await?;

        let accumulator = accumulate(response.bytes_stream(), on_increment).await?;
        tracing::debug!(chars = accumulator.char_count(), "Stream complete");
        Ok(accumulator.into_text())
    }

    /// Call with web search enabled and pull a JSON value out of the answer
    pub async fn search_json(&self, prompt: &str, max_tokens: Option<u32>) -> Option<serde_json::Value> {
        match self.try_search_json(prompt, max_tokens).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "AI search failed");
                None
            }
        }
    }

    pub async fn try_search_json(
        &self,
        prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<serde_json::Value, ClientError> {
        let request = self
            .request(prompt, max_tokens.unwrap_or(self.search_max_tokens))
            .with_tool(ToolDescriptor::web_search());
        let response = self.fetch(&request).await?;

        // Search answers interleave text with tool blocks
        let text = response
            .texts()
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        if text.is_empty() {
            return Err(ClientError::Empty);
        }

        parse_json_payload(&text).map_err(ClientError::MalformedResult)
    }

    /// Buffered call whose answer should be a JSON document
    pub async fn json(&self, prompt: &str, max_tokens: Option<u32>) -> Option<serde_json::Value> {
        match self.try_json(prompt, max_tokens).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "AI JSON call failed");
                None
            }
        }
    }

    pub async fn try_json(&self, prompt: &str, max_tokens: Option<u32>) -> Result<serde_json::Value, ClientError> {
        let text = self.try_call(prompt, max_tokens).await?;
        serde_json::from_str(&strip_code_fences(&text)).map_err(ClientError::MalformedResult)
    }

    fn request(&self, prompt: &str, max_tokens: u32) -> ChatRequest {
        ChatRequest::user(&self.model, max_tokens, prompt)
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, ClientError> {
        let response = self.http.post(&self.relay_url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn fetch(&self, request: &ChatRequest) -> Result<ChatResponse, ClientError> {
        let bytes = self.post(request).await?.bytes().await?;
        let mut response: ChatResponse = serde_json::from_slice(&bytes).map_err(ClientError::Decode)?;

        if response.has_error() {
            let error = response.error.take().unwrap_or_default();
            return Err(ClientError::Upstream(error));
        }

        Ok(response)
    }
}
