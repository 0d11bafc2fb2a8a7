//! throughline: credential-injecting relay and streaming client for the
//! Anthropic Messages API
//!
//! Features:
//! - HTTP relay that injects a server-held API key and forwards buffered or
//!   streamed responses untouched
//! - Streaming client with incremental text delivery and a buffered fallback
//! - JSON extraction from free-form model output

pub mod api;
pub mod client;
pub mod config;
pub mod relay;
pub mod stats;

#[cfg(test)]
mod testing;

pub use client::AiClient;
pub use config::AppConfig;
pub use relay::run_server;
