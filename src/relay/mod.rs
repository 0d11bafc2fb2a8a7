//! HTTP relay to the upstream Messages API

mod error;
mod handler;
pub mod server;
mod streaming;

pub use error::RelayError;
pub use handler::RelayHandler;
pub use server::{router, run_server, RelayState, LEGACY_RELAY_PATH, RELAY_PATH};
