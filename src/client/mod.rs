//! Streaming client for the relay
//!
//! Sends single-turn prompts to a relay endpoint and returns the answer as
//! text, as progressively accumulated text, or as JSON extracted from the
//! model output.

mod accumulator;
mod ai;
mod decoder;
mod error;
mod extract;

pub use accumulator::{accumulate, Accumulator};
pub use ai::AiClient;
pub use decoder::{parse_line, DataLine, LineBuffer};
pub use error::ClientError;
pub use extract::{first_fenced_block, first_json_array, parse_json_payload, strip_code_fences};
