//! Request summaries for logging

mod request_log;

pub use request_log::*;
