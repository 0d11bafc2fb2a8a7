//! Messages API types shared by the relay and the client

mod messages;
mod relay;

pub use messages::*;
pub use relay::*;
