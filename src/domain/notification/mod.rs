//! Notification event model and connection lifecycle.

mod connection;
mod event;

pub use connection::ConnectionState;
pub use event::{EventTarget, InboundEvent, MalformedEvent};
