//! Message types exchanged with connected clients.
//!
//! Outbound wire schema: `{"type": string, "payload": object, "timestamp": ISO-8601}`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::domain::foundation::{ConnectionId, Timestamp};
use crate::domain::notification::InboundEvent;

/// Application close codes sent with the WebSocket close frame.
pub mod close_code {
    /// Token missing, malformed, expired, or carrying a bad signature.
    pub const AUTH_FAILED: u16 = 4001;
    /// A connection id was registered twice (protocol error).
    pub const DUPLICATE_CONNECTION: u16 = 4002;
    /// Connection exceeded the idle threshold.
    pub const IDLE_TIMEOUT: u16 = 4003;
}

/// Command pushed to a connection's transport task.
///
/// Each connection owns one queue of these; queue order is delivery order,
/// which preserves per-connection event ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketCommand {
    /// Serialize and send this message to the client.
    Deliver(OutboundMessage),
    /// Close the transport with the given application close code.
    Close(u16),
}

/// A message on its way to a connected client.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: JsonValue,
    pub timestamp: String,
}

impl OutboundMessage {
    /// Create a message stamped with the current time.
    pub fn new(event_type: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            timestamp: Timestamp::now().to_rfc3339(),
        }
    }

    /// Acknowledgement sent once a connection is authenticated and registered.
    pub fn connected(connection_id: ConnectionId) -> Self {
        Self::new(
            "connected",
            json!({ "connectionId": connection_id.to_string() }),
        )
    }

    /// Heartbeat response.
    pub fn pong() -> Self {
        Self::new("pong", json!({}))
    }

    /// Client-facing form of a channel event.
    pub fn from_event(event: &InboundEvent) -> Self {
        Self::new(event.event_type.clone(), event.payload.clone())
    }
}

/// All message types that can be received from a client.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Heartbeat request.
    Ping,
}
