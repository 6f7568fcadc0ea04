//! Events received from (and published to) the shared pub/sub channel.
//!
//! Wire schema:
//!
//! ```json
//! { "target": "user" | "store" | "broadcast",
//!   "targetId": "<id or null>",
//!   "type": "order.assigned",
//!   "payload": { } }
//! ```
//!
//! A `user` or `store` target without a usable `targetId` is a parse error,
//! surfaced as [`MalformedEvent`] so the bridge can log and drop it.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::domain::foundation::{Identity, StoreId, UserId};

/// Event types the server itself originates on the channel.
pub const USER_ONLINE: &str = "user-online";
pub const USER_OFFLINE: &str = "user-offline";

/// Delivery target of a channel event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    /// Every connection of one user, across all their devices.
    User(UserId),
    /// Every connection of every member of one store room.
    Store(StoreId),
    /// Every registered connection.
    Broadcast,
}

/// A single event consumed from the shared channel.
///
/// Transient: consumed once, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireEvent", into = "WireEvent")]
pub struct InboundEvent {
    pub target: EventTarget,
    pub event_type: String,
    pub payload: JsonValue,
}

impl InboundEvent {
    pub fn new(target: EventTarget, event_type: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            target,
            event_type: event_type.into(),
            payload,
        }
    }

    /// Presence event announcing the user's first live session.
    ///
    /// Targets the store so every instance's dashboards update.
    pub fn user_online(identity: &Identity) -> Self {
        Self::presence(identity, USER_ONLINE)
    }

    /// Presence event announcing the user's last session ended.
    pub fn user_offline(identity: &Identity) -> Self {
        Self::presence(identity, USER_OFFLINE)
    }

    fn presence(identity: &Identity, event_type: &str) -> Self {
        Self::new(
            EventTarget::Store(identity.store_id.clone()),
            event_type,
            json!({
                "userId": identity.user_id,
                "storeId": identity.store_id,
            }),
        )
    }
}

/// Parse failure for a channel message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedEvent {
    #[error("`{0}` target requires a targetId")]
    MissingTargetId(&'static str),

    #[error("targetId cannot be empty")]
    EmptyTargetId,
}

/// Transport representation matching the channel's JSON schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireEvent {
    target: TargetKind,
    #[serde(rename = "targetId", default)]
    target_id: Option<String>,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    payload: JsonValue,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TargetKind {
    User,
    Store,
    Broadcast,
}

impl TryFrom<WireEvent> for InboundEvent {
    type Error = MalformedEvent;

    fn try_from(wire: WireEvent) -> Result<Self, Self::Error> {
        let target = match wire.target {
            TargetKind::User => {
                let id = wire
                    .target_id
                    .ok_or(MalformedEvent::MissingTargetId("user"))?;
                EventTarget::User(UserId::new(id).map_err(|_| MalformedEvent::EmptyTargetId)?)
            }
            TargetKind::Store => {
                let id = wire
                    .target_id
                    .ok_or(MalformedEvent::MissingTargetId("store"))?;
                EventTarget::Store(StoreId::new(id).map_err(|_| MalformedEvent::EmptyTargetId)?)
            }
            TargetKind::Broadcast => EventTarget::Broadcast,
        };

        Ok(InboundEvent {
            target,
            event_type: wire.event_type,
            payload: wire.payload,
        })
    }
}

impl From<InboundEvent> for WireEvent {
    fn from(event: InboundEvent) -> Self {
        let (target, target_id) = match event.target {
            EventTarget::User(id) => (TargetKind::User, Some(id.to_string())),
            EventTarget::Store(id) => (TargetKind::Store, Some(id.to_string())),
            EventTarget::Broadcast => (TargetKind::Broadcast, None),
        };

        WireEvent {
            target,
            target_id,
            event_type: event.event_type,
            payload: event.payload,
        }
    }
}
