//! EventPublisher port - pushes events onto the shared pub/sub channel.
//!
//! Locally-originated events (presence changes, internal triggers) go out
//! through this port so every server instance, including this one, delivers
//! them to its own connections. Delivery is at-least-once; the publisher
//! does not special-case its own instance.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::notification::InboundEvent;

/// Errors that can occur when publishing to the channel.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The channel transport is unreachable or refused the command.
    #[error("channel unavailable: {0}")]
    Channel(String),

    /// The event could not be serialized for transport.
    #[error("event serialization failed: {0}")]
    Serialization(String),
}

/// Port for publishing events to the shared channel.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish a single event to the channel.
    async fn publish(&self, event: InboundEvent) -> Result<(), PublishError>;
}
