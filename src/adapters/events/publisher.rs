//! Outbound event publishing over Redis pub/sub.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;

use crate::domain::notification::InboundEvent;
use crate::ports::{EventPublisher, PublishError};

/// Publishes events to the shared Redis channel so peer instances (and this
/// one, through its own subscription) deliver them.
#[derive(Clone)]
pub struct RedisEventPublisher {
    connection: MultiplexedConnection,
    channel: String,
}

impl RedisEventPublisher {
    /// Establish the multiplexed publishing connection.
    pub async fn connect(
        client: &redis::Client,
        channel: impl Into<String>,
    ) -> Result<Self, redis::RedisError> {
        let connection = client.get_multiplexed_tokio_connection().await?;
        Ok(Self {
            connection,
            channel: channel.into(),
        })
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: InboundEvent) -> Result<(), PublishError> {
        let payload = serde_json::to_string(&event)
            .map_err(|e| PublishError::Serialization(e.to_string()))?;

        let mut connection = self.connection.clone();
        let _: i64 = connection
            .publish(&self.channel, payload)
            .await
            .map_err(|e| PublishError::Channel(e.to_string()))?;
        Ok(())
    }
}
