//! Inbound bridge from the Redis event channel to connected sockets.
//!
//! The bridge owns a subscriber connection and fans every well-formed event
//! out through the room manager. Subscription failures are retried with
//! exponential backoff; malformed payloads are logged and dropped without
//! disturbing the subscription.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use crate::adapters::socket::{OutboundMessage, RoomManager};
use crate::domain::notification::{EventTarget, InboundEvent};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Delay policy between subscription attempts.
struct ReconnectPacing {
    delay: Duration,
}

impl ReconnectPacing {
    fn new() -> Self {
        Self {
            delay: INITIAL_BACKOFF,
        }
    }

    /// Delay before the next attempt. `received` is the number of messages
    /// the attempt that just ended handled; a quiet attempt doubles the
    /// delay up to the cap, traffic resets it.
    fn next_delay(&mut self, received: usize) -> Duration {
        if received > 0 {
            self.delay = INITIAL_BACKOFF;
            return self.delay;
        }
        let current = self.delay;
        self.delay = (self.delay * 2).min(MAX_BACKOFF);
        current
    }
}

/// Subscribes to the configured Redis channel and dispatches events to rooms.
pub struct EventBridge {
    client: redis::Client,
    channel: String,
    rooms: Arc<RoomManager>,
}

impl EventBridge {
    pub fn new(client: redis::Client, channel: impl Into<String>, rooms: Arc<RoomManager>) -> Self {
        Self {
            client,
            channel: channel.into(),
            rooms,
        }
    }

    /// Run the subscribe loop forever, reconnecting with backoff that doubles
    /// from one second up to thirty. The backoff resets only once traffic is
    /// observed, so a server that accepts subscriptions and instantly drops
    /// them still backs off instead of spinning.
    pub async fn run(self: Arc<Self>) {
        let mut pacing = ReconnectPacing::new();
        loop {
            let received = match self.subscribe_once().await {
                Ok(received) => {
                    tracing::warn!(channel = %self.channel, "event subscription ended, resubscribing");
                    received
                }
                Err(err) => {
                    tracing::error!(
                        channel = %self.channel,
                        error = %err,
                        "event subscription failed"
                    );
                    0
                }
            };
            tokio::time::sleep(pacing.next_delay(received)).await;
        }
    }

    /// Hold one subscription until the message stream ends. Returns the
    /// number of messages received on it.
    async fn subscribe_once(&self) -> Result<usize, redis::RedisError> {
        let connection = self.client.get_async_connection().await?;
        let mut pubsub = connection.into_pubsub();
        pubsub.subscribe(&self.channel).await?;
        tracing::info!(channel = %self.channel, "subscribed to event channel");

        let mut received = 0;
        let mut stream = pubsub.on_message();
        while let Some(message) = stream.next().await {
            received += 1;
            let payload = message.get_payload_bytes();
            self.dispatch(payload).await;
        }
        Ok(received)
    }

    /// Parse one raw payload and fan it out. Returns the number of
    /// connections the event was delivered to.
    pub async fn dispatch(&self, payload: &[u8]) -> usize {
        let event: InboundEvent = match serde_json::from_slice(payload) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(error = %err, "dropping malformed event");
                return 0;
            }
        };

        let message = OutboundMessage::from_event(&event);
        let delivered = match &event.target {
            EventTarget::User(user_id) => self.rooms.broadcast_to_user(user_id, message).await,
            EventTarget::Store(store_id) => self.rooms.broadcast_to_store(store_id, message).await,
            EventTarget::Broadcast => self.rooms.broadcast_to_all(message).await,
        };

        tracing::debug!(
            event_type = %event.event_type,
            delivered,
            "dispatched event"
        );
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::socket::{ConnectionRegistry, SocketCommand};
    use crate::domain::foundation::{ConnectionId, Identity, Role, StoreId, UserId};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn bridge_with_rooms() -> (Arc<EventBridge>, Arc<ConnectionRegistry>, Arc<RoomManager>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new(Arc::clone(&registry)));
        let client = redis::Client::open("redis://127.0.0.1/").unwrap();
        let bridge = Arc::new(EventBridge::new(client, "events", Arc::clone(&rooms)));
        (bridge, registry, rooms)
    }

    async fn connect(
        registry: &ConnectionRegistry,
        rooms: &RoomManager,
        user: &str,
        store: &str,
    ) -> UnboundedReceiver<SocketCommand> {
        let identity = Identity {
            user_id: UserId::new(user).unwrap(),
            store_id: StoreId::new(store).unwrap(),
            role: Role::Staff,
        };
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        registry
            .register(ConnectionId::new(), identity.clone(), tx)
            .await
            .unwrap();
        rooms.join(&identity.store_id, &identity.user_id).await;
        rx
    }

    #[tokio::test]
    async fn store_event_reaches_store_members() {
        let (bridge, registry, rooms) = bridge_with_rooms();
        let mut rx_a = connect(&registry, &rooms, "u1", "s1").await;
        let mut rx_b = connect(&registry, &rooms, "u2", "s2").await;

        let payload = br#"{"target":"store","targetId":"s1","type":"order-created","payload":{"orderId":7}}"#;
        let delivered = bridge.dispatch(payload).await;

        assert_eq!(delivered, 1);
        match rx_a.try_recv().unwrap() {
            SocketCommand::Deliver(message) => {
                assert_eq!(message.event_type, "order-created");
                assert_eq!(message.payload["orderId"], 7);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn user_event_targets_one_user() {
        let (bridge, registry, rooms) = bridge_with_rooms();
        let mut rx_a = connect(&registry, &rooms, "u1", "s1").await;
        let mut rx_b = connect(&registry, &rooms, "u2", "s1").await;

        let payload = br#"{"target":"user","targetId":"u2","type":"task-assigned","payload":{}}"#;
        assert_eq!(bridge.dispatch(payload).await, 1);
        assert!(rx_a.try_recv().is_err());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn broadcast_event_reaches_everyone() {
        let (bridge, registry, rooms) = bridge_with_rooms();
        let mut rx_a = connect(&registry, &rooms, "u1", "s1").await;
        let mut rx_b = connect(&registry, &rooms, "u2", "s2").await;

        let payload = br#"{"target":"broadcast","type":"maintenance","payload":{"at":"soon"}}"#;
        assert_eq!(bridge.dispatch(payload).await, 2);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[tokio::test]
    async fn malformed_payload_is_dropped_and_later_events_still_flow() {
        let (bridge, registry, rooms) = bridge_with_rooms();
        let mut rx = connect(&registry, &rooms, "u1", "s1").await;

        assert_eq!(bridge.dispatch(b"not json").await, 0);
        assert_eq!(bridge.dispatch(br#"{"target":"user","type":"x"}"#).await, 0);
        assert!(rx.try_recv().is_err());

        // The stream survives bad payloads.
        let payload = br#"{"target":"user","targetId":"u1","type":"task-assigned","payload":{}}"#;
        assert_eq!(bridge.dispatch(payload).await, 1);
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn quiet_subscriptions_back_off_up_to_the_cap() {
        let mut pacing = ReconnectPacing::new();
        assert_eq!(pacing.next_delay(0), Duration::from_secs(1));
        assert_eq!(pacing.next_delay(0), Duration::from_secs(2));
        assert_eq!(pacing.next_delay(0), Duration::from_secs(4));
        for _ in 0..10 {
            pacing.next_delay(0);
        }
        assert_eq!(pacing.next_delay(0), Duration::from_secs(30));
    }

    #[test]
    fn traffic_resets_the_reconnect_delay() {
        let mut pacing = ReconnectPacing::new();
        pacing.next_delay(0);
        pacing.next_delay(0);
        pacing.next_delay(0);
        assert_eq!(pacing.next_delay(3), Duration::from_secs(1));
        assert_eq!(pacing.next_delay(0), Duration::from_secs(1));
        assert_eq!(pacing.next_delay(0), Duration::from_secs(2));
    }
}
