//! Presence scenarios exercised at the component level: registry, rooms,
//! and the event bridge wired together the way the server wires them.

use std::sync::Arc;

use proptest::prelude::*;
use tokio::sync::mpsc::UnboundedReceiver;

use storeline_notify::adapters::events::EventBridge;
use storeline_notify::adapters::socket::{
    ConnectionRegistry, OutboundMessage, RegistryError, RoomManager, SocketCommand,
};
use storeline_notify::domain::foundation::{ConnectionId, Identity, Role, StoreId, UserId};
use storeline_notify::domain::notification::InboundEvent;

fn identity(user: &str, store: &str) -> Identity {
    Identity {
        user_id: UserId::new(user).unwrap(),
        store_id: StoreId::new(store).unwrap(),
        role: Role::Staff,
    }
}

struct Harness {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomManager>,
}

struct Session {
    id: ConnectionId,
    identity: Identity,
    rx: UnboundedReceiver<SocketCommand>,
    first_session: bool,
}

impl Harness {
    fn new() -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomManager::new(Arc::clone(&registry)));
        Self { registry, rooms }
    }

    async fn connect(&self, user: &str, store: &str) -> Session {
        let identity = identity(user, store);
        let id = ConnectionId::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let registered = self
            .registry
            .register(id, identity.clone(), tx)
            .await
            .unwrap();
        self.rooms.join(&identity.store_id, &identity.user_id).await;
        Session {
            id,
            identity,
            rx,
            first_session: registered.first_session,
        }
    }

    async fn disconnect(&self, session: &Session) -> bool {
        let removed = self.registry.unregister(session.id).await;
        self.rooms
            .leave(&session.identity.store_id, &session.identity.user_id)
            .await;
        removed.map(|r| r.last_session).unwrap_or(false)
    }
}

fn deliveries(rx: &mut UnboundedReceiver<SocketCommand>) -> Vec<OutboundMessage> {
    let mut out = Vec::new();
    while let Ok(command) = rx.try_recv() {
        if let SocketCommand::Deliver(message) = command {
            out.push(message);
        }
    }
    out
}

#[tokio::test]
async fn first_and_last_session_bracket_a_multi_device_user() {
    let harness = Harness::new();

    let phone = harness.connect("u1", "s1").await;
    assert!(phone.first_session);

    let laptop = harness.connect("u1", "s1").await;
    assert!(!laptop.first_session);

    assert!(!harness.disconnect(&phone).await);
    assert!(harness.disconnect(&laptop).await);
    assert_eq!(harness.registry.user_count().await, 0);
}

#[tokio::test]
async fn reused_connection_id_is_rejected_without_side_effects() {
    let harness = Harness::new();
    let session = harness.connect("u1", "s1").await;

    let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
    let result = harness
        .registry
        .register(session.id, identity("u2", "s1"), tx)
        .await;

    assert!(matches!(result, Err(RegistryError::DuplicateConnection(_))));
    assert_eq!(harness.registry.connection_count().await, 1);
    assert!(harness
        .registry
        .connections_of(&UserId::new("u2").unwrap())
        .await
        .is_empty());
}

#[tokio::test]
async fn room_membership_survives_while_another_device_is_connected() {
    let harness = Harness::new();
    let phone = harness.connect("u1", "s1").await;
    let _laptop = harness.connect("u1", "s1").await;

    harness.disconnect(&phone).await;

    let members = harness.rooms.members(&StoreId::new("s1").unwrap()).await;
    assert!(members.contains(&UserId::new("u1").unwrap()));
}

#[tokio::test]
async fn store_events_reach_only_that_store() {
    let harness = Harness::new();
    let mut clerk = harness.connect("u1", "s1").await;
    let mut manager = harness.connect("u2", "s1").await;
    let mut other_store = harness.connect("u3", "s2").await;

    let client = redis::Client::open("redis://127.0.0.1/").unwrap();
    let bridge = EventBridge::new(client, "events", Arc::clone(&harness.rooms));

    let delivered = bridge
        .dispatch(br#"{"target":"store","targetId":"s1","type":"stock-low","payload":{"sku":"A1"}}"#)
        .await;

    assert_eq!(delivered, 2);
    assert_eq!(deliveries(&mut clerk.rx).len(), 1);
    assert_eq!(deliveries(&mut manager.rx).len(), 1);
    assert!(deliveries(&mut other_store.rx).is_empty());
}

#[tokio::test]
async fn presence_events_carry_user_and_store() {
    let event = InboundEvent::user_online(&identity("u1", "s1"));
    assert_eq!(event.event_type, "user-online");
    assert_eq!(event.payload["userId"], "u1");
    assert_eq!(event.payload["storeId"], "s1");

    let event = InboundEvent::user_offline(&identity("u1", "s1"));
    assert_eq!(event.event_type, "user-offline");
}

#[tokio::test]
async fn offline_user_receives_nothing_after_disconnect() {
    let harness = Harness::new();
    let mut session = harness.connect("u1", "s1").await;
    harness.disconnect(&session).await;

    let client = redis::Client::open("redis://127.0.0.1/").unwrap();
    let bridge = EventBridge::new(client, "events", Arc::clone(&harness.rooms));
    let delivered = bridge
        .dispatch(br#"{"target":"user","targetId":"u1","type":"ping","payload":{}}"#)
        .await;

    assert_eq!(delivered, 0);
    assert!(deliveries(&mut session.rx).is_empty());
}

proptest! {
    /// After any interleaving of connects and disconnects, session counts
    /// and room membership agree with the set of live connections.
    #[test]
    fn registry_and_rooms_stay_consistent(actions in prop::collection::vec((0..4usize, prop::bool::ANY), 1..40)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let harness = Harness::new();
            let users = ["u1", "u2", "u3", "u4"];
            let mut live: Vec<Session> = Vec::new();

            for (slot, connect) in actions {
                if connect {
                    live.push(harness.connect(users[slot], "s1").await);
                } else if !live.is_empty() {
                    let session = live.remove(slot % live.len());
                    harness.disconnect(&session).await;
                }
            }

            let expected_users: std::collections::HashSet<_> =
                live.iter().map(|s| s.identity.user_id.clone()).collect();

            prop_assert_eq!(harness.registry.connection_count().await, live.len());
            prop_assert_eq!(harness.registry.user_count().await, expected_users.len());

            let members = harness.rooms.members(&StoreId::new("s1").unwrap()).await;
            prop_assert_eq!(members, expected_users);
            Ok(())
        })?;
    }
}
