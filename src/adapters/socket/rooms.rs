//! Store room membership and broadcast fan-out.
//!
//! A room is the set of users with at least one live connection affiliated
//! to a store. Room state is derived from the registry and updated
//! incrementally alongside every registry mutation; it is never recomputed
//! by scanning all connections at broadcast time.
//!
//! # Lock ordering
//!
//! The registry lock is always acquired before the room lock, never after.
//! `leave` holds a registry read view across its room mutation so the
//! liveness check and the removal observe the same registry state; `join`
//! and the broadcast paths never take the registry lock while holding the
//! room lock, so the two cannot deadlock.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::domain::foundation::{ConnectionId, StoreId, UserId};

use super::messages::{OutboundMessage, SocketCommand};
use super::registry::{CommandSender, ConnectionRegistry};

/// Manages store rooms and delivers messages to member connections.
pub struct RoomManager {
    rooms: RwLock<HashMap<StoreId, HashSet<UserId>>>,
    registry: Arc<ConnectionRegistry>,
}

impl RoomManager {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            registry,
        }
    }

    /// The registry this manager derives membership from.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Add a user to the store's member set. Idempotent.
    pub async fn join(&self, store_id: &StoreId, user_id: &UserId) {
        self.rooms
            .write()
            .await
            .entry(store_id.clone())
            .or_default()
            .insert(user_id.clone());
    }

    /// Remove a user from the store's member set.
    ///
    /// A no-op while the registry still shows a live connection of this
    /// user to this store - a user must not vanish from a room their other
    /// tab still occupies. Empty rooms are dropped.
    pub async fn leave(&self, store_id: &StoreId, user_id: &UserId) {
        // The view is held across the mutation: a reconnect committing
        // between the check and the removal would otherwise evict a user
        // whose new connection is live.
        let registry = self.registry.view().await;
        if registry.has_connection_to_store(user_id, store_id) {
            return;
        }

        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(store_id) {
            members.remove(user_id);
            if members.is_empty() {
                rooms.remove(store_id);
            }
        }
    }

    /// Deliver to every connection of every member of the store room.
    ///
    /// An unknown or empty store is a silent no-op. Returns the number of
    /// connections the message was queued to.
    pub async fn broadcast_to_store(&self, store_id: &StoreId, message: OutboundMessage) -> usize {
        let members: Vec<UserId> = {
            self.rooms
                .read()
                .await
                .get(store_id)
                .map(|set| set.iter().cloned().collect())
                .unwrap_or_default()
        };

        let mut targets = Vec::new();
        for user_id in &members {
            targets.extend(self.registry.senders_for_user(user_id).await);
        }
        self.deliver(targets, message).await
    }

    /// Deliver to every connection of one user, regardless of store.
    pub async fn broadcast_to_user(&self, user_id: &UserId, message: OutboundMessage) -> usize {
        let targets = self.registry.senders_for_user(user_id).await;
        self.deliver(targets, message).await
    }

    /// Deliver to every registered connection.
    pub async fn broadcast_to_all(&self, message: OutboundMessage) -> usize {
        let targets = self.registry.all_senders().await;
        self.deliver(targets, message).await
    }

    /// Members of a store room (empty set for unknown stores).
    pub async fn members(&self, store_id: &StoreId) -> HashSet<UserId> {
        self.rooms
            .read()
            .await
            .get(store_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Count of non-empty rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Queue a message to each target connection.
    ///
    /// A failed send means the connection's task is gone; that connection
    /// is torn down as if it had disconnected. One dead connection never
    /// aborts delivery to the rest.
    async fn deliver(
        &self,
        targets: Vec<(ConnectionId, CommandSender)>,
        message: OutboundMessage,
    ) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, sender) in targets {
            match sender.send(SocketCommand::Deliver(message.clone())) {
                Ok(()) => delivered += 1,
                Err(_) => dead.push(id),
            }
        }

        for id in dead {
            self.reap(id).await;
        }

        delivered
    }

    /// Tear down registry and room state for a connection whose transport
    /// task is no longer consuming commands.
    async fn reap(&self, id: ConnectionId) {
        if let Some(removed) = self.registry.unregister(id).await {
            tracing::debug!(
                connection = %id,
                user = %removed.identity.user_id,
                "reaped dead connection during broadcast"
            );
            self.leave(&removed.identity.store_id, &removed.identity.user_id)
                .await;
        }
    }
}
