//! Connection registry: the authoritative map of live connections.
//!
//! Owns two maps kept consistent under a single lock:
//!
//! - connection id -> connection entry (identity, outbound sender, activity)
//! - user id -> set of that user's connection ids
//!
//! Every mutation goes through the one `RwLock`, so registry state is
//! linearizable: a reader never observes a connection without its session
//! entry or vice versa. The registry lock is always acquired before the
//! room lock, never after (see `RoomManager` for the lock-ordering
//! contract).

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, RwLock, RwLockReadGuard};

use crate::domain::foundation::{ConnectionId, Identity, StoreId, Timestamp, UserId};

use super::messages::SocketCommand;

/// Sending half of a connection's command queue.
pub type CommandSender = mpsc::UnboundedSender<SocketCommand>;

/// Errors surfaced by registry mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The connection id is already registered - a protocol error; the
    /// offending connection must be closed.
    #[error("connection {0} is already registered")]
    DuplicateConnection(ConnectionId),
}

/// Outcome of a successful `register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registered {
    /// True when this connection created the user's session set, i.e. the
    /// user just came online.
    pub first_session: bool,
}

/// Outcome of a successful `unregister`.
#[derive(Debug, Clone)]
pub struct Unregistered {
    /// Identity the connection was registered under.
    pub identity: Identity,
    /// True when the user's session set became empty and was removed, i.e.
    /// the user went offline.
    pub last_session: bool,
    /// When the connection was registered.
    pub connected_at: Timestamp,
}

struct ConnectionEntry {
    identity: Identity,
    sender: CommandSender,
    connected_at: Timestamp,
    /// Unix seconds of the last observed client activity. Atomic so `touch`
    /// only needs the read lock.
    last_activity: AtomicI64,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    sessions: HashMap<UserId, HashSet<ConnectionId>>,
}

/// Concurrency-safe registry of live connections and user sessions.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<RegistryInner>,
}

/// Read view pinning registry state while it is held.
///
/// While a view is alive no registration or unregistration can commit, so a
/// check through the view and a dependent mutation elsewhere observe the
/// same registry state.
pub struct RegistryView<'a> {
    inner: RwLockReadGuard<'a, RegistryInner>,
}

impl RegistryView<'_> {
    /// Whether the user still holds at least one live connection affiliated
    /// with the given store.
    pub fn has_connection_to_store(&self, user_id: &UserId, store_id: &StoreId) -> bool {
        self.inner.sessions.get(user_id).is_some_and(|set| {
            set.iter().any(|id| {
                self.inner
                    .connections
                    .get(id)
                    .is_some_and(|entry| &entry.identity.store_id == store_id)
            })
        })
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a connection under its user's session set.
    ///
    /// Registering an id that is already present is a `DuplicateConnection`
    /// error and leaves the registry unchanged.
    pub async fn register(
        &self,
        id: ConnectionId,
        identity: Identity,
        sender: CommandSender,
    ) -> Result<Registered, RegistryError> {
        let mut inner = self.inner.write().await;

        if inner.connections.contains_key(&id) {
            return Err(RegistryError::DuplicateConnection(id));
        }

        let first_session = !inner.sessions.contains_key(&identity.user_id);
        inner
            .sessions
            .entry(identity.user_id.clone())
            .or_default()
            .insert(id);

        let now = Timestamp::now();
        inner.connections.insert(
            id,
            ConnectionEntry {
                identity,
                sender,
                connected_at: now,
                last_activity: AtomicI64::new(now.as_unix_secs()),
            },
        );

        Ok(Registered { first_session })
    }

    /// Remove a connection from its user's session set.
    ///
    /// Returns `None` for an unknown id - a benign no-op, not an error.
    /// When the session set becomes empty the user entry is removed
    /// entirely and `last_session` is reported.
    pub async fn unregister(&self, id: ConnectionId) -> Option<Unregistered> {
        let mut inner = self.inner.write().await;

        let entry = inner.connections.remove(&id)?;
        let user_id = entry.identity.user_id.clone();

        let now_empty = match inner.sessions.get_mut(&user_id) {
            Some(set) => {
                set.remove(&id);
                set.is_empty()
            }
            None => false,
        };
        if now_empty {
            inner.sessions.remove(&user_id);
        }

        Some(Unregistered {
            identity: entry.identity,
            last_session: now_empty,
            connected_at: entry.connected_at,
        })
    }

    /// Snapshot of the user's active connection ids.
    pub async fn connections_of(&self, user_id: &UserId) -> HashSet<ConnectionId> {
        self.inner
            .read()
            .await
            .sessions
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Acquire a read view pinning the current registry state.
    pub async fn view(&self) -> RegistryView<'_> {
        RegistryView {
            inner: self.inner.read().await,
        }
    }

    /// Whether the user still holds at least one live connection affiliated
    /// with the given store.
    pub async fn has_connection_to_store(&self, user_id: &UserId, store_id: &StoreId) -> bool {
        self.view().await.has_connection_to_store(user_id, store_id)
    }

    /// Outbound senders for every connection of one user.
    pub async fn senders_for_user(&self, user_id: &UserId) -> Vec<(ConnectionId, CommandSender)> {
        let inner = self.inner.read().await;
        inner
            .sessions
            .get(user_id)
            .map(|set| {
                set.iter()
                    .filter_map(|id| {
                        inner
                            .connections
                            .get(id)
                            .map(|entry| (*id, entry.sender.clone()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Outbound senders for every registered connection.
    pub async fn all_senders(&self) -> Vec<(ConnectionId, CommandSender)> {
        self.inner
            .read()
            .await
            .connections
            .iter()
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect()
    }

    /// Record client activity on a connection.
    pub async fn touch(&self, id: ConnectionId) {
        if let Some(entry) = self.inner.read().await.connections.get(&id) {
            entry
                .last_activity
                .store(Timestamp::now().as_unix_secs(), Ordering::Relaxed);
        }
    }

    /// Connections with no recorded activity within `idle_after`.
    pub async fn idle_connections(
        &self,
        idle_after: Duration,
    ) -> Vec<(ConnectionId, CommandSender)> {
        let cutoff = Timestamp::now().as_unix_secs() - idle_after.as_secs() as i64;
        self.inner
            .read()
            .await
            .connections
            .iter()
            .filter(|(_, entry)| entry.last_activity.load(Ordering::Relaxed) < cutoff)
            .map(|(id, entry)| (*id, entry.sender.clone()))
            .collect()
    }

    /// Count of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    /// Count of users with at least one connection.
    pub async fn user_count(&self) -> usize {
        self.inner.read().await.sessions.len()
    }
}
