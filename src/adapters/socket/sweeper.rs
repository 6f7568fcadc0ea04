//! Periodic eviction of idle connections.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::foundation::ConnectionId;

use super::messages::{close_code, SocketCommand};
use super::registry::ConnectionRegistry;

/// Background task that forces idle connections through the normal close
/// path. Each sweep sends a close command; the connection's own task then
/// tears down registry and room state exactly as a client-initiated close
/// would.
pub struct IdleSweeper {
    registry: Arc<ConnectionRegistry>,
    idle_after: Duration,
    interval: Duration,
}

impl IdleSweeper {
    pub fn new(registry: Arc<ConnectionRegistry>, idle_after: Duration, interval: Duration) -> Self {
        Self {
            registry,
            idle_after,
            interval,
        }
    }

    /// Run sweeps for the lifetime of the process.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }

    /// Evict currently idle connections; returns how many were told to close.
    pub async fn sweep(&self) -> usize {
        let idle = self.registry.idle_connections(self.idle_after).await;
        let evicted = idle.len();

        for (id, sender) in idle {
            self.evict(id, &sender);
        }

        if evicted > 0 {
            tracing::debug!(evicted, "idle sweep evicted connections");
        }
        evicted
    }

    fn evict(&self, id: ConnectionId, sender: &super::registry::CommandSender) {
        tracing::debug!(connection = %id, "evicting idle connection");
        // A failed send means the connection task already exited; the next
        // broadcast reaps its state.
        let _ = sender.send(SocketCommand::Close(close_code::IDLE_TIMEOUT));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{Identity, Role, StoreId, UserId};
    use tokio::sync::mpsc;

    fn identity() -> Identity {
        Identity {
            user_id: UserId::new("u1").unwrap(),
            store_id: StoreId::new("s1").unwrap(),
            role: Role::Staff,
        }
    }

    #[tokio::test]
    async fn sweep_sends_close_to_idle_connections_only() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let id = crate::domain::foundation::ConnectionId::new();
        registry.register(id, identity(), tx).await.unwrap();

        let sweeper = IdleSweeper::new(
            registry.clone(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        );

        // Fresh connection: nothing to evict.
        assert_eq!(sweeper.sweep().await, 0);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(sweeper.sweep().await, 1);
        assert_eq!(
            rx.try_recv().unwrap(),
            SocketCommand::Close(close_code::IDLE_TIMEOUT)
        );
    }
}
