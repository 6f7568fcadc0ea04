//! Connection lifecycle state machine.
//!
//! Each socket moves through handshake, authentication, active service and
//! teardown. `Rejected` is reachable only from `Authenticating`; registry
//! mutations happen only on the `Authenticating -> Active` and
//! `Closing -> Closed` edges.

use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle state of one socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport handshake in progress.
    Connecting,
    /// Handshake complete, credential token being verified.
    Authenticating,
    /// Registered and receiving deliveries.
    Active,
    /// Close observed or forced; registry teardown pending.
    Closing,
    /// Terminal: fully torn down.
    Closed,
    /// Terminal path for failed authentication; no registry mutation occurred.
    Rejected,
}

impl StateMachine for ConnectionState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ConnectionState::*;
        matches!(
            (self, target),
            (Connecting, Authenticating)
                | (Authenticating, Active)
                | (Authenticating, Rejected)
                | (Active, Closing)
                | (Closing, Closed)
                | (Rejected, Closed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ConnectionState::*;
        match self {
            Connecting => vec![Authenticating],
            Authenticating => vec![Active, Rejected],
            Active => vec![Closing],
            Closing => vec![Closed],
            Rejected => vec![Closed],
            Closed => vec![],
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Active => "active",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
            ConnectionState::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle_is_valid() {
        let state = ConnectionState::Connecting
            .transition_to(ConnectionState::Authenticating)
            .and_then(|s| s.transition_to(ConnectionState::Active))
            .and_then(|s| s.transition_to(ConnectionState::Closing))
            .and_then(|s| s.transition_to(ConnectionState::Closed));
        assert_eq!(state, Ok(ConnectionState::Closed));
    }

    #[test]
    fn rejected_is_only_reachable_from_authenticating() {
        assert!(ConnectionState::Authenticating.can_transition_to(&ConnectionState::Rejected));
        assert!(!ConnectionState::Connecting.can_transition_to(&ConnectionState::Rejected));
        assert!(!ConnectionState::Active.can_transition_to(&ConnectionState::Rejected));
    }

    #[test]
    fn rejected_terminates_without_registry_states() {
        assert_eq!(
            ConnectionState::Rejected.valid_transitions(),
            vec![ConnectionState::Closed]
        );
    }

    #[test]
    fn closed_is_terminal() {
        assert!(ConnectionState::Closed.is_terminal());
        assert!(!ConnectionState::Closing.is_terminal());
    }

    #[test]
    fn cannot_skip_authentication() {
        assert!(ConnectionState::Connecting
            .transition_to(ConnectionState::Active)
            .is_err());
    }
}
