//! State machine trait for lifecycle status enums.
//!
//! Provides a consistent interface for validating and performing state
//! transitions. Implementors define the valid transitions and get a
//! validated `transition_to` for free.

use thiserror::Error;

/// Error raised when a transition violates the state machine rules.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition from {from} to {to}")]
pub struct TransitionError {
    pub from: String,
    pub to: String,
}

/// Trait for status enums that represent state machines.
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from the current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Performs the transition with validation.
    fn transition_to(&self, target: Self) -> Result<Self, TransitionError> {
        if self.can_transition_to(&target) {
            Ok(target)
        } else {
            Err(TransitionError {
                from: format!("{:?}", self),
                to: format!("{:?}", target),
            })
        }
    }

    /// Checks if the current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Phase {
        Open,
        Draining,
        Shut,
    }

    impl StateMachine for Phase {
        fn can_transition_to(&self, target: &Self) -> bool {
            matches!(
                (self, target),
                (Phase::Open, Phase::Draining) | (Phase::Draining, Phase::Shut)
            )
        }

        fn valid_transitions(&self) -> Vec<Self> {
            match self {
                Phase::Open => vec![Phase::Draining],
                Phase::Draining => vec![Phase::Shut],
                Phase::Shut => vec![],
            }
        }
    }

    #[test]
    fn valid_transition_succeeds() {
        assert_eq!(Phase::Open.transition_to(Phase::Draining), Ok(Phase::Draining));
    }

    #[test]
    fn invalid_transition_reports_both_states() {
        let err = Phase::Open.transition_to(Phase::Shut).unwrap_err();
        assert_eq!(err.from, "Open");
        assert_eq!(err.to, "Shut");
    }

    #[test]
    fn terminal_state_has_no_transitions() {
        assert!(Phase::Shut.is_terminal());
        assert!(!Phase::Open.is_terminal());
    }
}
