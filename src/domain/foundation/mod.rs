//! Foundation value objects shared across the domain.

mod identity;
mod ids;
mod state_machine;
mod timestamp;

pub use identity::{AuthError, Identity, Role};
pub use ids::{ConnectionId, EmptyIdError, StoreId, UserId};
pub use state_machine::{StateMachine, TransitionError};
pub use timestamp::Timestamp;
