//! Ports - interfaces the core depends on, implemented by adapters.

mod event_publisher;
mod token_verifier;

pub use event_publisher::{EventPublisher, PublishError};
pub use token_verifier::TokenVerifier;
