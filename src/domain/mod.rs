//! Domain layer: identity, event model, and connection lifecycle.

pub mod foundation;
pub mod notification;
