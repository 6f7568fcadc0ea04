//! Adapters - concrete implementations wired to the outside world.

pub mod auth;
pub mod events;
pub mod http;
pub mod socket;
