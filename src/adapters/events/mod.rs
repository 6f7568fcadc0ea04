//! Event bus adapters backed by Redis pub/sub.

mod bridge;
mod publisher;

pub use bridge::EventBridge;
pub use publisher::RedisEventPublisher;
