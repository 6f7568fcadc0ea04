//! WebSocket presence core: connection registry, store rooms, and the
//! per-connection lifecycle handler.
//!
//! # Architecture
//!
//! ```text
//! Room: store-17        Room: store-42
//! ├── user-a (c1, c2)   ├── user-c (c4)
//! └── user-b (c3)       └── user-d (c5)
//! ```
//!
//! The registry owns connection and session state; rooms are derived from
//! it incrementally on every mutation, never recomputed by scanning.

mod handler;
mod messages;
mod registry;
mod rooms;
mod sweeper;

pub use handler::{ws_handler, ConnectQuery};
pub use messages::{close_code, ClientMessage, OutboundMessage, SocketCommand};
pub use registry::{
    CommandSender, ConnectionRegistry, Registered, RegistryError, Unregistered,
};
pub use rooms::RoomManager;
pub use sweeper::IdleSweeper;
