//! Storeline Notify - real-time notification and presence service.
//!
//! This crate is the companion socket service of the Storeline ERP backend.
//! It authenticates WebSocket connections, groups them into per-store rooms,
//! and fans out events arriving on a shared Redis pub/sub channel to the
//! matching live connections.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
