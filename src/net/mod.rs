//! Networking modules for the queue backend.
//!
//! SYSTEM CONTEXT
//! ==============
//! `api` handles the join/status/leave REST calls, `channel` abstracts the
//! realtime duplex channel, and `types` defines the shared wire schema.

pub mod api;
pub mod channel;
pub mod types;
