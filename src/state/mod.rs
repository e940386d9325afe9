//! Session state: status machine, observers, timers, and the lifecycle that
//! ties them to the network and the page.
//!
//! SYSTEM CONTEXT
//! ==============
//! `machine` decides, `session` executes. `registry` and `timers` are the
//! session-owned collections the executed effects touch.

pub mod machine;
pub mod registry;
pub mod session;
pub mod timers;
