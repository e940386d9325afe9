//! Browser-side client for a server-managed virtual waiting queue.
//!
//! A page calls `init` once; the SDK joins the queue, blocks the page with an
//! overlay while the client is WAITING, keeps a realtime channel with
//! heartbeats while ACTIVE, and tears everything down on EMPTY/EXPIRED,
//! explicit `disconnect`, or page exit.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`net`] | Wire types, REST backend, realtime channel |
//! | [`state`] | Status machine, listener registry, timers, session lifecycle |
//! | [`util`] | Overlay, navigation guard, storage, clock, cadence math, locale |
//! | [`config`] | `QueueConfig` defaults, validation, JSON parsing |
//! | [`sdk`] | `Waitroom` facade and single-session policy |
//! | `browser` | wasm-bindgen exports (feature `browser`) |
//!
//! Everything outside `browser` and the `browser`-gated collaborator impls
//! builds natively and is tested against in-memory fakes.

pub mod config;
pub mod net;
pub mod sdk;
pub mod state;
pub mod util;

#[cfg(feature = "browser")]
pub mod browser;

#[cfg(test)]
#[path = "fakes_test.rs"]
pub(crate) mod fakes;

pub use config::{ConfigError, QueueConfig};
pub use net::types::{QueueState, QueueStatus};
pub use sdk::{InitError, QueueHandle, Waitroom};
pub use state::session::{Env, QueueSession, Utilities};
