//! Host-facing helpers: overlay, navigation guard, storage, timers, locale.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each module pairs a small trait (the seam the session calls through) with
//! an in-memory or pure implementation and a `browser`-feature one.

pub mod clock;
pub mod guard;
pub mod interval;
pub mod locale;
pub mod overlay;
pub mod storage;
