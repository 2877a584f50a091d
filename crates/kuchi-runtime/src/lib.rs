//! kuchi Runtime - timers and lifecycles
//!
//! Everything here runs on tokio:
//!
//! - [`LipSyncController`]: fixed-cadence sampling loop, one per session
//! - [`BlinkController`]: initial-delay and interval timers, one per mounted character
//! - [`PlaybackSession`]: load → attach → play → teardown for one utterance
//! - [`Director`]: owns both slots and keeps at most one session per slot
//!
//! Sessions on different slots share nothing mutable. Each session carries
//! its own previous-energy value.

pub mod blink;
pub mod controls;
pub mod director;
pub mod lipsync;
pub mod logging;
pub mod session;
pub mod timers;

pub use blink::*;
pub use controls::*;
pub use director::*;
pub use lipsync::*;
pub use session::*;
pub use timers::*;
