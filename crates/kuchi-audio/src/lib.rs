//! kuchi Audio - the audio half of lip-sync
//!
//! Audio comes in as a URL or bytes, is decoded into a mono sample buffer,
//! and is played through a small graph:
//!
//! ```text
//! SampleBuffer → playhead ─┬→ output device
//!                          └→ frequency analyser → SpectrumSnapshot
//! ```
//!
//! The analyser reads the window of samples under the playhead, so snapshots
//! track what is audible without tapping the device stream.

pub mod buffer;
pub mod context;
pub mod decode;
pub mod loader;
pub mod analyser;
pub mod graph;
pub mod output;
pub mod synthesis;

pub use buffer::*;
pub use context::*;
pub use decode::*;
pub use loader::*;
pub use analyser::*;
pub use graph::*;
pub use output::*;
pub use synthesis::*;
