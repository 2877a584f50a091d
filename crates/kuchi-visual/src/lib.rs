//! kuchi Visual - what the characters look like
//!
//! Mouth and eye state as sprite choices, not pixels.
//!
//! # Mouth ladder
//!
//! Each sampling tick compares the vocal-range energy against the previous
//! tick:
//!
//! - rising energy → `Open`
//! - falling by less than 250 → `OpenMid`
//! - falling by less than 500 → `CloseMid`
//! - anything steeper → `Closed`
//!
//! The sprites themselves live on a [`CharacterSurface`]; [`SceneSurface`]
//! keeps them in memory.

pub mod blink;
pub mod mouth;
pub mod scene;
pub mod sprites;
pub mod surface;

pub use blink::*;
pub use mouth::*;
pub use scene::*;
pub use sprites::*;
pub use surface::*;
