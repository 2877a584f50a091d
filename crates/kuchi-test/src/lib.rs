//! kuchi Test Harness
//!
//! This crate provides:
//! - Scripted spectrum sources driven by energy sequences
//! - Audio fixtures: tones, synthetic speech, in-memory WAV
//! - A rig wiring a director to an in-memory scene
//! - Scenario tests across slots, sessions and blink loops

pub mod fixtures;
pub mod rig;
pub mod script;
pub mod integration;

pub use fixtures::*;
pub use rig::*;
pub use script::*;
