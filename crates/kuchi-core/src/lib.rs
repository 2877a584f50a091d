//! kuchi Core - Fundamental types and primitives
//!
//! This crate defines the types shared by every kuchi crate:
//! - Identifiers (VoiceId, SessionId, ElementId) and the two character slots
//! - The closed set of character families and their voice profiles
//! - The speaker catalog, mapped once from the catalog response
//! - Error taxonomy and configuration

pub mod id;
pub mod character;
pub mod catalog;
pub mod config;
pub mod error;

pub use id::*;
pub use character::*;
pub use catalog::*;
pub use config::*;
pub use error::*;
