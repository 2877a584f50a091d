//! Identity types for kuchi
//!
//! Voice ids come from the speaker catalog; session and element ids are
//! generated locally and only ever compared for equality.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Synthetic voice identity - provider style id
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(pub u32);

impl VoiceId {
    #[inline]
    pub fn new(id: u32) -> Self {
        VoiceId(id)
    }
}

impl fmt::Debug for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Voice({})", self.0)
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Playback session identity - one continuous play-through of an utterance
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SessionId(pub u64);

impl SessionId {
    pub const ZERO: SessionId = SessionId(0);

    #[inline]
    pub fn new(id: u64) -> Self {
        SessionId(id)
    }

    #[inline]
    pub fn next(self) -> Self {
        SessionId(self.0.wrapping_add(1))
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mount generation of a character element.
///
/// Every mount produces a fresh id, so a timer holding an old id can tell
/// that its element has been replaced.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ElementId(pub u64);

impl ElementId {
    #[inline]
    pub fn new(id: u64) -> Self {
        ElementId(id)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Element({})", self.0)
    }
}

/// One of the two fixed on-screen character positions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CharacterSlot {
    /// Left position, speaker A
    A,
    /// Right position, speaker B
    B,
}

impl CharacterSlot {
    pub const ALL: [CharacterSlot; 2] = [CharacterSlot::A, CharacterSlot::B];

    /// Position name used by the surrounding page
    pub fn side(self) -> &'static str {
        match self {
            CharacterSlot::A => "left",
            CharacterSlot::B => "right",
        }
    }

    #[inline]
    pub fn index(self) -> usize {
        match self {
            CharacterSlot::A => 0,
            CharacterSlot::B => 1,
        }
    }

    pub fn other(self) -> Self {
        match self {
            CharacterSlot::A => CharacterSlot::B,
            CharacterSlot::B => CharacterSlot::A,
        }
    }

    /// Parse from "a"/"b"/"left"/"right" (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "a" | "left" => Some(CharacterSlot::A),
            "b" | "right" => Some(CharacterSlot::B),
            _ => None,
        }
    }
}

impl fmt::Display for CharacterSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.side())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_parse() {
        assert_eq!(CharacterSlot::parse("A"), Some(CharacterSlot::A));
        assert_eq!(CharacterSlot::parse("right"), Some(CharacterSlot::B));
        assert_eq!(CharacterSlot::parse("middle"), None);
    }

    #[test]
    fn test_slot_other_and_index() {
        assert_eq!(CharacterSlot::A.other(), CharacterSlot::B);
        assert_eq!(CharacterSlot::B.index(), 1);
        assert_eq!(CharacterSlot::A.to_string(), "left");
    }

    #[test]
    fn test_session_id_next() {
        assert_eq!(SessionId::ZERO.next(), SessionId(1));
    }
}
