//! Character surface - where sprites are written
//!
//! The surface owns the character elements. Each mount gets a fresh
//! [`ElementId`], and writes addressed to an older id are dropped, so a
//! late callback can never paint over the character that replaced it.

use kuchi_core::{CharacterFamily, CharacterSlot, ElementId};

use crate::SpriteRef;

/// Which controls a toggle applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlTarget {
    /// Every playback-triggering control
    All,
    /// Controls belonging to one slot
    Slot(CharacterSlot),
}

/// The character element currently mounted in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountedCharacter {
    pub element: ElementId,
    pub family: CharacterFamily,
}

pub trait CharacterSurface: Send + Sync {
    /// Mount a character, replacing whatever was in the slot
    fn mount(&self, slot: CharacterSlot, family: CharacterFamily) -> ElementId;

    fn unmount(&self, slot: CharacterSlot);

    fn mounted(&self, slot: CharacterSlot) -> Option<MountedCharacter>;

    /// Returns false if `element` is no longer mounted in `slot`
    fn set_mouth(&self, slot: CharacterSlot, element: ElementId, sprite: &SpriteRef) -> bool;

    /// Returns false if `element` is no longer mounted in `slot`
    fn set_eyes(&self, slot: CharacterSlot, element: ElementId, sprite: &SpriteRef) -> bool;

    fn set_controls_enabled(&self, target: ControlTarget, enabled: bool);

    /// Is `element` still the one mounted in `slot`?
    fn is_mounted(&self, slot: CharacterSlot, element: ElementId) -> bool {
        self.mounted(slot).map(|m| m.element) == Some(element)
    }
}
