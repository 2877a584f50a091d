//! Scene Surface - in-memory character surface
//!
//! Keeps the current sprites per slot plus a bounded log of recent writes.
//! Used headless by the demo binary and by tests that assert on what was
//! drawn.

use std::collections::VecDeque;

use parking_lot::Mutex;

use kuchi_core::{CharacterFamily, CharacterSlot, ElementId};

use crate::{AssetPaths, CharacterSurface, ControlTarget, EyeState, MountedCharacter, MouthState, SpriteRef};

/// Writes kept by [`SceneSurface::new`]
pub const DEFAULT_LOG_CAPACITY: usize = 4096;

/// Which node of an element was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpriteNode {
    Mouth,
    Eyes,
}

/// One accepted sprite write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteWrite {
    pub slot: CharacterSlot,
    pub element: ElementId,
    pub node: SpriteNode,
    pub sprite: SpriteRef,
}

/// Sprites currently showing on one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotView {
    pub character: MountedCharacter,
    pub mouth: SpriteRef,
    pub eyes: SpriteRef,
}

#[derive(Debug, Default)]
struct SceneInner {
    next_element: u64,
    slots: [Option<SlotView>; 2],
    log: VecDeque<SpriteWrite>,
    log_capacity: usize,
    rejected: usize,
    all_enabled: bool,
    slot_enabled: [bool; 2],
}

/// In-memory [`CharacterSurface`]
#[derive(Debug)]
pub struct SceneSurface {
    paths: AssetPaths,
    inner: Mutex<SceneInner>,
}

impl SceneSurface {
    pub fn new(paths: AssetPaths) -> Self {
        Self {
            paths,
            inner: Mutex::new(SceneInner {
                log_capacity: DEFAULT_LOG_CAPACITY,
                all_enabled: true,
                slot_enabled: [true; 2],
                ..SceneInner::default()
            }),
        }
    }

    /// Keep at most `capacity` writes, oldest dropped first. Zero disables
    /// the log; current sprites are tracked either way.
    pub fn with_log_capacity(self, capacity: usize) -> Self {
        {
            let mut inner = self.inner.lock();
            inner.log_capacity = capacity;
            let excess = inner.log.len().saturating_sub(capacity);
            inner.log.drain(..excess);
        }
        self
    }

    pub fn view(&self, slot: CharacterSlot) -> Option<SlotView> {
        self.inner.lock().slots[slot.index()].clone()
    }

    pub fn mouth(&self, slot: CharacterSlot) -> Option<SpriteRef> {
        self.view(slot).map(|v| v.mouth)
    }

    pub fn eyes(&self, slot: CharacterSlot) -> Option<SpriteRef> {
        self.view(slot).map(|v| v.eyes)
    }

    /// Copy of the retained writes, oldest first
    pub fn writes(&self) -> Vec<SpriteWrite> {
        self.inner.lock().log.iter().cloned().collect()
    }

    /// Accepted writes for one slot and node
    pub fn writes_for(&self, slot: CharacterSlot, node: SpriteNode) -> Vec<SpriteRef> {
        self.inner
            .lock()
            .log
            .iter()
            .filter(|w| w.slot == slot && w.node == node)
            .map(|w| w.sprite.clone())
            .collect()
    }

    /// Writes dropped because their element was stale
    pub fn rejected_writes(&self) -> usize {
        self.inner.lock().rejected
    }

    pub fn clear_log(&self) {
        self.inner.lock().log.clear();
    }

    /// A slot's controls are usable only when neither toggle disables them
    pub fn controls_enabled(&self, slot: CharacterSlot) -> bool {
        let inner = self.inner.lock();
        inner.all_enabled && inner.slot_enabled[slot.index()]
    }

    fn write(&self, slot: CharacterSlot, element: ElementId, node: SpriteNode, sprite: &SpriteRef) -> bool {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let view = match inner.slots[slot.index()].as_mut() {
            Some(view) if view.character.element == element => view,
            _ => {
                inner.rejected += 1;
                tracing::trace!(%slot, ?element, ?node, "dropped write to stale element");
                return false;
            }
        };
        match node {
            SpriteNode::Mouth => view.mouth = sprite.clone(),
            SpriteNode::Eyes => view.eyes = sprite.clone(),
        }
        if inner.log_capacity > 0 {
            if inner.log.len() == inner.log_capacity {
                inner.log.pop_front();
            }
            inner.log.push_back(SpriteWrite {
                slot,
                element,
                node,
                sprite: sprite.clone(),
            });
        }
        true
    }
}

impl Default for SceneSurface {
    fn default() -> Self {
        Self::new(AssetPaths::default())
    }
}

impl CharacterSurface for SceneSurface {
    fn mount(&self, slot: CharacterSlot, family: CharacterFamily) -> ElementId {
        let mut inner = self.inner.lock();
        inner.next_element += 1;
        let element = ElementId::new(inner.next_element);
        inner.slots[slot.index()] = Some(SlotView {
            character: MountedCharacter { element, family },
            mouth: self.paths.mouth(family, MouthState::Closed),
            eyes: self.paths.eyes(family, EyeState::Open),
        });
        tracing::debug!(%slot, %family, ?element, "character mounted");
        element
    }

    fn unmount(&self, slot: CharacterSlot) {
        if let Some(view) = self.inner.lock().slots[slot.index()].take() {
            tracing::debug!(%slot, element = ?view.character.element, "character unmounted");
        }
    }

    fn mounted(&self, slot: CharacterSlot) -> Option<MountedCharacter> {
        self.inner.lock().slots[slot.index()].as_ref().map(|v| v.character)
    }

    fn set_mouth(&self, slot: CharacterSlot, element: ElementId, sprite: &SpriteRef) -> bool {
        self.write(slot, element, SpriteNode::Mouth, sprite)
    }

    fn set_eyes(&self, slot: CharacterSlot, element: ElementId, sprite: &SpriteRef) -> bool {
        self.write(slot, element, SpriteNode::Eyes, sprite)
    }

    fn set_controls_enabled(&self, target: ControlTarget, enabled: bool) {
        let mut inner = self.inner.lock();
        match target {
            ControlTarget::All => inner.all_enabled = enabled,
            ControlTarget::Slot(slot) => inner.slot_enabled[slot.index()] = enabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_shows_resting_face() {
        let scene = SceneSurface::default();
        scene.mount(CharacterSlot::A, CharacterFamily::Metan);

        assert_eq!(
            scene.mouth(CharacterSlot::A).unwrap().as_str(),
            "/static/assets/metan_mouse_close.png"
        );
        assert_eq!(
            scene.eyes(CharacterSlot::A).unwrap().as_str(),
            "/static/assets/metan_eye_open.png"
        );
        assert!(scene.view(CharacterSlot::B).is_none());
    }

    #[test]
    fn test_stale_element_write_dropped() {
        let scene = SceneSurface::default();
        let paths = AssetPaths::default();
        let old = scene.mount(CharacterSlot::B, CharacterFamily::Zundamon);
        let new = scene.mount(CharacterSlot::B, CharacterFamily::Hau);
        assert_ne!(old, new);

        let sprite = paths.mouth(CharacterFamily::Zundamon, MouthState::Open);
        assert!(!scene.set_mouth(CharacterSlot::B, old, &sprite));
        assert_eq!(scene.rejected_writes(), 1);
        assert_eq!(
            scene.mouth(CharacterSlot::B).unwrap(),
            paths.mouth(CharacterFamily::Hau, MouthState::Closed)
        );

        let sprite = paths.mouth(CharacterFamily::Hau, MouthState::Open);
        assert!(scene.set_mouth(CharacterSlot::B, new, &sprite));
        assert_eq!(scene.writes_for(CharacterSlot::B, SpriteNode::Mouth), vec![sprite]);
    }

    #[test]
    fn test_unmount_rejects_writes() {
        let scene = SceneSurface::default();
        let element = scene.mount(CharacterSlot::A, CharacterFamily::Ritsu);
        scene.unmount(CharacterSlot::A);
        assert!(!scene.is_mounted(CharacterSlot::A, element));
        let sprite = AssetPaths::default().eyes(CharacterFamily::Ritsu, EyeState::Closed);
        assert!(!scene.set_eyes(CharacterSlot::A, element, &sprite));
    }

    #[test]
    fn test_control_toggles() {
        let scene = SceneSurface::default();
        assert!(scene.controls_enabled(CharacterSlot::A));

        scene.set_controls_enabled(ControlTarget::Slot(CharacterSlot::A), false);
        assert!(!scene.controls_enabled(CharacterSlot::A));
        assert!(scene.controls_enabled(CharacterSlot::B));

        scene.set_controls_enabled(ControlTarget::All, false);
        assert!(!scene.controls_enabled(CharacterSlot::B));
        scene.set_controls_enabled(ControlTarget::All, true);
        scene.set_controls_enabled(ControlTarget::Slot(CharacterSlot::A), true);
        assert!(scene.controls_enabled(CharacterSlot::A));
    }

    #[test]
    fn test_log_keeps_most_recent_writes() {
        let paths = AssetPaths::default();
        let scene = SceneSurface::new(paths.clone()).with_log_capacity(3);
        let element = scene.mount(CharacterSlot::A, CharacterFamily::Ritsu);

        for state in MouthState::ALL {
            assert!(scene.set_mouth(CharacterSlot::A, element, &paths.mouth(CharacterFamily::Ritsu, state)));
        }

        let kept: Vec<_> = MouthState::ALL[1..]
            .iter()
            .map(|&s| paths.mouth(CharacterFamily::Ritsu, s))
            .collect();
        assert_eq!(scene.writes_for(CharacterSlot::A, SpriteNode::Mouth), kept);
        assert_eq!(
            scene.mouth(CharacterSlot::A).unwrap(),
            paths.mouth(CharacterFamily::Ritsu, MouthState::Open)
        );
    }

    #[test]
    fn test_zero_capacity_disables_log() {
        let paths = AssetPaths::default();
        let scene = SceneSurface::new(paths.clone()).with_log_capacity(0);
        let element = scene.mount(CharacterSlot::B, CharacterFamily::Hau);

        assert!(scene.set_eyes(CharacterSlot::B, element, &paths.eyes(CharacterFamily::Hau, EyeState::Closed)));
        assert!(scene.writes().is_empty());
        assert_eq!(
            scene.eyes(CharacterSlot::B).unwrap(),
            paths.eyes(CharacterFamily::Hau, EyeState::Closed)
        );
    }
}
