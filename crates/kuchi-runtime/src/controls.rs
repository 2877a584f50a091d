//! Control gate - the busy signal
//!
//! Playback-triggering controls are disabled while a session runs. With
//! `ControlScope::Global` any running session disables every control; with
//! `ControlScope::PerSlot` only the playing slot's controls go dark.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use kuchi_core::{CharacterSlot, ControlScope};
use kuchi_visual::{CharacterSurface, ControlTarget};

struct GateState {
    active: [usize; 2],
}

struct GateInner {
    scope: ControlScope,
    surface: Arc<dyn CharacterSurface>,
    state: Mutex<GateState>,
    busy: [watch::Sender<bool>; 2],
}

/// Shared between every session of a director
#[derive(Clone)]
pub struct ControlGate {
    inner: Arc<GateInner>,
}

impl ControlGate {
    pub fn new(scope: ControlScope, surface: Arc<dyn CharacterSurface>) -> Self {
        Self {
            inner: Arc::new(GateInner {
                scope,
                surface,
                state: Mutex::new(GateState { active: [0; 2] }),
                busy: [watch::channel(false).0, watch::channel(false).0],
            }),
        }
    }

    pub fn scope(&self) -> ControlScope {
        self.inner.scope
    }

    /// Disable controls for a session on `slot` until the lease drops
    pub fn acquire(&self, slot: CharacterSlot) -> ControlLease {
        let mut state = self.inner.state.lock();
        state.active[slot.index()] += 1;
        self.publish(&state);
        ControlLease {
            gate: self.clone(),
            slot,
            released: false,
        }
    }

    /// Follows whether `slot`'s controls are disabled
    pub fn busy(&self, slot: CharacterSlot) -> watch::Receiver<bool> {
        self.inner.busy[slot.index()].subscribe()
    }

    pub fn is_busy(&self, slot: CharacterSlot) -> bool {
        *self.inner.busy[slot.index()].borrow()
    }

    fn release(&self, slot: CharacterSlot) {
        let mut state = self.inner.state.lock();
        let count = &mut state.active[slot.index()];
        *count = count.saturating_sub(1);
        self.publish(&state);
    }

    fn publish(&self, state: &GateState) {
        let any = state.active.iter().any(|&n| n > 0);
        match self.inner.scope {
            ControlScope::Global => {
                self.inner.surface.set_controls_enabled(ControlTarget::All, !any);
                for sender in &self.inner.busy {
                    sender.send_if_modified(|busy| std::mem::replace(busy, any) != any);
                }
            }
            ControlScope::PerSlot => {
                for slot in CharacterSlot::ALL {
                    let busy = state.active[slot.index()] > 0;
                    self.inner
                        .surface
                        .set_controls_enabled(ControlTarget::Slot(slot), !busy);
                    self.inner.busy[slot.index()]
                        .send_if_modified(|b| std::mem::replace(b, busy) != busy);
                }
            }
        }
    }
}

/// Re-enables controls on release or drop
pub struct ControlLease {
    gate: ControlGate,
    slot: CharacterSlot,
    released: bool,
}

impl ControlLease {
    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if !self.released {
            self.released = true;
            self.gate.release(self.slot);
        }
    }
}

impl Drop for ControlLease {
    fn drop(&mut self) {
        self.release_inner();
    }
}
