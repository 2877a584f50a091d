//! Slot director
//!
//! Owns both character slots. Each slot has at most one assigned voice, one
//! mounted character, one blink loop and one playback session. Slots share
//! nothing mutable beyond the control gate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio::sync::watch;

use kuchi_audio::{AudioOutput, AudioSource, AudioSourceLoader, ContextPool, SpectrumSampler};
use kuchi_core::{
    CharacterFamily, CharacterSlot, ElementId, KuchiConfig, KuchiError, KuchiResult, SessionId,
    SpeakerCatalog, VoiceId,
};
use kuchi_visual::{AssetPaths, BlinkTable, CharacterSurface};

use crate::{
    BlinkController, ControlGate, LipSyncStats, PlaybackReport, PlaybackSession, PlaybackStatus,
    SessionDeps, SessionHandle, TimerGauge,
};

/// Live timer tasks of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotTimers {
    pub lipsync: usize,
    pub blink: usize,
}

struct SlotState {
    voice: Option<VoiceId>,
    blink: BlinkController,
    session: Option<SessionHandle>,
}

struct DirectorInner {
    catalog: SpeakerCatalog,
    surface: Arc<dyn CharacterSurface>,
    pool: ContextPool,
    deps: [SessionDeps; 2],
    blink_table: BlinkTable,
    blink_timers: [TimerGauge; 2],
    next_session: AtomicU64,
    slots: [Mutex<SlotState>; 2],
}

/// Entry point for the surrounding application
#[derive(Clone)]
pub struct Director {
    inner: Arc<DirectorInner>,
}

impl Director {
    /// Validates `config` and wires loader, sampler, gate and blink table
    pub fn new(
        config: &KuchiConfig,
        catalog: SpeakerCatalog,
        surface: Arc<dyn CharacterSurface>,
        output: Arc<dyn AudioOutput>,
    ) -> KuchiResult<Self> {
        config.validate()?;

        let pool = ContextPool::new();
        let paths = AssetPaths::from(&config.assets);
        let blink_table = BlinkTable::new(paths.clone()).with_overrides(&config.blink_overrides)?;
        let controls = ControlGate::new(config.controls, Arc::clone(&surface));
        let deps = SessionDeps {
            loader: AudioSourceLoader::new(pool.clone()),
            sampler: SpectrumSampler::from_config(&config.lipsync, output),
            surface: Arc::clone(&surface),
            paths,
            controls,
            sample_interval: config.lipsync.sample_interval,
            lipsync_timers: TimerGauge::new(),
        };
        let deps_b = SessionDeps {
            lipsync_timers: TimerGauge::new(),
            ..deps.clone()
        };

        let blink_timers = [TimerGauge::new(), TimerGauge::new()];
        let slot_state = |slot: CharacterSlot| {
            Mutex::new(SlotState {
                voice: None,
                blink: BlinkController::new(slot, Arc::clone(&surface))
                    .with_gauge(blink_timers[slot.index()].clone()),
                session: None,
            })
        };
        let slots = [slot_state(CharacterSlot::A), slot_state(CharacterSlot::B)];

        tracing::info!(
            voices = catalog.len(),
            scope = ?config.controls,
            interval = ?config.lipsync.sample_interval,
            "director ready"
        );

        Ok(Self {
            inner: Arc::new(DirectorInner {
                catalog,
                surface,
                pool,
                deps: [deps, deps_b],
                blink_table,
                blink_timers,
                next_session: AtomicU64::new(1),
                slots,
            }),
        })
    }

    /// Seed both blink loops
    pub fn with_blink_seed(self, seed: u64) -> Self {
        for slot in CharacterSlot::ALL {
            let mut state = self.inner.slots[slot.index()].lock();
            let blink = BlinkController::new(slot, Arc::clone(&self.inner.surface))
                .with_gauge(self.inner.blink_timers[slot.index()].clone())
                .with_seed(seed.wrapping_add(slot.index() as u64));
            state.blink = blink;
        }
        self
    }

    pub fn catalog(&self) -> &SpeakerCatalog {
        &self.inner.catalog
    }

    pub fn surface(&self) -> &Arc<dyn CharacterSurface> {
        &self.inner.surface
    }

    /// Decoding contexts, for leak checks
    pub fn contexts(&self) -> &ContextPool {
        &self.inner.pool
    }

    pub fn assigned(&self, slot: CharacterSlot) -> Option<VoiceId> {
        self.inner.slots[slot.index()].lock().voice
    }

    pub fn timers(&self, slot: CharacterSlot) -> SlotTimers {
        SlotTimers {
            lipsync: self.inner.deps[slot.index()].lipsync_timers.active(),
            blink: self.inner.blink_timers[slot.index()].active(),
        }
    }

    pub fn is_blinking(&self, slot: CharacterSlot) -> bool {
        self.inner.slots[slot.index()].lock().blink.is_active()
    }

    /// Follows whether `slot`'s playback controls are disabled
    pub fn busy(&self, slot: CharacterSlot) -> watch::Receiver<bool> {
        self.inner.deps[slot.index()].controls.busy(slot)
    }

    /// Put a voice's character in a slot.
    ///
    /// Tears down the slot's session and blink loop first. Voices without a
    /// sprite set leave the slot empty. Returns the new element, if any.
    pub async fn assign(&self, slot: CharacterSlot, voice: VoiceId) -> KuchiResult<Option<ElementId>> {
        if !self.inner.catalog.contains(voice) {
            return Err(KuchiError::UnknownVoice(voice));
        }

        let mut state = self.idle_slot(slot).await;
        let family = self.inner.catalog.family_of(voice);
        state.blink.cleanup();
        state.voice = Some(voice);

        let element = match family {
            Some(family) => Some(self.mount(&mut state, slot, family)),
            None => {
                self.inner.surface.unmount(slot);
                None
            }
        };
        tracing::info!(%slot, %voice, family = ?family, "voice assigned");
        Ok(element)
    }

    fn mount(&self, state: &mut SlotState, slot: CharacterSlot, family: CharacterFamily) -> ElementId {
        let element = self.inner.surface.mount(slot, family);
        state
            .blink
            .attach(element, self.inner.blink_table.profile(family));
        element
    }

    /// Lock a slot with no session registered.
    ///
    /// A play can register while a stop is awaited, so sessions are stopped
    /// until the lock itself shows the slot idle.
    async fn idle_slot(&self, slot: CharacterSlot) -> MutexGuard<'_, SlotState> {
        loop {
            let running = {
                let mut state = self.inner.slots[slot.index()].lock();
                match state.session.take() {
                    Some(running) => running,
                    None => return state,
                }
            };
            tracing::debug!(%slot, session = %running.id(), "stopping session");
            running.stop().await;
        }
    }

    /// Empty a slot
    pub async fn clear(&self, slot: CharacterSlot) {
        let mut state = self.idle_slot(slot).await;
        state.blink.cleanup();
        state.voice = None;
        self.inner.surface.unmount(slot);
        tracing::info!(%slot, "slot cleared");
    }

    /// Play one utterance on a slot with a voice.
    ///
    /// A session already running on the slot is stopped and fully torn
    /// down before this one starts.
    pub async fn play(&self, slot: CharacterSlot, source: AudioSource, voice: VoiceId) -> PlaybackReport {
        let id = SessionId::new(self.inner.next_session.fetch_add(1, Ordering::Relaxed));

        if !self.inner.catalog.contains(voice) {
            tracing::warn!(%slot, %voice, "play with unknown voice");
            return PlaybackReport {
                session: id,
                slot,
                voice,
                status: PlaybackStatus::Failed(KuchiError::UnknownVoice(voice)),
                elapsed: Duration::ZERO,
                lipsync: LipSyncStats::default(),
            };
        }

        let family = self.inner.catalog.family_of(voice);
        let (session, handle) = PlaybackSession::new(
            id,
            slot,
            voice,
            family,
            self.inner.deps[slot.index()].clone(),
        );

        // registered before the previous session is awaited, so a stop
        // arriving during that teardown reaches this session
        let previous = self.inner.slots[slot.index()].lock().session.replace(handle);
        if let Some(previous) = previous {
            tracing::debug!(%slot, previous = %previous.id(), next = %id, "replacing session");
            previous.stop().await;
        }

        let report = session.run(source).await;

        let mut state = self.inner.slots[slot.index()].lock();
        if state.session.as_ref().map(SessionHandle::id) == Some(id) {
            state.session = None;
        }
        report
    }

    /// Stop the slot's session and wait for its teardown.
    /// Returns whether anything was playing.
    pub async fn stop(&self, slot: CharacterSlot) -> bool {
        let handle = self.inner.slots[slot.index()].lock().session.take();
        match handle {
            Some(handle) => {
                tracing::debug!(%slot, session = %handle.id(), "stopping session");
                handle.stop().await;
                true
            }
            None => false,
        }
    }

    /// Stop everything and unmount both characters
    pub async fn shutdown(&self) {
        for slot in CharacterSlot::ALL {
            self.clear(slot).await;
        }
        tracing::info!(contexts = self.inner.pool.live(), "director shut down");
    }
}
