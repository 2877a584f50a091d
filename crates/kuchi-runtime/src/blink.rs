//! Blink controller
//!
//! Two timers per attached element: a one-shot initial delay and a
//! repeating check that blinks with the family's probability. Every timer
//! callback first checks that its element is still mounted in the slot and
//! cancels the whole run if it is not.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::MissedTickBehavior;

use kuchi_core::{CharacterSlot, ElementId};
use kuchi_visual::{BlinkProfile, CharacterSurface};

use crate::TimerGauge;

/// Eye phase of an attached element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyePhase {
    Open,
    Closed,
}

struct BlinkRun {
    slot: CharacterSlot,
    element: ElementId,
    profile: BlinkProfile,
    surface: Arc<dyn CharacterSurface>,
    rng: Mutex<StdRng>,
    blinking: AtomicBool,
    cancelled: AtomicBool,
    blinks: AtomicU64,
    timers: Mutex<Vec<AbortHandle>>,
}

impl BlinkRun {
    fn still_mounted(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && self.surface.is_mounted(self.slot, self.element)
    }

    /// Stop both timers. Reopens the eyes if a blink was cut short.
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        for timer in self.timers.lock().drain(..) {
            timer.abort();
        }
        if self.blinking.swap(false, Ordering::SeqCst) {
            self.surface
                .set_eyes(self.slot, self.element, &self.profile.open_sprite);
        }
    }

    async fn blink(&self) {
        if !self.still_mounted() {
            tracing::debug!(slot = %self.slot, element = ?self.element, "blink target gone, cancelling");
            self.cancel();
            return;
        }
        if self.blinking.swap(true, Ordering::SeqCst) {
            tracing::trace!(slot = %self.slot, "already blinking");
            return;
        }

        self.surface
            .set_eyes(self.slot, self.element, &self.profile.close_sprite);
        let hold = self.profile.hold(&mut *self.rng.lock());
        tokio::time::sleep(hold).await;

        if self.still_mounted() {
            self.surface
                .set_eyes(self.slot, self.element, &self.profile.open_sprite);
        }
        self.blinking.store(false, Ordering::SeqCst);
        self.blinks.fetch_add(1, Ordering::Relaxed);
    }
}

struct Attached {
    run: Arc<BlinkRun>,
    handles: Vec<JoinHandle<()>>,
}

/// Blink loop for whatever character is mounted in one slot
pub struct BlinkController {
    slot: CharacterSlot,
    surface: Arc<dyn CharacterSurface>,
    rng: StdRng,
    gauge: TimerGauge,
    attached: Option<Attached>,
}

impl BlinkController {
    pub fn new(slot: CharacterSlot, surface: Arc<dyn CharacterSurface>) -> Self {
        Self {
            slot,
            surface,
            rng: StdRng::from_entropy(),
            gauge: TimerGauge::new(),
            attached: None,
        }
    }

    /// Deterministic timing, for tests and replays
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_gauge(mut self, gauge: TimerGauge) -> Self {
        self.gauge = gauge;
        self
    }

    pub fn slot(&self) -> CharacterSlot {
        self.slot
    }

    /// Start blinking `element`. Any previous run is cleaned up first.
    /// Must be called inside a tokio runtime.
    pub fn attach(&mut self, element: ElementId, profile: BlinkProfile) {
        self.cleanup();

        let initial_delay = profile.initial_delay(&mut self.rng);
        let period = profile.interval(&mut self.rng);
        let run = Arc::new(BlinkRun {
            slot: self.slot,
            element,
            profile,
            surface: Arc::clone(&self.surface),
            rng: Mutex::new(StdRng::seed_from_u64(self.rng.gen())),
            blinking: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            blinks: AtomicU64::new(0),
            timers: Mutex::new(Vec::with_capacity(2)),
        });

        let initial = {
            let run = Arc::clone(&run);
            let guard = self.gauge.guard();
            tokio::spawn(async move {
                let _guard = guard;
                tokio::time::sleep(initial_delay).await;
                run.blink().await;
            })
        };

        let repeating = {
            let run = Arc::clone(&run);
            let guard = self.gauge.guard();
            tokio::spawn(async move {
                let _guard = guard;
                let start = tokio::time::Instant::now() + period;
                let mut ticks = tokio::time::interval_at(start, period);
                ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticks.tick().await;
                    if !run.still_mounted() {
                        tracing::debug!(slot = %run.slot, element = ?run.element, "blink target gone, cancelling");
                        run.cancel();
                        break;
                    }
                    let roll = run.profile.should_blink(&mut *run.rng.lock());
                    if roll {
                        run.blink().await;
                    }
                }
            })
        };

        run.timers
            .lock()
            .extend([initial.abort_handle(), repeating.abort_handle()]);

        tracing::debug!(
            slot = %self.slot,
            ?element,
            family = %run.profile.family,
            ?initial_delay,
            ?period,
            "blinking attached"
        );

        self.attached = Some(Attached {
            run,
            handles: vec![initial, repeating],
        });
    }

    /// Cancel both timers. Safe to call repeatedly or when never attached.
    pub fn cleanup(&mut self) {
        if let Some(attached) = self.attached.take() {
            attached.run.cancel();
            for handle in &attached.handles {
                handle.abort();
            }
            tracing::trace!(slot = %self.slot, element = ?attached.run.element, "blinking cleaned up");
        }
    }

    /// Attached and not self-cancelled
    pub fn is_active(&self) -> bool {
        self.attached
            .as_ref()
            .map_or(false, |a| !a.run.cancelled.load(Ordering::SeqCst))
    }

    pub fn element(&self) -> Option<ElementId> {
        self.attached.as_ref().map(|a| a.run.element)
    }

    pub fn eyes(&self) -> EyePhase {
        match &self.attached {
            Some(a) if a.run.blinking.load(Ordering::SeqCst) => EyePhase::Closed,
            _ => EyePhase::Open,
        }
    }

    /// Completed blinks of the current run
    pub fn blinks(&self) -> u64 {
        self.attached
            .as_ref()
            .map_or(0, |a| a.run.blinks.load(Ordering::Relaxed))
    }

    /// Timer tasks still alive, across every run of this controller's gauge
    pub fn active_timers(&self) -> usize {
        self.gauge.active()
    }
}

impl Drop for BlinkController {
    fn drop(&mut self) {
        self.cleanup();
    }
}
