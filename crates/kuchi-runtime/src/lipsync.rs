//! Lip-sync controller
//!
//! Idle → Sampling → Idle. While sampling, a tokio interval reads a
//! snapshot every tick, classifies it and writes the mouth sprite to the
//! slot's element. Writes only happen while the mounted element shows the
//! voice's character family.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use kuchi_audio::SpectrumSource;
use kuchi_core::{CharacterFamily, CharacterSlot, LipSyncConfig};
use kuchi_visual::{AssetPaths, CharacterSurface, MouthState, VisemeTracker};

use crate::TimerGauge;

/// Lip-sync phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LipSyncPhase {
    Idle,
    Sampling,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LipSyncStats {
    pub ticks: u64,
    /// Ticks whose snapshot read failed
    pub ticks_failed: u64,
    /// Ticks skipped because another family was mounted
    pub ticks_gated: u64,
    pub mouth_writes: u64,
    pub last_state: Option<MouthState>,
}

struct LipSyncShared {
    /// Bumped on every start; a tick from an older run does nothing
    generation: u64,
    sampling: bool,
    tracker: VisemeTracker,
    stats: LipSyncStats,
}

struct SamplingTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// Drives the mouth of one slot for one session
pub struct LipSyncController {
    slot: CharacterSlot,
    family: Option<CharacterFamily>,
    surface: Arc<dyn CharacterSurface>,
    paths: AssetPaths,
    interval: Duration,
    gauge: TimerGauge,
    shared: Arc<Mutex<LipSyncShared>>,
    task: Option<SamplingTask>,
}

impl LipSyncController {
    /// `family` is the voice's family; `None` means the voice never animates.
    pub fn new(
        slot: CharacterSlot,
        family: Option<CharacterFamily>,
        surface: Arc<dyn CharacterSurface>,
        paths: AssetPaths,
        interval: Duration,
    ) -> Self {
        Self {
            slot,
            family,
            surface,
            paths,
            interval,
            gauge: TimerGauge::new(),
            shared: Arc::new(Mutex::new(LipSyncShared {
                generation: 0,
                sampling: false,
                tracker: VisemeTracker::new(),
                stats: LipSyncStats::default(),
            })),
            task: None,
        }
    }

    pub fn from_config(
        slot: CharacterSlot,
        family: Option<CharacterFamily>,
        surface: Arc<dyn CharacterSurface>,
        paths: AssetPaths,
        config: &LipSyncConfig,
    ) -> Self {
        Self::new(slot, family, surface, paths, config.sample_interval)
    }

    /// Count this controller's sampling task on a shared gauge
    pub fn with_gauge(mut self, gauge: TimerGauge) -> Self {
        self.gauge = gauge;
        self
    }

    pub fn slot(&self) -> CharacterSlot {
        self.slot
    }

    pub fn phase(&self) -> LipSyncPhase {
        if self.shared.lock().sampling {
            LipSyncPhase::Sampling
        } else {
            LipSyncPhase::Idle
        }
    }

    pub fn previous_energy(&self) -> u64 {
        self.shared.lock().tracker.previous_energy()
    }

    pub fn stats(&self) -> LipSyncStats {
        self.shared.lock().stats.clone()
    }

    /// Idle → Sampling. A running loop is stopped first.
    pub async fn start(&mut self, source: Arc<dyn SpectrumSource>) {
        self.stop().await;

        let generation = {
            let mut shared = self.shared.lock();
            shared.generation += 1;
            shared.sampling = true;
            shared.tracker.reset();
            shared.generation
        };

        let (shutdown, mut shutdown_rx) = oneshot::channel();
        let ticker = Ticker {
            slot: self.slot,
            family: self.family,
            generation,
            surface: Arc::clone(&self.surface),
            paths: self.paths.clone(),
            shared: Arc::clone(&self.shared),
            source,
        };
        let interval = self.interval;
        let guard = self.gauge.guard();

        let handle = tokio::spawn(async move {
            let _guard = guard;
            let mut ticks = tokio::time::interval(interval);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately; sample one interval in
            ticks.tick().await;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticks.tick() => {
                        if !ticker.tick() {
                            break;
                        }
                    }
                }
            }
        });

        tracing::debug!(slot = %self.slot, ?interval, "lip-sync sampling");
        self.task = Some(SamplingTask { shutdown, handle });
    }

    /// Sampling → Idle. Waits for the loop to exit, resets the energy and
    /// closes the mouth. A no-op on the surface when already idle.
    pub async fn stop(&mut self) {
        let was_sampling = {
            let mut shared = self.shared.lock();
            shared.tracker.reset();
            std::mem::replace(&mut shared.sampling, false)
        };

        let task = self.task.take();
        let had_task = task.is_some();
        if let Some(task) = task {
            let _ = task.shutdown.send(());
            if let Err(e) = task.handle.await {
                if e.is_panic() {
                    tracing::error!(slot = %self.slot, "lip-sync task panicked");
                }
            }
        }

        if was_sampling || had_task {
            self.rest();
        }
    }

    /// Show the closed mouth, if this voice's family is mounted
    pub fn rest(&self) {
        let Some(family) = self.family else { return };
        if let Some(mounted) = self.surface.mounted(self.slot) {
            if mounted.family == family {
                let sprite = self.paths.mouth(family, MouthState::Closed);
                self.surface.set_mouth(self.slot, mounted.element, &sprite);
            }
        }
    }
}

impl Drop for LipSyncController {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }
}

struct Ticker {
    slot: CharacterSlot,
    family: Option<CharacterFamily>,
    generation: u64,
    surface: Arc<dyn CharacterSurface>,
    paths: AssetPaths,
    shared: Arc<Mutex<LipSyncShared>>,
    source: Arc<dyn SpectrumSource>,
}

impl Ticker {
    /// One sampling step. Returns false once this run is over.
    fn tick(&self) -> bool {
        let mut shared = self.shared.lock();
        if !shared.sampling || shared.generation != self.generation {
            return false;
        }
        shared.stats.ticks += 1;

        let snapshot = match self.source.read_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                shared.stats.ticks_failed += 1;
                tracing::warn!(slot = %self.slot, error = %e, "spectrum read failed, skipping tick");
                return true;
            }
        };

        let state = shared.tracker.observe(snapshot.bins());
        shared.stats.last_state = Some(state);

        let Some(family) = self.family else {
            shared.stats.ticks_gated += 1;
            return true;
        };
        match self.surface.mounted(self.slot) {
            Some(mounted) if mounted.family == family => {
                let sprite = self.paths.mouth(family, state);
                if self.surface.set_mouth(self.slot, mounted.element, &sprite) {
                    shared.stats.mouth_writes += 1;
                }
            }
            _ => shared.stats.ticks_gated += 1,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchi_audio::SpectrumSnapshot;
    use kuchi_core::{KuchiError, KuchiResult};
    use kuchi_visual::{SceneSurface, SpriteNode};
    use std::collections::VecDeque;

    /// Replays fixed snapshots, then silence
    struct Script {
        frames: Mutex<VecDeque<KuchiResult<SpectrumSnapshot>>>,
    }

    impl Script {
        fn new(frames: Vec<KuchiResult<Vec<u8>>>) -> Arc<Self> {
            Arc::new(Self {
                frames: Mutex::new(
                    frames
                        .into_iter()
                        .map(|f| f.map(SpectrumSnapshot::from))
                        .collect(),
                ),
            })
        }
    }

    impl SpectrumSource for Script {
        fn read_snapshot(&self) -> KuchiResult<SpectrumSnapshot> {
            self.frames
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(SpectrumSnapshot::silent(4)))
        }
    }

    fn controller(scene: &Arc<SceneSurface>, family: Option<CharacterFamily>) -> LipSyncController {
        LipSyncController::new(
            CharacterSlot::A,
            family,
            scene.clone(),
            AssetPaths::default(),
            Duration::from_millis(40),
        )
    }

    fn mouths(scene: &SceneSurface) -> Vec<String> {
        scene
            .writes_for(CharacterSlot::A, SpriteNode::Mouth)
            .iter()
            .map(|s| s.as_str().rsplit('/').next().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_follow_ladder() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Metan);
        let mut lipsync = controller(&scene, Some(CharacterFamily::Metan));

        lipsync
            .start(Script::new(vec![
                Ok(vec![100, 100, 0, 0]),
                Ok(vec![10, 10, 0, 0]),
                Ok(vec![0, 0, 0, 0]),
            ]))
            .await;
        assert_eq!(lipsync.phase(), LipSyncPhase::Sampling);

        tokio::time::sleep(Duration::from_millis(130)).await;
        lipsync.stop().await;

        assert_eq!(
            mouths(&scene),
            vec![
                "metan_mouse_open.png",
                "metan_mouse_open_middle.png",
                "metan_mouse_open_middle.png",
                "metan_mouse_close.png",
            ]
        );
        assert_eq!(lipsync.phase(), LipSyncPhase::Idle);
        assert_eq!(lipsync.previous_energy(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_write_is_first_tick() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Metan);
        let mut lipsync = controller(&scene, Some(CharacterFamily::Metan));

        lipsync.stop().await;
        assert!(mouths(&scene).is_empty());

        lipsync.start(Script::new(vec![Ok(vec![100, 100, 0, 0])])).await;
        assert!(mouths(&scene).is_empty());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(mouths(&scene), vec!["metan_mouse_open.png"]);

        lipsync.stop().await;
        lipsync.stop().await;
        assert_eq!(
            mouths(&scene),
            vec!["metan_mouse_open.png", "metan_mouse_close.png"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_read_is_skipped() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Hau);
        let mut lipsync = controller(&scene, Some(CharacterFamily::Hau));

        lipsync
            .start(Script::new(vec![
                Err(KuchiError::SampleTick("node torn down".into())),
                Ok(vec![50, 0]),
            ]))
            .await;
        tokio::time::sleep(Duration::from_millis(90)).await;

        let stats = lipsync.stats();
        assert_eq!(stats.ticks, 2);
        assert_eq!(stats.ticks_failed, 1);
        assert_eq!(stats.last_state, Some(MouthState::Open));
        assert_eq!(lipsync.phase(), LipSyncPhase::Sampling);
        lipsync.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_family_is_not_touched() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Zundamon);
        let mut lipsync = controller(&scene, Some(CharacterFamily::Metan));

        lipsync.start(Script::new(vec![Ok(vec![200, 0])])).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        lipsync.stop().await;

        assert!(mouths(&scene).is_empty());
        assert_eq!(lipsync.stats().ticks_gated, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_one_timer() {
        let scene = Arc::new(SceneSurface::default());
        scene.mount(CharacterSlot::A, CharacterFamily::Metan);
        let gauge = TimerGauge::new();
        let mut lipsync = controller(&scene, Some(CharacterFamily::Metan)).with_gauge(gauge.clone());

        lipsync.start(Script::new(vec![Ok(vec![100, 0])])).await;
        lipsync.start(Script::new(vec![Ok(vec![100, 0])])).await;
        assert_eq!(gauge.active(), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(lipsync.stats().ticks, 1);

        lipsync.stop().await;
        lipsync.stop().await;
        assert_eq!(gauge.active(), 0);
    }
}
