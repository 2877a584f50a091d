//! Playback session
//!
//! One utterance on one slot:
//!
//! ```text
//! controls off → load → attach → start → lip-sync → ended | stopped | failed
//!                                                       ↓
//!                    lip-sync idle, mouth closed, graph and context released, controls on
//! ```
//!
//! A stop that lands while loading discards whatever the loader returns.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tokio::time::Instant;
use tracing::Instrument;

use kuchi_audio::{AudioSource, AudioSourceLoader, PlaybackEnd, SpectrumSampler};
use kuchi_core::{CharacterFamily, CharacterSlot, KuchiError, KuchiResult, SessionId, VoiceId};
use kuchi_visual::{AssetPaths, CharacterSurface};

use crate::{ControlGate, LipSyncController, LipSyncStats, TimerGauge};

/// How a session ended
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackStatus {
    Completed,
    Stopped,
    Failed(KuchiError),
}

impl PlaybackStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, PlaybackStatus::Completed)
    }
}

impl fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackStatus::Completed => f.write_str("completed"),
            PlaybackStatus::Stopped => f.write_str("stopped"),
            PlaybackStatus::Failed(e) => write!(f, "failed({e})"),
        }
    }
}

/// What the caller gets back from `play`
#[derive(Debug, Clone)]
pub struct PlaybackReport {
    pub session: SessionId,
    pub slot: CharacterSlot,
    pub voice: VoiceId,
    pub status: PlaybackStatus,
    /// Wall time from `play` to teardown
    pub elapsed: Duration,
    pub lipsync: LipSyncStats,
}

impl PlaybackReport {
    /// Elapsed time on completion, the error on failure.
    /// A stopped session still counts as success.
    pub fn into_result(self) -> KuchiResult<Duration> {
        match self.status {
            PlaybackStatus::Completed | PlaybackStatus::Stopped => Ok(self.elapsed),
            PlaybackStatus::Failed(e) => Err(e),
        }
    }
}

/// Everything a session borrows from its owner
#[derive(Clone)]
pub struct SessionDeps {
    pub loader: AudioSourceLoader,
    pub sampler: SpectrumSampler,
    pub surface: Arc<dyn CharacterSurface>,
    pub paths: AssetPaths,
    pub controls: ControlGate,
    pub sample_interval: Duration,
    pub lipsync_timers: TimerGauge,
}

/// Caller side of a running session
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    stop: watch::Sender<bool>,
    done: oneshot::Receiver<()>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Request a stop without waiting
    pub fn request_stop(&self) {
        self.stop.send_replace(true);
    }

    /// Stop and wait until every handle of the session is released
    pub async fn stop(self) {
        self.request_stop();
        let _ = self.done.await;
    }

    pub fn is_finished(&mut self) -> bool {
        !matches!(self.done.try_recv(), Err(oneshot::error::TryRecvError::Empty))
    }
}

/// One play-through on one slot
pub struct PlaybackSession {
    id: SessionId,
    slot: CharacterSlot,
    voice: VoiceId,
    family: Option<CharacterFamily>,
    deps: SessionDeps,
    stop: watch::Receiver<bool>,
    // dropped last, after teardown
    _done: oneshot::Sender<()>,
}

impl PlaybackSession {
    pub fn new(
        id: SessionId,
        slot: CharacterSlot,
        voice: VoiceId,
        family: Option<CharacterFamily>,
        deps: SessionDeps,
    ) -> (Self, SessionHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        let (done_tx, done_rx) = oneshot::channel();
        (
            Self {
                id,
                slot,
                voice,
                family,
                deps,
                stop: stop_rx,
                _done: done_tx,
            },
            SessionHandle {
                id,
                stop: stop_tx,
                done: done_rx,
            },
        )
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Play `source` to the end, a stop, or the first error
    pub async fn run(mut self, source: AudioSource) -> PlaybackReport {
        let span = tracing::info_span!("session", id = %self.id, slot = %self.slot, voice = %self.voice);
        async move {
            let started = Instant::now();
            let lease = self.deps.controls.acquire(self.slot);
            let mut lipsync = LipSyncController::new(
                self.slot,
                self.family,
                Arc::clone(&self.deps.surface),
                self.deps.paths.clone(),
                self.deps.sample_interval,
            )
            .with_gauge(self.deps.lipsync_timers.clone());

            tracing::info!(family = ?self.family, "session started");
            let status = match self.drive(source, &mut lipsync).await {
                Ok(PlaybackEnd::Ended) => PlaybackStatus::Completed,
                Ok(PlaybackEnd::Stopped) => PlaybackStatus::Stopped,
                Err(e) => PlaybackStatus::Failed(e),
            };

            // covers every exit of `drive`, including failures before sampling
            lipsync.stop().await;
            if matches!(status, PlaybackStatus::Failed(_)) {
                lipsync.rest();
            }
            lease.release();

            let elapsed = started.elapsed();
            match &status {
                PlaybackStatus::Failed(e) => {
                    tracing::error!(kind = e.kind().as_str(), error = %e, "session aborted")
                }
                _ => tracing::info!(%status, elapsed_ms = elapsed.as_millis() as u64, "session ended"),
            }

            PlaybackReport {
                session: self.id,
                slot: self.slot,
                voice: self.voice,
                status,
                elapsed,
                lipsync: lipsync.stats(),
            }
        }
        .instrument(span)
        .await
    }

    async fn drive(
        &mut self,
        source: AudioSource,
        lipsync: &mut LipSyncController,
    ) -> KuchiResult<PlaybackEnd> {
        if self.stop_requested() {
            return Ok(PlaybackEnd::Stopped);
        }

        let loaded = tokio::select! {
            loaded = self.deps.loader.load(source) => loaded,
            _ = wait_for_stop(&mut self.stop) => {
                tracing::debug!("stopped while loading, result discarded");
                return Ok(PlaybackEnd::Stopped);
            }
        };
        let mut loaded = loaded?;
        if self.stop_requested() {
            tracing::debug!("stopped while loading, result discarded");
            return Ok(PlaybackEnd::Stopped);
        }

        let (mut playback, analyser) = self.deps.sampler.attach(&loaded.buffer, &loaded.context)?;
        playback.start()?;
        lipsync.start(Arc::new(analyser)).await;
        tracing::debug!(duration_ms = playback.duration().as_millis() as u64, "playing");

        let end = tokio::select! {
            end = playback.finished() => end,
            _ = wait_for_stop(&mut self.stop) => {
                playback.stop();
                PlaybackEnd::Stopped
            }
        };

        lipsync.stop().await;
        playback.release();
        loaded.context.release();
        Ok(end)
    }

    fn stop_requested(&self) -> bool {
        *self.stop.borrow()
    }
}

async fn wait_for_stop(stop: &mut watch::Receiver<bool>) {
    if stop.wait_for(|stopped| *stopped).await.is_err() {
        // handle dropped without stopping: play on
        std::future::pending::<()>().await;
    }
}
