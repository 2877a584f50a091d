//! SpectrumSampler - the playback graph
//!
//! `attach` wires buffer → playhead → output and taps the analyser at the
//! playhead. Sampling cadence is not decided here; callers read snapshots
//! whenever they like.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use kuchi_core::{KuchiError, KuchiResult, LipSyncConfig};

use crate::{
    AnalyserSettings, AudioContext, AudioOutput, FrequencyAnalyser, OutputStream, SampleBuffer,
    SilentOutput, SpectrumSnapshot,
};

/// Anything that yields spectrum snapshots on demand
pub trait SpectrumSource: Send + Sync {
    /// Most recent magnitudes. May fail transiently, e.g. mid-teardown.
    fn read_snapshot(&self) -> KuchiResult<SpectrumSnapshot>;
}

/// Playback phase of one graph
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackPhase {
    /// Built, not started
    Ready,
    Playing { started: Instant },
    /// Reached the end of the buffer
    Ended,
    /// Stopped before the end
    Stopped { at: Duration },
    /// Handles released; analyser reads fail
    Released,
}

/// How a playback wait finished
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackEnd {
    Ended,
    Stopped,
}

struct GraphShared {
    buffer: SampleBuffer,
    phase: Mutex<PlaybackPhase>,
    analyser: Mutex<Option<FrequencyAnalyser>>,
    halted: Notify,
}

impl GraphShared {
    fn position(&self) -> Duration {
        let phase = *self.phase.lock();
        self.position_locked(&phase)
    }

    async fn wait_finished(&self) -> PlaybackEnd {
        loop {
            let remaining = match *self.phase.lock() {
                PlaybackPhase::Playing { started } => {
                    self.buffer.duration().saturating_sub(started.elapsed())
                }
                PlaybackPhase::Ended => return PlaybackEnd::Ended,
                PlaybackPhase::Ready => Duration::MAX,
                PlaybackPhase::Stopped { .. } | PlaybackPhase::Released => {
                    return PlaybackEnd::Stopped
                }
            };

            if remaining.is_zero() {
                let mut phase = self.phase.lock();
                if matches!(*phase, PlaybackPhase::Playing { .. }) {
                    *phase = PlaybackPhase::Ended;
                }
                continue;
            }

            let halted = self.halted.notified();
            if remaining == Duration::MAX {
                halted.await;
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(remaining) => {}
                    _ = halted => {}
                }
            }
        }
    }

    fn position_locked(&self, phase: &PlaybackPhase) -> Duration {
        let duration = self.buffer.duration();
        match *phase {
            PlaybackPhase::Ready | PlaybackPhase::Released => Duration::ZERO,
            PlaybackPhase::Playing { started } => started.elapsed().min(duration),
            PlaybackPhase::Ended => duration,
            PlaybackPhase::Stopped { at } => at,
        }
    }
}

/// Builds playback graphs
#[derive(Clone)]
pub struct SpectrumSampler {
    settings: AnalyserSettings,
    output: Arc<dyn AudioOutput>,
}

impl SpectrumSampler {
    pub fn new(settings: AnalyserSettings, output: Arc<dyn AudioOutput>) -> Self {
        Self { settings, output }
    }

    /// Sampler with default analyser settings and no audible output
    pub fn silent() -> Self {
        Self::new(AnalyserSettings::default(), Arc::new(SilentOutput))
    }

    pub fn from_config(config: &LipSyncConfig, output: Arc<dyn AudioOutput>) -> Self {
        Self::new(AnalyserSettings::from(config), output)
    }

    pub fn settings(&self) -> &AnalyserSettings {
        &self.settings
    }

    /// Build the graph for a loaded buffer
    pub fn attach(
        &self,
        buffer: &SampleBuffer,
        context: &AudioContext,
    ) -> KuchiResult<(PlaybackHandle, AnalyzerHandle)> {
        if context.is_released() {
            return Err(KuchiError::Graph(format!(
                "context {} already released",
                context.id()
            )));
        }
        if buffer.is_empty() {
            return Err(KuchiError::Graph("cannot play an empty buffer".into()));
        }

        let analyser = FrequencyAnalyser::new(self.settings)?;
        let stream = self.output.open(buffer)?;

        let shared = Arc::new(GraphShared {
            buffer: buffer.clone(),
            phase: Mutex::new(PlaybackPhase::Ready),
            analyser: Mutex::new(Some(analyser)),
            halted: Notify::new(),
        });

        tracing::trace!(
            context = context.id(),
            fft_size = self.settings.fft_size,
            "playback graph attached"
        );

        Ok((
            PlaybackHandle {
                shared: Arc::clone(&shared),
                stream: Some(stream),
            },
            AnalyzerHandle { shared },
        ))
    }
}

/// Playback side of a graph
pub struct PlaybackHandle {
    shared: Arc<GraphShared>,
    stream: Option<Box<dyn OutputStream>>,
}

impl PlaybackHandle {
    pub fn duration(&self) -> Duration {
        self.shared.buffer.duration()
    }

    pub fn phase(&self) -> PlaybackPhase {
        *self.shared.phase.lock()
    }

    pub fn position(&self) -> Duration {
        self.shared.position()
    }

    /// Start playback from the beginning
    pub fn start(&mut self) -> KuchiResult<()> {
        let mut phase = self.shared.phase.lock();
        if *phase != PlaybackPhase::Ready {
            return Err(KuchiError::Graph(format!("cannot start from {:?}", *phase)));
        }
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| KuchiError::Graph("output stream missing".into()))?;
        stream.play()?;
        *phase = PlaybackPhase::Playing {
            started: Instant::now(),
        };
        drop(phase);
        self.shared.halted.notify_one();
        Ok(())
    }

    /// Resolves once the buffer has played out or playback is stopped.
    /// The future owns its share of the graph.
    pub fn finished(&self) -> impl Future<Output = PlaybackEnd> + Send + 'static {
        let shared = Arc::clone(&self.shared);
        async move { shared.wait_finished().await }
    }

    /// Pause the source. Idempotent.
    pub fn stop(&mut self) {
        {
            let mut phase = self.shared.phase.lock();
            match *phase {
                PlaybackPhase::Ready | PlaybackPhase::Playing { .. } => {
                    let at = self.shared.position_locked(&*phase);
                    *phase = PlaybackPhase::Stopped { at };
                }
                _ => {}
            }
        }
        if let Some(stream) = self.stream.as_mut() {
            stream.stop();
        }
        self.shared.halted.notify_one();
    }

    /// Stop and drop every node. Later analyser reads fail.
    pub fn release(&mut self) {
        self.stop();
        self.stream = None;
        *self.shared.analyser.lock() = None;
        *self.shared.phase.lock() = PlaybackPhase::Released;
        self.shared.halted.notify_one();
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Analyser tap of a graph
#[derive(Clone)]
pub struct AnalyzerHandle {
    shared: Arc<GraphShared>,
}

impl AnalyzerHandle {
    pub fn bin_count(&self) -> usize {
        self.shared
            .analyser
            .lock()
            .as_ref()
            .map(|a| a.bin_count())
            .unwrap_or(0)
    }
}

impl SpectrumSource for AnalyzerHandle {
    fn read_snapshot(&self) -> KuchiResult<SpectrumSnapshot> {
        let phase = *self.shared.phase.lock();
        let mut guard = self.shared.analyser.lock();
        let analyser = guard
            .as_mut()
            .ok_or_else(|| KuchiError::SampleTick("analyser released".into()))?;

        let snapshot = match phase {
            PlaybackPhase::Playing { .. } => {
                let samples = self.shared.buffer.samples();
                let end = self.shared.buffer.index_at(self.shared.position_locked(&phase));
                let start = end.saturating_sub(analyser.fft_size());
                analyser.analyse(&samples[start..end])
            }
            PlaybackPhase::Ready => {
                return Err(KuchiError::SampleTick("playback not started".into()));
            }
            PlaybackPhase::Released => {
                return Err(KuchiError::SampleTick("graph released".into()));
            }
            PlaybackPhase::Ended | PlaybackPhase::Stopped { .. } => analyser.analyse(&[]),
        };

        Ok(snapshot)
    }
}
