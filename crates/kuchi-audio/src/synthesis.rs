//! Utterance synthesis
//!
//! Builds speech-shaped buffers: voiced stretches from a shaped pulse train
//! plus breath noise, separated by silence. Used for fixtures and the demo
//! binary when no engine is reachable.

use std::time::Duration;

use crate::SampleBuffer;

/// One stretch of an utterance
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Segment {
    /// Pulse train at `pitch` Hz scaled by `energy` (0..=1)
    Voiced {
        duration: Duration,
        pitch: f32,
        energy: f32,
    },
    Silence(Duration),
}

impl Segment {
    pub fn voiced(millis: u64, pitch: f32, energy: f32) -> Self {
        Segment::Voiced {
            duration: Duration::from_millis(millis),
            pitch,
            energy,
        }
    }

    pub fn silence(millis: u64) -> Self {
        Segment::Silence(Duration::from_millis(millis))
    }

    pub fn duration(&self) -> Duration {
        match *self {
            Segment::Voiced { duration, .. } | Segment::Silence(duration) => duration,
        }
    }
}

/// Synthesizer configuration
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    pub sample_rate: u32,
    /// Noise mixed into voiced segments
    pub breathiness: f32,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            breathiness: 0.1,
        }
    }
}

/// Renders segments into a `SampleBuffer`
#[derive(Debug)]
pub struct UtteranceSynthesizer {
    config: SynthesisConfig,
    phase: f32,
    noise_state: u32,
    last_output: f32,
}

impl UtteranceSynthesizer {
    pub fn new(config: SynthesisConfig) -> Self {
        Self {
            config,
            phase: 0.0,
            noise_state: 12345,
            last_output: 0.0,
        }
    }

    pub fn render(&mut self, segments: &[Segment]) -> SampleBuffer {
        let rate = self.config.sample_rate;
        let mut samples = Vec::new();

        for segment in segments {
            let count = (segment.duration().as_secs_f64() * rate as f64).round() as usize;
            match *segment {
                Segment::Voiced { pitch, energy, .. } => {
                    let inc = pitch / rate as f32;
                    let energy = energy.clamp(0.0, 1.0);
                    for _ in 0..count {
                        let voiced = self.pulse(inc);
                        let noise = self.noise();
                        let b = self.config.breathiness;
                        let sample = (voiced * (1.0 - b) + noise * b) * energy;
                        // one-pole smoothing
                        let sample = self.last_output * 0.1 + sample * 0.9;
                        self.last_output = sample;
                        samples.push(sample.clamp(-1.0, 1.0));
                    }
                }
                Segment::Silence(_) => {
                    self.last_output = 0.0;
                    samples.extend(std::iter::repeat(0.0).take(count));
                }
            }
        }

        SampleBuffer::new(samples, rate)
    }

    fn pulse(&mut self, inc: f32) -> f32 {
        self.phase += inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        let saw = 2.0 * self.phase - 1.0;
        saw - saw.powi(3) / 3.0
    }

    fn noise(&mut self) -> f32 {
        self.noise_state = self
            .noise_state
            .wrapping_mul(1103515245)
            .wrapping_add(12345);
        (self.noise_state as f32 / u32::MAX as f32) * 2.0 - 1.0
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.noise_state = 12345;
        self.last_output = 0.0;
    }
}

impl Default for UtteranceSynthesizer {
    fn default() -> Self {
        Self::new(SynthesisConfig::default())
    }
}

/// "Talk, pause, talk" at a typical speaking pitch
pub fn sample_utterance() -> SampleBuffer {
    UtteranceSynthesizer::default().render(&[
        Segment::voiced(300, 180.0, 0.8),
        Segment::silence(120),
        Segment::voiced(200, 220.0, 0.4),
        Segment::voiced(250, 160.0, 0.9),
        Segment::silence(200),
    ])
}
