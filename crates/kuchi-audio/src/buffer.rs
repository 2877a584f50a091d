//! Decoded audio

use std::sync::Arc;
use std::time::Duration;

/// Mono PCM samples at a fixed rate. Cheap to clone.
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    samples: Arc<[f32]>,
    sample_rate: u32,
}

impl SampleBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            sample_rate,
        }
    }

    /// Down-mix interleaved frames to mono
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Self {
        let channels = channels.max(1);
        let mono = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect();
        Self::new(mono, sample_rate)
    }

    #[inline]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Sample index at a playback position, clamped to the buffer length
    pub fn index_at(&self, position: Duration) -> usize {
        let idx = (position.as_secs_f64() * self.sample_rate as f64) as usize;
        idx.min(self.samples.len())
    }
}
