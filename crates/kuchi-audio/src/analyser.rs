//! Frequency analyser
//!
//! Mirrors the browser analyser node the sprites were tuned against:
//! Blackman window, magnitude smoothing across reads, decibel scale mapped
//! onto bytes. Keeping that mapping keeps the classifier thresholds
//! meaningful.

use std::fmt;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use kuchi_core::{KuchiError, KuchiResult, LipSyncConfig};

/// Byte magnitudes, one per frequency bin, lowest frequency first
#[derive(Clone, PartialEq, Eq, Default)]
pub struct SpectrumSnapshot {
    bins: Vec<u8>,
}

impl SpectrumSnapshot {
    pub fn new(bins: Vec<u8>) -> Self {
        Self { bins }
    }

    /// Snapshot of `len` silent bins
    pub fn silent(len: usize) -> Self {
        Self { bins: vec![0; len] }
    }

    #[inline]
    pub fn bins(&self) -> &[u8] {
        &self.bins
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Lower half of the bins, the rough vocal range
    pub fn vocal_range(&self) -> &[u8] {
        &self.bins[..self.bins.len() / 2]
    }
}

impl From<Vec<u8>> for SpectrumSnapshot {
    fn from(bins: Vec<u8>) -> Self {
        Self::new(bins)
    }
}

impl fmt::Debug for SpectrumSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head = &self.bins[..self.bins.len().min(8)];
        write!(f, "SpectrumSnapshot({} bins, head={:?})", self.bins.len(), head)
    }
}

/// Analyser parameters
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnalyserSettings {
    pub fft_size: usize,
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self::from(&LipSyncConfig::default())
    }
}

impl From<&LipSyncConfig> for AnalyserSettings {
    fn from(config: &LipSyncConfig) -> Self {
        AnalyserSettings {
            fft_size: config.fft_size,
            smoothing: config.smoothing,
            min_decibels: config.min_decibels,
            max_decibels: config.max_decibels,
        }
    }
}

/// Stateful analyser; smoothing carries over between reads
pub struct FrequencyAnalyser {
    settings: AnalyserSettings,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl FrequencyAnalyser {
    pub fn new(settings: AnalyserSettings) -> KuchiResult<Self> {
        let n = settings.fft_size;
        if n < 32 || !n.is_power_of_two() {
            return Err(KuchiError::Graph(format!(
                "analyser fft size {n} must be a power of two >= 32"
            )));
        }
        if settings.min_decibels >= settings.max_decibels {
            return Err(KuchiError::Graph("analyser decibel range is empty".into()));
        }

        let fft = FftPlanner::<f32>::new().plan_fft_forward(n);

        Ok(FrequencyAnalyser {
            settings,
            fft,
            window: blackman_window(n),
            smoothed: vec![0.0; n / 2],
            scratch: vec![Complex::new(0.0, 0.0); n],
        })
    }

    #[inline]
    pub fn fft_size(&self) -> usize {
        self.settings.fft_size
    }

    #[inline]
    pub fn bin_count(&self) -> usize {
        self.settings.fft_size / 2
    }

    /// Forget smoothing history
    pub fn reset(&mut self) {
        self.smoothed.iter_mut().for_each(|m| *m = 0.0);
    }

    /// Analyse the samples leading up to the playhead.
    ///
    /// Only the last `fft_size` samples are used; a shorter slice is treated
    /// as preceded by silence.
    pub fn analyse(&mut self, recent: &[f32]) -> SpectrumSnapshot {
        let n = self.settings.fft_size;
        let take = recent.len().min(n);
        let pad = n - take;
        let tail = &recent[recent.len() - take..];

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { tail[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        let tau = self.settings.smoothing;
        let scale = 255.0 / (self.settings.max_decibels - self.settings.min_decibels);
        let mut bins = Vec::with_capacity(n / 2);

        for (k, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() / n as f32;
            *smoothed = tau * *smoothed + (1.0 - tau) * magnitude;

            let byte = if *smoothed > 0.0 {
                let db = 20.0 * smoothed.log10();
                ((db - self.settings.min_decibels) * scale).floor().clamp(0.0, 255.0) as u8
            } else {
                0
            };
            bins.push(byte);
        }

        SpectrumSnapshot::new(bins)
    }
}

impl fmt::Debug for FrequencyAnalyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencyAnalyser")
            .field("settings", &self.settings)
            .finish()
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;
    let two_pi = 2.0 * std::f32::consts::PI;

    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (two_pi * x).cos() + a2 * (2.0 * two_pi * x).cos()
        })
        .collect()
}
