//! Scripted spectra
//!
//! A [`ScriptedSpectrum`] replays a fixed list of snapshots, one per read,
//! then repeats silence. Energies are turned into bins whose lower half sums
//! to exactly that energy.

use std::collections::VecDeque;

use parking_lot::Mutex;

use kuchi_audio::{SpectrumSnapshot, SpectrumSource};
use kuchi_core::{KuchiError, KuchiResult};
use kuchi_visual::{classify, MouthState};

/// Bins per scripted snapshot
pub const SCRIPT_BINS: usize = 256;

/// One scripted read
#[derive(Debug, Clone)]
pub enum Frame {
    Energy(u64),
    Bins(Vec<u8>),
    /// A transient read failure
    Fail,
}

/// Lower half of `len` bins summing to `energy`, upper half full scale.
/// The upper half must not count towards energy.
pub fn bins_with_energy(energy: u64, len: usize) -> Vec<u8> {
    let half = len / 2;
    let mut bins = vec![0u8; len];
    let mut left = energy.min(half as u64 * 255);
    for bin in bins.iter_mut().take(half) {
        let take = left.min(255);
        *bin = take as u8;
        left -= take;
    }
    for bin in bins.iter_mut().skip(half) {
        *bin = 255;
    }
    bins
}

/// Replays frames in order
#[derive(Debug)]
pub struct ScriptedSpectrum {
    frames: Mutex<VecDeque<Frame>>,
    reads: Mutex<usize>,
}

impl ScriptedSpectrum {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: Mutex::new(frames.into_iter().collect()),
            reads: Mutex::new(0),
        }
    }

    pub fn energies(energies: &[u64]) -> Self {
        Self::new(energies.iter().map(|&e| Frame::Energy(e)))
    }

    pub fn reads(&self) -> usize {
        *self.reads.lock()
    }

    pub fn remaining(&self) -> usize {
        self.frames.lock().len()
    }
}

impl SpectrumSource for ScriptedSpectrum {
    fn read_snapshot(&self) -> KuchiResult<SpectrumSnapshot> {
        *self.reads.lock() += 1;
        match self.frames.lock().pop_front() {
            Some(Frame::Energy(e)) => Ok(SpectrumSnapshot::new(bins_with_energy(e, SCRIPT_BINS))),
            Some(Frame::Bins(bins)) => Ok(SpectrumSnapshot::new(bins)),
            Some(Frame::Fail) => Err(KuchiError::SampleTick("scripted failure".into())),
            None => Ok(SpectrumSnapshot::silent(SCRIPT_BINS)),
        }
    }
}

/// Mouth states a fresh session would produce for `energies`
pub fn expected_states(energies: &[u64]) -> Vec<MouthState> {
    let mut previous = 0;
    energies
        .iter()
        .map(|&e| {
            let (state, next) = classify(&bins_with_energy(e, SCRIPT_BINS), previous);
            previous = next;
            state
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchi_visual::vocal_energy;
    use proptest::prelude::*;

    #[test]
    fn test_bins_carry_energy() {
        for energy in [0, 1, 254, 255, 256, 1000, 20_000] {
            assert_eq!(vocal_energy(&bins_with_energy(energy, SCRIPT_BINS)), energy);
        }
    }

    #[test]
    fn test_script_order() {
        let script = ScriptedSpectrum::new([Frame::Energy(10), Frame::Fail]);
        assert_eq!(vocal_energy(script.read_snapshot().unwrap().bins()), 10);
        assert!(script.read_snapshot().is_err());
        assert_eq!(vocal_energy(script.read_snapshot().unwrap().bins()), 0);
        assert_eq!(script.reads(), 3);
    }

    #[test]
    fn test_expected_states() {
        assert_eq!(
            expected_states(&[200, 20, 0, 1000, 400]),
            vec![
                MouthState::Open,
                MouthState::OpenMid,
                MouthState::OpenMid,
                MouthState::Open,
                MouthState::Closed,
            ]
        );
    }

    proptest! {
        #[test]
        fn prop_bins_hold_any_reachable_energy(energy in 0u64..=(SCRIPT_BINS as u64 / 2) * 255) {
            prop_assert_eq!(vocal_energy(&bins_with_energy(energy, SCRIPT_BINS)), energy);
        }

        #[test]
        fn prop_expected_states_match_tracker(energies in proptest::collection::vec(0u64..20_000, 1..32)) {
            let mut tracker = kuchi_visual::VisemeTracker::new();
            let observed: Vec<_> = energies
                .iter()
                .map(|&e| tracker.observe(&bins_with_energy(e, SCRIPT_BINS)))
                .collect();
            prop_assert_eq!(observed, expected_states(&energies));
        }
    }
}
