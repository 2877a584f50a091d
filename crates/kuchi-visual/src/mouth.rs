//! Mouth State - viseme classification from spectrum energy

use std::fmt;

/// Energy drop below which the mouth stays half open
pub const OPEN_MID_GAP: u64 = 250;

/// Energy drop below which the mouth is nearly closed
pub const CLOSE_MID_GAP: u64 = 500;

/// Coarse mouth shape, one sprite each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MouthState {
    #[default]
    Closed,
    CloseMid,
    OpenMid,
    Open,
}

impl MouthState {
    pub const ALL: [MouthState; 4] = [
        MouthState::Closed,
        MouthState::CloseMid,
        MouthState::OpenMid,
        MouthState::Open,
    ];

    /// Sprite suffix in the asset naming scheme
    pub fn sprite_suffix(self) -> &'static str {
        match self {
            MouthState::Closed => "close",
            MouthState::CloseMid => "close_middle",
            MouthState::OpenMid => "open_middle",
            MouthState::Open => "open",
        }
    }

    /// 0 = closed, 3 = open
    pub fn openness(self) -> u8 {
        match self {
            MouthState::Closed => 0,
            MouthState::CloseMid => 1,
            MouthState::OpenMid => 2,
            MouthState::Open => 3,
        }
    }
}

impl fmt::Display for MouthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sprite_suffix())
    }
}

/// Sum of the lower half of the bins
#[inline]
pub fn vocal_energy(bins: &[u8]) -> u64 {
    bins[..bins.len() / 2].iter().map(|&b| u64::from(b)).sum()
}

/// Classify one tick.
///
/// Returns the mouth state and the energy to carry into the next tick.
/// A session starts from `previous_energy = 0`, so the first tick with any
/// sound opens the mouth.
pub fn classify(bins: &[u8], previous_energy: u64) -> (MouthState, u64) {
    let current = vocal_energy(bins);
    (classify_energy(current, previous_energy), current)
}

/// The threshold ladder on its own
pub fn classify_energy(current: u64, previous: u64) -> MouthState {
    if current > previous {
        return MouthState::Open;
    }
    let gap = previous - current;
    if gap < OPEN_MID_GAP {
        MouthState::OpenMid
    } else if gap < CLOSE_MID_GAP {
        MouthState::CloseMid
    } else {
        MouthState::Closed
    }
}

/// Carries the previous energy between ticks of one session
#[derive(Debug, Clone, Default)]
pub struct VisemeTracker {
    previous_energy: u64,
}

impl VisemeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn previous_energy(&self) -> u64 {
        self.previous_energy
    }

    pub fn observe(&mut self, bins: &[u8]) -> MouthState {
        let (state, energy) = classify(bins, self.previous_energy);
        self.previous_energy = energy;
        state
    }

    pub fn reset(&mut self) {
        self.previous_energy = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rising_energy_opens() {
        assert_eq!(classify(&[100, 100, 0, 0], 0), (MouthState::Open, 200));
    }

    #[test]
    fn test_small_drop_is_open_mid() {
        assert_eq!(classify(&[10, 10, 0, 0], 200), (MouthState::OpenMid, 20));
        assert_eq!(classify(&[0, 0, 0, 0], 20), (MouthState::OpenMid, 0));
    }

    #[test]
    fn test_steep_drop_closes() {
        assert_eq!(classify(&[200, 200, 0, 0], 1000), (MouthState::Closed, 400));
    }

    #[test]
    fn test_boundaries() {
        assert_eq!(classify_energy(750, 1000), MouthState::CloseMid);
        assert_eq!(classify_energy(500, 1000), MouthState::Closed);
        assert_eq!(classify_energy(751, 1000), MouthState::OpenMid);
        assert_eq!(classify_energy(1000, 1000), MouthState::OpenMid);
    }

    #[test]
    fn test_upper_half_ignored() {
        assert_eq!(vocal_energy(&[1, 2, 255, 255]), 3);
        assert_eq!(vocal_energy(&[7]), 0);
        assert_eq!(vocal_energy(&[]), 0);
    }

    #[test]
    fn test_tracker_sequence() {
        let mut tracker = VisemeTracker::new();
        assert_eq!(tracker.observe(&[100, 100, 0, 0]), MouthState::Open);
        assert_eq!(tracker.observe(&[10, 10, 0, 0]), MouthState::OpenMid);
        assert_eq!(tracker.previous_energy(), 20);
        tracker.reset();
        assert_eq!(tracker.observe(&[1, 0]), MouthState::Open);
    }

    proptest! {
        #[test]
        fn prop_rise_always_opens(prev in 0u64..100_000, rise in 1u64..100_000) {
            prop_assert_eq!(classify_energy(prev + rise, prev), MouthState::Open);
        }

        #[test]
        fn prop_ladder_matches_gap(current in 0u64..100_000, gap in 0u64..2_000) {
            let state = classify_energy(current, current + gap);
            let expected = if gap < 250 {
                MouthState::OpenMid
            } else if gap < 500 {
                MouthState::CloseMid
            } else {
                MouthState::Closed
            };
            prop_assert_eq!(state, expected);
        }

        #[test]
        fn prop_monotonic_in_gap(current in 0u64..10_000, a in 0u64..2_000, b in 0u64..2_000) {
            let (small, large) = if a <= b { (a, b) } else { (b, a) };
            let s = classify_energy(current, current + small).openness();
            let l = classify_energy(current, current + large).openness();
            prop_assert!(l <= s);
        }

        #[test]
        fn prop_classify_is_pure(bins in proptest::collection::vec(any::<u8>(), 0..512), prev in 0u64..200_000) {
            prop_assert_eq!(classify(&bins, prev), classify(&bins, prev));
            prop_assert_eq!(classify(&bins, prev).1, vocal_energy(&bins));
        }
    }
}
