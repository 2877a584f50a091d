//! Blink profiles
//!
//! One table keyed by family instead of one blink routine per character.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;

use kuchi_core::{BlinkTiming, CharacterFamily, KuchiResult, MillisRange};

use crate::{AssetPaths, EyeState, SpriteRef};

/// Built-in timing for a family
pub const fn default_timing(family: CharacterFamily) -> BlinkTiming {
    match family {
        CharacterFamily::Metan => BlinkTiming {
            initial_delay: MillisRange::new(500, 1000),
            interval: MillisRange::new(2500, 3500),
            hold: MillisRange::new(150, 200),
            probability: 0.8,
        },
        CharacterFamily::Zundamon => BlinkTiming {
            initial_delay: MillisRange::new(500, 1500),
            interval: MillisRange::new(2000, 4000),
            hold: MillisRange::new(100, 200),
            probability: 0.75,
        },
        CharacterFamily::Tsumugi => BlinkTiming {
            initial_delay: MillisRange::new(800, 2000),
            interval: MillisRange::new(3000, 5000),
            hold: MillisRange::new(120, 250),
            probability: 0.7,
        },
        CharacterFamily::Hau => BlinkTiming {
            initial_delay: MillisRange::new(500, 1500),
            interval: MillisRange::new(2500, 4500),
            hold: MillisRange::new(100, 150),
            probability: 0.8,
        },
        CharacterFamily::Ritsu => BlinkTiming {
            initial_delay: MillisRange::new(1000, 2000),
            interval: MillisRange::new(3000, 6000),
            hold: MillisRange::new(150, 300),
            probability: 0.7,
        },
        CharacterFamily::WhiteCul => BlinkTiming {
            initial_delay: MillisRange::new(700, 1800),
            interval: MillisRange::new(2000, 5000),
            hold: MillisRange::new(100, 250),
            probability: 0.75,
        },
    }
}

/// Everything a blink loop needs for one family
#[derive(Debug, Clone)]
pub struct BlinkProfile {
    pub family: CharacterFamily,
    pub open_sprite: SpriteRef,
    pub close_sprite: SpriteRef,
    pub timing: BlinkTiming,
}

impl BlinkProfile {
    pub fn initial_delay(&self, rng: &mut impl Rng) -> Duration {
        sample_range(self.timing.initial_delay, rng)
    }

    pub fn interval(&self, rng: &mut impl Rng) -> Duration {
        sample_range(self.timing.interval, rng)
    }

    pub fn hold(&self, rng: &mut impl Rng) -> Duration {
        sample_range(self.timing.hold, rng)
    }

    /// Whether a periodic check turns into a blink
    pub fn should_blink(&self, rng: &mut impl Rng) -> bool {
        rng.gen_bool(self.timing.probability.clamp(0.0, 1.0))
    }
}

/// Uniform draw from `[min, max)`
pub fn sample_range(range: MillisRange, rng: &mut impl Rng) -> Duration {
    let ms = if range.is_valid() {
        rng.gen_range(range.min..range.max)
    } else {
        range.min
    };
    Duration::from_millis(ms)
}

/// Family → profile lookup
#[derive(Debug, Clone)]
pub struct BlinkTable {
    paths: AssetPaths,
    overrides: HashMap<CharacterFamily, BlinkTiming>,
}

impl BlinkTable {
    pub fn new(paths: AssetPaths) -> Self {
        Self {
            paths,
            overrides: HashMap::new(),
        }
    }

    /// Replace built-in timings. Every override is validated first.
    pub fn with_overrides(
        mut self,
        overrides: &HashMap<CharacterFamily, BlinkTiming>,
    ) -> KuchiResult<Self> {
        for (family, timing) in overrides {
            timing.validate()?;
            self.overrides.insert(*family, *timing);
        }
        Ok(self)
    }

    pub fn timing(&self, family: CharacterFamily) -> BlinkTiming {
        self.overrides
            .get(&family)
            .copied()
            .unwrap_or_else(|| default_timing(family))
    }

    pub fn profile(&self, family: CharacterFamily) -> BlinkProfile {
        BlinkProfile {
            family,
            open_sprite: self.paths.eyes(family, EyeState::Open),
            close_sprite: self.paths.eyes(family, EyeState::Closed),
            timing: self.timing(family),
        }
    }
}

impl Default for BlinkTable {
    fn default() -> Self {
        Self::new(AssetPaths::default())
    }
}
